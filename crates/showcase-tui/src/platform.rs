// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client as HttpClient;
use showcase_app::{ImagePlatform, ProductId, decode_data_payload};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::InternalEvent;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

type UrlOpener = Box<dyn FnMut(&Url) -> Result<()>>;

/// Path entry standing in for a file picker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePrompt {
    pub input: String,
}

/// The terminal's take on the platform surfaces the image menu needs: a path prompt
/// for file selection, a downloads folder, and the system URL handler.
pub struct TerminalPlatform {
    downloads_dir: PathBuf,
    tx: Sender<InternalEvent>,
    prompt: Option<FilePrompt>,
    http: Option<HttpClient>,
    open_url: UrlOpener,
}

impl fmt::Debug for TerminalPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalPlatform")
            .field("downloads_dir", &self.downloads_dir)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

impl TerminalPlatform {
    pub fn new(downloads_dir: impl Into<PathBuf>, tx: Sender<InternalEvent>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
            tx,
            prompt: None,
            http: None,
            open_url: Box::new(|url| {
                open::that(url.as_str()).with_context(|| format!("open {url} in a browser"))
            }),
        }
    }

    pub fn with_url_opener(mut self, opener: impl FnMut(&Url) -> Result<()> + 'static) -> Self {
        self.open_url = Box::new(opener);
        self
    }

    pub fn prompt(&self) -> Option<&FilePrompt> {
        self.prompt.as_ref()
    }

    pub fn prompt_mut(&mut self) -> Option<&mut FilePrompt> {
        self.prompt.as_mut()
    }

    pub fn cancel_prompt(&mut self) -> bool {
        self.prompt.take().is_some()
    }

    /// Closes the prompt and reads the chosen file on a worker thread. The bytes come
    /// back as one [`InternalEvent::ImageFileRead`] tagged with `product_id`.
    pub fn submit_prompt(&mut self, product_id: ProductId) -> Result<PathBuf> {
        let Some(prompt) = self.prompt.as_ref() else {
            bail!("no file prompt is open");
        };
        let raw = prompt.input.trim();
        if raw.is_empty() {
            bail!("enter a path to an image file, or press esc to cancel");
        }
        let path = expand_home(raw);
        self.prompt = None;

        let sender = self.tx.clone();
        let read_path = path.clone();
        thread::spawn(move || {
            let result = fs::read(&read_path)
                .with_context(|| format!("read {}", read_path.display()))
                .map_err(|error| format!("{error:#}"));
            debug!(
                product_id = product_id.get(),
                ok = result.is_ok(),
                "image file read finished"
            );
            let _ = sender.send(InternalEvent::ImageFileRead { product_id, result });
        });
        Ok(path)
    }

    fn http_client(&mut self) -> Result<&HttpClient> {
        if self.http.is_none() {
            let client = HttpClient::builder()
                .timeout(DOWNLOAD_TIMEOUT)
                .build()
                .context("build HTTP client")?;
            self.http = Some(client);
        }
        match self.http.as_ref() {
            Some(client) => Ok(client),
            None => bail!("HTTP client unavailable"),
        }
    }

    fn image_bytes(&mut self, image: &str) -> Result<Vec<u8>> {
        let value = image.trim();
        if value.is_empty() {
            bail!("this product has no image to download");
        }
        if value.starts_with("data:") {
            return Ok(decode_data_payload(value)?.bytes);
        }
        if let Ok(url) = Url::parse(value)
            && matches!(url.scheme(), "http" | "https")
        {
            let response = self
                .http_client()?
                .get(url.clone())
                .send()
                .with_context(|| format!("download {url}"))?
                .error_for_status()
                .with_context(|| format!("download {url}"))?;
            let bytes = response.bytes().context("read image response body")?;
            return Ok(bytes.to_vec());
        }
        fs::read(value).with_context(|| format!("read image file {value}"))
    }
}

impl ImagePlatform for TerminalPlatform {
    fn request_image_file(&mut self) -> Result<()> {
        self.prompt = Some(FilePrompt::default());
        Ok(())
    }

    fn save_download(&mut self, image: &str, file_name: &str) -> Result<PathBuf> {
        let bytes = self.image_bytes(image)?;
        fs::create_dir_all(&self.downloads_dir).with_context(|| {
            format!(
                "create downloads directory {}; set [storage].downloads_dir to a writable folder",
                self.downloads_dir.display()
            )
        })?;
        let target = self.downloads_dir.join(file_name);
        fs::write(&target, bytes).with_context(|| format!("write {}", target.display()))?;
        debug!(path = %target.display(), "image downloaded");
        Ok(target)
    }

    fn open_external(&mut self, url: &Url) -> Result<()> {
        (self.open_url)(url).inspect_err(|error| {
            warn!(error = %error, url = %url, "could not open url");
        })
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::{FilePrompt, TerminalPlatform, expand_home};
    use crate::InternalEvent;
    use anyhow::Result;
    use showcase_app::{ImagePlatform, ProductId};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::time::Duration;
    use url::Url;

    #[test]
    fn request_opens_empty_prompt() -> Result<()> {
        let (tx, _rx) = mpsc::channel();
        let mut platform = TerminalPlatform::new("/unused", tx);
        platform.request_image_file()?;
        assert_eq!(platform.prompt(), Some(&FilePrompt::default()));
        assert!(platform.cancel_prompt());
        assert!(!platform.cancel_prompt());
        Ok(())
    }

    #[test]
    fn empty_prompt_is_not_submitted() -> Result<()> {
        let (tx, _rx) = mpsc::channel();
        let mut platform = TerminalPlatform::new("/unused", tx);
        platform.request_image_file()?;

        let error = platform
            .submit_prompt(ProductId::new(1))
            .expect_err("blank path should fail");
        assert!(error.to_string().contains("enter a path"));
        assert!(platform.prompt().is_some());
        Ok(())
    }

    #[test]
    fn submitted_prompt_reads_file_off_thread() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("photo.bin");
        std::fs::write(&path, b"bytes")?;
        let (tx, rx) = mpsc::channel();
        let mut platform = TerminalPlatform::new(temp.path(), tx);
        platform.request_image_file()?;
        if let Some(prompt) = platform.prompt_mut() {
            prompt.input = path.display().to_string();
        }

        platform.submit_prompt(ProductId::new(3))?;
        assert!(platform.prompt().is_none());
        match rx.recv_timeout(Duration::from_secs(5))? {
            InternalEvent::ImageFileRead { product_id, result } => {
                assert_eq!(product_id, ProductId::new(3));
                assert_eq!(result, Ok(b"bytes".to_vec()));
            }
            other => panic!("unexpected event {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn missing_file_reports_error_event() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let (tx, rx) = mpsc::channel();
        let mut platform = TerminalPlatform::new(temp.path(), tx);
        platform.request_image_file()?;
        if let Some(prompt) = platform.prompt_mut() {
            prompt.input = temp.path().join("gone.png").display().to_string();
        }

        platform.submit_prompt(ProductId::new(3))?;
        match rx.recv_timeout(Duration::from_secs(5))? {
            InternalEvent::ImageFileRead { result, .. } => {
                let error = result.expect_err("missing file should fail");
                assert!(error.contains("gone.png"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn download_writes_embedded_payload() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let (tx, _rx) = mpsc::channel();
        let mut platform = TerminalPlatform::new(temp.path().join("downloads"), tx);

        let path = platform.save_download("data:image/png;base64,aGVsbG8=", "product_7.png")?;
        assert_eq!(path, temp.path().join("downloads").join("product_7.png"));
        assert_eq!(std::fs::read(path)?, b"hello");
        Ok(())
    }

    #[test]
    fn download_of_missing_image_fails() {
        let (tx, _rx) = mpsc::channel();
        let mut platform = TerminalPlatform::new("/unused", tx);
        let error = platform
            .save_download("  ", "product_1.png")
            .expect_err("empty image should fail");
        assert!(error.to_string().contains("no image"));
    }

    #[test]
    fn open_external_uses_injected_opener() -> Result<()> {
        let (tx, _rx) = mpsc::channel();
        let opened = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&opened);
        let mut platform = TerminalPlatform::new("/unused", tx).with_url_opener(move |url| {
            sink.borrow_mut().push(url.to_string());
            Ok(())
        });

        platform.open_external(&Url::parse("https://shop.example.com/p/mug")?)?;
        assert_eq!(*opened.borrow(), vec!["https://shop.example.com/p/mug".to_owned()]);
        Ok(())
    }

    #[test]
    fn home_prefix_expands() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/pics/a.png"), home.join("pics/a.png"));
        }
        assert_eq!(expand_home("/abs/a.png"), std::path::PathBuf::from("/abs/a.png"));
    }
}
