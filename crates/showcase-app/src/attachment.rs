// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use url::Url;

use crate::ProductId;

const SHOP_SEARCH_URL: &str = "https://google.com/search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAction {
    Upload,
    Copy,
    Download,
    Shop,
}

impl ImageAction {
    pub const ALL: [Self; 4] = [Self::Upload, Self::Copy, Self::Download, Self::Shop];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Upload => "Upload from computer",
            Self::Copy => "Copy image",
            Self::Download => "Download image",
            Self::Shop => "Shop",
        }
    }

    pub const fn shortcut(self) -> char {
        match self {
            Self::Upload => 'u',
            Self::Copy => 'c',
            Self::Download => 'd',
            Self::Shop => 's',
        }
    }

    pub fn from_shortcut(value: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.shortcut() == value)
    }

    /// Upload keeps the menu open until the chosen file has been read.
    pub const fn closes_menu_immediately(self) -> bool {
        !matches!(self, Self::Upload)
    }
}

/// Platform surfaces the image menu reaches out to.
pub trait ImagePlatform {
    /// Opens the file-selection surface. The chosen file's bytes arrive later and
    /// are handed to `OverlayController::complete_upload`.
    fn request_image_file(&mut self) -> Result<()>;
    fn save_download(&mut self, image: &str, file_name: &str) -> Result<PathBuf>;
    fn open_external(&mut self, url: &Url) -> Result<()>;
}

pub fn download_file_name(id: ProductId) -> String {
    format!("product_{}.png", id.get())
}

pub fn shop_url(product_name: &str) -> Result<Url> {
    let query = format!("buy {}", product_name.trim());
    Url::parse_with_params(SHOP_SEARCH_URL, &[("q", query.as_str())])
        .context("build shop search url")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Encodes raw image bytes as a self-contained `data:` payload. The MIME type is
/// sniffed from the bytes; anything that is not a recognizable image is rejected.
pub fn encode_data_payload(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        bail!("selected file is empty -- choose an image file and retry");
    }
    let format = ::image::guess_format(bytes)
        .map_err(|_| anyhow!("selected file is not a supported image (png, jpeg, gif, webp)"))?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(bytes)
    ))
}

pub fn decode_data_payload(value: &str) -> Result<DataPayload> {
    let rest = value
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("image value is not a data payload"))?;
    let (header, body) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data payload is missing its ',' separator"))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("data payload is not base64 encoded"))?;
    let bytes = STANDARD
        .decode(body.trim())
        .context("decode base64 data payload")?;
    Ok(DataPayload {
        mime_type: if mime_type.is_empty() {
            "application/octet-stream".to_owned()
        } else {
            mime_type.to_owned()
        },
        bytes,
    })
}

/// What the image region can show for a product's `image` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Embedded {
        mime_type: String,
        size_bytes: usize,
        width: u32,
        height: u32,
    },
    Remote(Url),
    Local {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    /// Renders the static fallback notice.
    Broken,
}

impl ImageSource {
    pub fn inspect(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return Self::Broken;
        }

        if value.starts_with("data:") {
            return match decode_data_payload(value) {
                Ok(payload) => match read_dimensions(&payload.bytes) {
                    Some((width, height)) => Self::Embedded {
                        mime_type: payload.mime_type,
                        size_bytes: payload.bytes.len(),
                        width,
                        height,
                    },
                    None => Self::Broken,
                },
                Err(_) => Self::Broken,
            };
        }

        if let Ok(url) = Url::parse(value)
            && matches!(url.scheme(), "http" | "https")
        {
            return Self::Remote(url);
        }

        let path = Path::new(value);
        match std::fs::read(path)
            .ok()
            .and_then(|bytes| read_dimensions(&bytes))
        {
            Some((width, height)) => Self::Local {
                path: path.to_path_buf(),
                width,
                height,
            },
            None => Self::Broken,
        }
    }

    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Broken)
    }
}

fn read_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ::image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
