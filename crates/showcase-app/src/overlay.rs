// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::{
    ImageAction, ImagePlatform, OverlayScope, PageChrome, Product, ProductField, ProductId,
    TextField, download_file_name, encode_data_payload, shop_url,
};

pub const COPY_UNSUPPORTED_NOTICE: &str =
    "copy image is not supported -- use Download image instead";

/// The caller that owns the product collection. Every edit is forwarded here as it
/// happens; the overlay never persists anything itself.
pub trait ProductHost {
    fn save_product(&mut self, product: &Product) -> Result<()>;
    /// Returns `false` when the caller declined or could not find the product.
    fn delete_product(&mut self, id: ProductId) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayVisibility {
    Closed,
    OpenView,
    OpenEdit { image_menu_open: bool },
}

impl OverlayVisibility {
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub const fn is_editable(self) -> bool {
        matches!(self, Self::OpenEdit { .. })
    }

    pub const fn image_menu_open(self) -> bool {
        matches!(
            self,
            Self::OpenEdit {
                image_menu_open: true
            }
        )
    }
}

/// Cursor inside one text input, counted in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldCursor {
    pub position: usize,
    pub selected_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Left,
    Right,
    Home,
    End,
}

/// Where a pointer click landed, innermost region first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRegion {
    Backdrop,
    Panel,
    ImageRegion,
    Image,
    FieldRegion,
    Field(TextField),
    SponsoredLink,
    MenuAction(ImageAction),
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    Opened { id: ProductId, editable: bool },
    Closed,
    Saved { id: ProductId, field: ProductField },
    FocusMoved(TextField),
    ImageMenuToggled(bool),
    UploadRequested,
    ImageReplaced(ProductId),
    Downloaded(PathBuf),
    ExternalOpened(String),
    Notice(String),
    Deleted(ProductId),
    DeleteRejected(ProductId),
}

#[derive(Debug)]
struct Session {
    working: Product,
    focus: TextField,
    cursors: [FieldCursor; 3],
    _scope: OverlayScope,
}

impl Session {
    fn cursor(&self, field: TextField) -> FieldCursor {
        self.cursors[field.index()]
    }

    fn cursor_mut(&mut self, field: TextField) -> &mut FieldCursor {
        &mut self.cursors[field.index()]
    }

    fn clamp_cursors(&mut self) {
        for field in TextField::ALL {
            let len = char_len(self.working.field(field.product_field()));
            let cursor = self.cursor_mut(field);
            cursor.position = cursor.position.min(len);
        }
    }
}

/// Owns the working copy of the open product and the overlay's view/edit/menu state.
#[derive(Debug)]
pub struct OverlayController {
    chrome: PageChrome,
    visibility: OverlayVisibility,
    session: Option<Session>,
}

impl OverlayController {
    pub fn new(chrome: PageChrome) -> Self {
        Self {
            chrome,
            visibility: OverlayVisibility::Closed,
            session: None,
        }
    }

    pub fn chrome(&self) -> &PageChrome {
        &self.chrome
    }

    pub fn visibility(&self) -> OverlayVisibility {
        self.visibility
    }

    pub fn is_open(&self) -> bool {
        self.visibility.is_open()
    }

    pub fn image_menu_open(&self) -> bool {
        self.visibility.image_menu_open()
    }

    pub fn working_copy(&self) -> Option<&Product> {
        self.session.as_ref().map(|session| &session.working)
    }

    pub fn focus(&self) -> Option<TextField> {
        match self.visibility {
            OverlayVisibility::OpenEdit { .. } => self.session.as_ref().map(|s| s.focus),
            _ => None,
        }
    }

    pub fn cursor(&self, field: TextField) -> Option<FieldCursor> {
        self.session.as_ref().map(|session| session.cursor(field))
    }

    /// Opens (or re-opens) the overlay on `product`. `None` closes an open overlay
    /// and otherwise does nothing.
    pub fn open(&mut self, product: Option<Product>, editable: bool) -> Vec<OverlayEvent> {
        let Some(product) = product else {
            return if self.is_open() {
                self.close()
            } else {
                Vec::new()
            };
        };

        let scope = match self.session.take() {
            Some(session) => session._scope,
            None => self.chrome.acquire_overlay_scope(),
        };
        let cursors = TextField::ALL.map(|field| FieldCursor {
            position: char_len(product.field(field.product_field())),
            selected_all: false,
        });
        let id = product.id;
        self.session = Some(Session {
            working: product,
            focus: TextField::Name,
            cursors,
            _scope: scope,
        });
        self.visibility = OverlayVisibility::OpenView;
        debug!(product_id = id.get(), editable, "overlay opened");

        let mut events = vec![OverlayEvent::Opened { id, editable }];
        if editable {
            events.extend(self.enter_edit());
        }
        events
    }

    /// Replaces the working copy with the caller's current version of the product.
    pub fn sync_upstream(&mut self, product: &Product) {
        if let Some(session) = self.session.as_mut() {
            session.working = product.clone();
            session.clamp_cursors();
        }
    }

    pub fn set_editable(&mut self, editable: bool) -> Vec<OverlayEvent> {
        match (self.visibility, editable) {
            (OverlayVisibility::OpenView, true) => self.enter_edit(),
            (OverlayVisibility::OpenEdit { image_menu_open }, false) => {
                self.visibility = OverlayVisibility::OpenView;
                if image_menu_open {
                    vec![OverlayEvent::ImageMenuToggled(false)]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    /// The single teardown path: drops the session, which releases the scroll lock
    /// and the Escape listener.
    pub fn close(&mut self) -> Vec<OverlayEvent> {
        if !self.is_open() {
            return Vec::new();
        }
        let id = self.session.take().map(|session| session.working.id);
        self.visibility = OverlayVisibility::Closed;
        debug!(product_id = id.map(ProductId::get), "overlay closed");
        vec![OverlayEvent::Closed]
    }

    pub fn handle_escape(&mut self) -> Vec<OverlayEvent> {
        self.close()
    }

    pub fn edit_field(
        &mut self,
        field: ProductField,
        value: impl Into<String>,
        host: &mut dyn ProductHost,
    ) -> Result<Vec<OverlayEvent>> {
        if !self.visibility.is_editable() {
            bail!("field edits require the overlay to be in edit mode");
        }
        let session = self.session_mut()?;
        let next = session.working.with_field(field, value);
        if next == session.working {
            return Ok(Vec::new());
        }
        session.working = next;
        session.clamp_cursors();
        host.save_product(&session.working)?;
        Ok(vec![OverlayEvent::Saved {
            id: session.working.id,
            field,
        }])
    }

    pub fn focus_field(&mut self, field: TextField) -> Vec<OverlayEvent> {
        if !self.visibility.is_editable() {
            return Vec::new();
        }
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if session.focus == field {
            return Vec::new();
        }
        session.cursor_mut(session.focus).selected_all = false;
        session.focus = field;
        vec![OverlayEvent::FocusMoved(field)]
    }

    pub fn cycle_focus(&mut self, delta: isize) -> Vec<OverlayEvent> {
        match self.focus() {
            Some(current) => self.focus_field(current.rotate(delta)),
            None => Vec::new(),
        }
    }

    /// Enter on the name field moves to the description and leaves the description's
    /// cursor where it was. Enter in the description inserts a line break.
    pub fn handle_enter(&mut self, host: &mut dyn ProductHost) -> Result<Vec<OverlayEvent>> {
        match self.focus() {
            Some(TextField::Name) => Ok(self.focus_field(TextField::Description)),
            Some(TextField::Description) => self.insert_text("\n", host),
            _ => Ok(Vec::new()),
        }
    }

    /// Types `text` into the focused field. A fully selected value is replaced.
    pub fn insert_text(&mut self, text: &str, host: &mut dyn ProductHost) -> Result<Vec<OverlayEvent>> {
        let Some(field) = self.focus() else {
            return Ok(Vec::new());
        };
        let text: String = if field == TextField::Description {
            text.to_owned()
        } else {
            text.chars().filter(|value| *value != '\n').collect()
        };
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let session = self.session_mut()?;
        let current = session.working.field(field.product_field()).to_owned();
        let cursor = session.cursor(field);
        let (next, position) = if cursor.selected_all {
            let position = char_len(&text);
            (text, position)
        } else {
            let mut next = current;
            next.insert_str(byte_index(&next, cursor.position), &text);
            (next, cursor.position + char_len(&text))
        };
        *session.cursor_mut(field) = FieldCursor {
            position,
            selected_all: false,
        };
        self.edit_field(field.product_field(), next, host)
    }

    pub fn backspace(&mut self, host: &mut dyn ProductHost) -> Result<Vec<OverlayEvent>> {
        self.remove_char(host, false)
    }

    pub fn delete_forward(&mut self, host: &mut dyn ProductHost) -> Result<Vec<OverlayEvent>> {
        self.remove_char(host, true)
    }

    fn remove_char(&mut self, host: &mut dyn ProductHost, forward: bool) -> Result<Vec<OverlayEvent>> {
        let Some(field) = self.focus() else {
            return Ok(Vec::new());
        };
        let session = self.session_mut()?;
        let mut value = session.working.field(field.product_field()).to_owned();
        let cursor = session.cursor(field);

        let position = if cursor.selected_all {
            value.clear();
            0
        } else {
            let target = if forward {
                cursor.position
            } else {
                match cursor.position.checked_sub(1) {
                    Some(target) => target,
                    None => return Ok(Vec::new()),
                }
            };
            if target >= char_len(&value) {
                return Ok(Vec::new());
            }
            value.remove(byte_index(&value, target));
            target
        };
        *session.cursor_mut(field) = FieldCursor {
            position,
            selected_all: false,
        };
        self.edit_field(field.product_field(), value, host)
    }

    pub fn move_cursor(&mut self, movement: CursorMove) {
        let Some(field) = self.focus() else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let len = char_len(session.working.field(field.product_field()));
        let cursor = session.cursor_mut(field);
        let position = match (movement, cursor.selected_all) {
            (CursorMove::Left, true) | (CursorMove::Home, _) => 0,
            (CursorMove::Right, true) | (CursorMove::End, _) => len,
            (CursorMove::Left, false) => cursor.position.saturating_sub(1),
            (CursorMove::Right, false) => (cursor.position + 1).min(len),
        };
        *cursor = FieldCursor {
            position,
            selected_all: false,
        };
    }

    pub fn toggle_image_menu(&mut self) -> Vec<OverlayEvent> {
        match self.visibility {
            OverlayVisibility::OpenEdit { image_menu_open } => {
                self.set_image_menu(!image_menu_open)
            }
            _ => Vec::new(),
        }
    }

    /// Runs one image-menu action. Platform failures surface as notices; every
    /// action except upload closes the menu whatever the outcome.
    pub fn run_image_action(
        &mut self,
        action: ImageAction,
        platform: &mut dyn ImagePlatform,
    ) -> Vec<OverlayEvent> {
        if !self.image_menu_open() {
            return Vec::new();
        }
        let Some(product) = self.working_copy().cloned() else {
            return Vec::new();
        };

        let mut events = match action {
            ImageAction::Upload => match platform.request_image_file() {
                Ok(()) => vec![OverlayEvent::UploadRequested],
                Err(error) => {
                    warn!(error = %error, "file selection unavailable");
                    vec![OverlayEvent::Notice(format!(
                        "file selection failed: {error:#}"
                    ))]
                }
            },
            ImageAction::Copy => vec![OverlayEvent::Notice(COPY_UNSUPPORTED_NOTICE.to_owned())],
            ImageAction::Download => {
                let file_name = download_file_name(product.id);
                match platform.save_download(&product.image, &file_name) {
                    Ok(path) => vec![OverlayEvent::Downloaded(path)],
                    Err(error) => {
                        warn!(error = %error, product_id = product.id.get(), "image download failed");
                        vec![OverlayEvent::Notice(format!("download failed: {error:#}"))]
                    }
                }
            }
            ImageAction::Shop => {
                match shop_url(&product.name).and_then(|url| {
                    platform.open_external(&url)?;
                    Ok(url)
                }) {
                    Ok(url) => vec![OverlayEvent::ExternalOpened(url.to_string())],
                    Err(error) => {
                        warn!(error = %error, "shop search could not be opened");
                        vec![OverlayEvent::Notice(format!("shop failed: {error:#}"))]
                    }
                }
            }
        };

        if action.closes_menu_immediately() {
            events.extend(self.set_image_menu(false));
        }
        events
    }

    /// Applies the bytes of a file chosen for `target`. The image goes through the
    /// same edit path as the text fields and the menu closes only after that.
    /// A completion for a product that is no longer open is dropped.
    pub fn complete_upload(
        &mut self,
        target: ProductId,
        bytes: Result<Vec<u8>>,
        host: &mut dyn ProductHost,
    ) -> Result<Vec<OverlayEvent>> {
        let still_open = self.visibility.is_editable()
            && self
                .working_copy()
                .is_some_and(|product| product.id == target);
        if !still_open {
            debug!(product_id = target.get(), "dropping image upload for closed overlay");
            return Ok(Vec::new());
        }

        let payload = match bytes.and_then(|bytes| encode_data_payload(&bytes)) {
            Ok(payload) => payload,
            Err(error) => {
                debug!(error = %error, "image upload rejected");
                return Ok(vec![OverlayEvent::Notice(format!(
                    "image upload failed: {error:#}"
                ))]);
            }
        };

        let mut events = self.edit_field(ProductField::Image, payload, host)?;
        events.push(OverlayEvent::ImageReplaced(target));
        events.extend(self.set_image_menu(false));
        Ok(events)
    }

    /// Opens the visible sponsored link. Best effort.
    pub fn open_sponsored_link(&mut self, platform: &mut dyn ImagePlatform) -> Vec<OverlayEvent> {
        let Some(link) = self
            .working_copy()
            .and_then(Product::visible_sponsored_link)
            .map(str::to_owned)
        else {
            return Vec::new();
        };
        match url::Url::parse(link.trim()).map_err(anyhow::Error::from).and_then(|url| {
            platform.open_external(&url)?;
            Ok(url)
        }) {
            Ok(url) => vec![OverlayEvent::ExternalOpened(url.to_string())],
            Err(error) => {
                warn!(error = %error, "sponsored link could not be opened");
                vec![OverlayEvent::Notice(format!("open link failed: {error:#}"))]
            }
        }
    }

    /// Asks the caller to delete the open product. Only a `true` answer closes the
    /// overlay; a refusal or an error leaves everything as it was.
    pub fn delete(&mut self, host: &mut dyn ProductHost) -> Result<Vec<OverlayEvent>> {
        if !self.visibility.is_editable() {
            bail!("delete requires the overlay to be in edit mode");
        }
        let id = self.session_mut()?.working.id;
        match host.delete_product(id) {
            Ok(true) => {
                let mut events = vec![OverlayEvent::Deleted(id)];
                events.extend(self.close());
                Ok(events)
            }
            Ok(false) => Ok(vec![OverlayEvent::DeleteRejected(id)]),
            Err(error) => {
                warn!(error = %error, product_id = id.get(), "delete callback failed");
                Ok(vec![
                    OverlayEvent::DeleteRejected(id),
                    OverlayEvent::Notice(format!("delete failed: {error:#}")),
                ])
            }
        }
    }

    /// Applies the click-region policy: backdrop and panel close, the image and field
    /// regions swallow the click, and inner targets act.
    pub fn click(
        &mut self,
        region: ClickRegion,
        host: &mut dyn ProductHost,
        platform: &mut dyn ImagePlatform,
    ) -> Result<Vec<OverlayEvent>> {
        if !self.is_open() {
            return Ok(Vec::new());
        }
        match region {
            ClickRegion::Backdrop | ClickRegion::Panel => Ok(self.close()),
            ClickRegion::ImageRegion | ClickRegion::FieldRegion => Ok(Vec::new()),
            ClickRegion::Image => Ok(self.toggle_image_menu()),
            ClickRegion::Field(field) => Ok(self.focus_field(field)),
            ClickRegion::SponsoredLink => Ok(self.open_sponsored_link(platform)),
            ClickRegion::MenuAction(action) => Ok(self.run_image_action(action, platform)),
            ClickRegion::Delete => {
                if self.visibility.is_editable() {
                    self.delete(host)
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }

    fn enter_edit(&mut self) -> Vec<OverlayEvent> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        self.visibility = OverlayVisibility::OpenEdit {
            image_menu_open: false,
        };
        session.cursor_mut(session.focus).selected_all = false;
        session.focus = TextField::Name;
        let len = char_len(&session.working.name);
        *session.cursor_mut(TextField::Name) = FieldCursor {
            position: len,
            selected_all: true,
        };
        vec![OverlayEvent::FocusMoved(TextField::Name)]
    }

    fn set_image_menu(&mut self, open: bool) -> Vec<OverlayEvent> {
        match self.visibility {
            OverlayVisibility::OpenEdit { image_menu_open } if image_menu_open != open => {
                self.visibility = OverlayVisibility::OpenEdit {
                    image_menu_open: open,
                };
                vec![OverlayEvent::ImageMenuToggled(open)]
            }
            _ => Vec::new(),
        }
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        self.session
            .as_mut()
            .ok_or_else(|| anyhow!("overlay has no open product"))
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn byte_index(value: &str, char_position: usize) -> usize {
    value
        .char_indices()
        .nth(char_position)
        .map_or(value.len(), |(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::{
        COPY_UNSUPPORTED_NOTICE, ClickRegion, CursorMove, FieldCursor, OverlayController,
        OverlayEvent, OverlayVisibility, ProductHost,
    };
    use crate::attachment::tests::PIXEL_PNG;
    use crate::{
        ImageAction, ImagePlatform, PageChrome, Product, ProductField, ProductId, TextField,
    };
    use anyhow::{Result, anyhow};
    use std::path::PathBuf;
    use url::Url;

    #[derive(Debug, Default)]
    struct RecordingHost {
        saved: Vec<Product>,
        delete_answer: Option<bool>,
        deleted: Vec<ProductId>,
        fail_saves: bool,
    }

    impl ProductHost for RecordingHost {
        fn save_product(&mut self, product: &Product) -> Result<()> {
            if self.fail_saves {
                return Err(anyhow!("disk full"));
            }
            self.saved.push(product.clone());
            Ok(())
        }

        fn delete_product(&mut self, id: ProductId) -> Result<bool> {
            self.deleted.push(id);
            self.delete_answer.ok_or_else(|| anyhow!("store offline"))
        }
    }

    #[derive(Debug, Default)]
    struct FakePlatform {
        file_requests: usize,
        downloads: Vec<(String, String)>,
        opened: Vec<String>,
        fail: bool,
    }

    impl ImagePlatform for FakePlatform {
        fn request_image_file(&mut self) -> Result<()> {
            self.file_requests += 1;
            Ok(())
        }

        fn save_download(&mut self, image: &str, file_name: &str) -> Result<PathBuf> {
            if self.fail {
                return Err(anyhow!("image payload is empty"));
            }
            self.downloads.push((image.to_owned(), file_name.to_owned()));
            Ok(PathBuf::from("/downloads").join(file_name))
        }

        fn open_external(&mut self, url: &Url) -> Result<()> {
            if self.fail {
                return Err(anyhow!("no browser"));
            }
            self.opened.push(url.to_string());
            Ok(())
        }
    }

    fn mug() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Mug".to_owned(),
            description: String::new(),
            image: "a.png".to_owned(),
            sponsored_link: None,
        }
    }

    fn open_editable() -> (OverlayController, PageChrome) {
        let chrome = PageChrome::new();
        let mut overlay = OverlayController::new(chrome.clone());
        overlay.open(Some(mug()), true);
        (overlay, chrome)
    }

    #[test]
    fn absent_product_renders_nothing() {
        let chrome = PageChrome::new();
        let mut overlay = OverlayController::new(chrome.clone());

        let events = overlay.open(None, true);
        assert!(events.is_empty());
        assert_eq!(overlay.visibility(), OverlayVisibility::Closed);
        assert!(!chrome.scroll_locked());
    }

    #[test]
    fn view_mode_keeps_record_verbatim() {
        let mut overlay = OverlayController::new(PageChrome::new());
        let events = overlay.open(Some(mug()), false);

        assert_eq!(overlay.visibility(), OverlayVisibility::OpenView);
        assert_eq!(overlay.working_copy(), Some(&mug()));
        assert_eq!(overlay.focus(), None);
        assert_eq!(
            events,
            vec![OverlayEvent::Opened {
                id: ProductId::new(1),
                editable: false
            }]
        );
    }

    #[test]
    fn edit_mode_selects_whole_name() {
        let (overlay, _chrome) = open_editable();

        assert_eq!(overlay.focus(), Some(TextField::Name));
        assert_eq!(
            overlay.cursor(TextField::Name),
            Some(FieldCursor {
                position: 3,
                selected_all: true
            })
        );
    }

    #[test]
    fn typing_over_selection_replaces_name() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();

        overlay.insert_text("C", &mut host)?;
        assert_eq!(host.saved.len(), 1);
        assert_eq!(host.saved[0].name, "C");
        Ok(())
    }

    #[test]
    fn appending_forwards_full_copy_once_per_keystroke() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();

        overlay.move_cursor(CursorMove::End);
        let events = overlay.insert_text("g", &mut host)?;

        assert_eq!(
            events,
            vec![OverlayEvent::Saved {
                id: ProductId::new(1),
                field: ProductField::Name
            }]
        );
        assert_eq!(
            host.saved,
            vec![Product {
                name: "Mugg".to_owned(),
                ..mug()
            }]
        );

        overlay.insert_text("s", &mut host)?;
        overlay.backspace(&mut host)?;
        let names: Vec<&str> = host.saved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Mugg", "Muggs", "Mugg"]);
        Ok(())
    }

    #[test]
    fn edit_field_changes_only_that_field() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();

        overlay.edit_field(ProductField::SponsoredLink, "https://shop.example/mug", &mut host)?;
        assert_eq!(
            host.saved,
            vec![Product {
                sponsored_link: Some("https://shop.example/mug".to_owned()),
                ..mug()
            }]
        );
        Ok(())
    }

    #[test]
    fn unchanged_value_is_not_forwarded() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();

        let events = overlay.edit_field(ProductField::Name, "Mug", &mut host)?;
        assert!(events.is_empty());
        assert!(host.saved.is_empty());
        Ok(())
    }

    #[test]
    fn edits_are_rejected_in_view_mode() {
        let mut overlay = OverlayController::new(PageChrome::new());
        overlay.open(Some(mug()), false);
        let mut host = RecordingHost::default();

        assert!(
            overlay
                .edit_field(ProductField::Name, "Cup", &mut host)
                .is_err()
        );
        assert!(host.saved.is_empty());
    }

    #[test]
    fn failed_save_propagates_but_keeps_edit() {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost {
            fail_saves: true,
            ..RecordingHost::default()
        };

        let error = overlay
            .edit_field(ProductField::Description, "Blue", &mut host)
            .expect_err("save failure should surface");
        assert!(error.to_string().contains("disk full"));
        assert_eq!(
            overlay.working_copy().map(|p| p.description.as_str()),
            Some("Blue")
        );
    }

    #[test]
    fn enter_on_name_moves_to_description_without_selection() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();

        let events = overlay.handle_enter(&mut host)?;
        assert_eq!(events, vec![OverlayEvent::FocusMoved(TextField::Description)]);
        assert_eq!(overlay.focus(), Some(TextField::Description));
        assert_eq!(
            overlay.cursor(TextField::Description),
            Some(FieldCursor {
                position: 0,
                selected_all: false
            })
        );
        assert!(host.saved.is_empty());
        Ok(())
    }

    #[test]
    fn description_cursor_keeps_last_position() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();

        overlay.focus_field(TextField::Description);
        overlay.insert_text("abc", &mut host)?;
        overlay.move_cursor(CursorMove::Left);
        overlay.focus_field(TextField::Name);
        overlay.handle_enter(&mut host)?;

        assert_eq!(
            overlay.cursor(TextField::Description),
            Some(FieldCursor {
                position: 2,
                selected_all: false
            })
        );
        Ok(())
    }

    #[test]
    fn enter_in_description_inserts_line_break() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();

        overlay.focus_field(TextField::Description);
        overlay.insert_text("one", &mut host)?;
        overlay.handle_enter(&mut host)?;
        overlay.insert_text("two", &mut host)?;
        assert_eq!(
            overlay.working_copy().map(|p| p.description.as_str()),
            Some("one\ntwo")
        );
        Ok(())
    }

    #[test]
    fn name_rejects_line_breaks() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();

        overlay.insert_text("Tea\nPot", &mut host)?;
        assert_eq!(host.saved[0].name, "TeaPot");
        Ok(())
    }

    #[test]
    fn multibyte_editing_respects_char_boundaries() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();

        overlay.insert_text("Café", &mut host)?;
        overlay.move_cursor(CursorMove::Left);
        overlay.insert_text("!", &mut host)?;
        overlay.move_cursor(CursorMove::End);
        overlay.backspace(&mut host)?;
        assert_eq!(
            overlay.working_copy().map(|p| p.name.as_str()),
            Some("Caf!")
        );
        Ok(())
    }

    #[test]
    fn escape_closes_from_any_focus_and_releases_scope() -> Result<()> {
        let (mut overlay, chrome) = open_editable();
        let mut host = RecordingHost::default();
        overlay.focus_field(TextField::SponsoredLink);
        overlay.toggle_image_menu();
        assert!(chrome.escape_captured());

        let events = overlay.handle_escape();
        assert_eq!(events, vec![OverlayEvent::Closed]);
        assert_eq!(overlay.visibility(), OverlayVisibility::Closed);
        assert!(!chrome.scroll_locked());
        assert_eq!(chrome.escape_listener_count(), 0);
        assert!(overlay.insert_text("x", &mut host)?.is_empty());
        Ok(())
    }

    #[test]
    fn repeated_cycles_leave_no_listener() {
        let chrome = PageChrome::new();
        let mut overlay = OverlayController::new(chrome.clone());

        for round in 0..5 {
            overlay.open(Some(mug()), round % 2 == 0);
            overlay.open(Some(mug()), true);
            assert_eq!(chrome.escape_listener_count(), 1);
            overlay.close();
            assert_eq!(chrome.escape_listener_count(), 0);
            assert!(!chrome.scroll_locked());
        }

        overlay.open(Some(mug()), false);
        overlay.open(None, false);
        assert_eq!(chrome.escape_listener_count(), 0);
    }

    #[test]
    fn dropping_controller_restores_scroll() {
        let chrome = PageChrome::new();
        {
            let mut overlay = OverlayController::new(chrome.clone());
            overlay.open(Some(mug()), true);
            assert!(chrome.scroll_locked());
        }
        assert!(!chrome.scroll_locked());
        assert!(!chrome.escape_captured());
    }

    #[test]
    fn sync_upstream_resets_working_copy() {
        let (mut overlay, _chrome) = open_editable();
        let upstream = Product {
            name: "M".to_owned(),
            description: "Updated elsewhere".to_owned(),
            ..mug()
        };

        overlay.sync_upstream(&upstream);
        assert_eq!(overlay.working_copy(), Some(&upstream));
        assert_eq!(overlay.cursor(TextField::Name).map(|c| c.position), Some(1));
    }

    #[test]
    fn backdrop_and_panel_close_but_regions_do_not() -> Result<()> {
        let mut host = RecordingHost::default();
        let mut platform = FakePlatform::default();

        for region in [ClickRegion::ImageRegion, ClickRegion::FieldRegion] {
            let (mut overlay, _chrome) = open_editable();
            overlay.click(region, &mut host, &mut platform)?;
            assert!(overlay.is_open());
        }
        for region in [ClickRegion::Backdrop, ClickRegion::Panel] {
            let (mut overlay, chrome) = open_editable();
            let events = overlay.click(region, &mut host, &mut platform)?;
            assert_eq!(events, vec![OverlayEvent::Closed]);
            assert!(!chrome.scroll_locked());
        }
        Ok(())
    }

    #[test]
    fn image_click_toggles_menu_only_in_edit_mode() -> Result<()> {
        let mut host = RecordingHost::default();
        let mut platform = FakePlatform::default();

        let mut view = OverlayController::new(PageChrome::new());
        view.open(Some(mug()), false);
        view.click(ClickRegion::Image, &mut host, &mut platform)?;
        assert!(!view.image_menu_open());

        let (mut overlay, _chrome) = open_editable();
        overlay.click(ClickRegion::Image, &mut host, &mut platform)?;
        assert!(overlay.image_menu_open());
        overlay.click(ClickRegion::Image, &mut host, &mut platform)?;
        assert!(!overlay.image_menu_open());
        Ok(())
    }

    #[test]
    fn leaving_edit_mode_discards_menu() {
        let (mut overlay, _chrome) = open_editable();
        overlay.toggle_image_menu();

        let events = overlay.set_editable(false);
        assert_eq!(events, vec![OverlayEvent::ImageMenuToggled(false)]);
        assert_eq!(overlay.visibility(), OverlayVisibility::OpenView);
        assert!(!overlay.image_menu_open());
    }

    #[test]
    fn upload_keeps_menu_open_until_read_completes() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();
        let mut platform = FakePlatform::default();
        overlay.toggle_image_menu();

        let events = overlay.run_image_action(ImageAction::Upload, &mut platform);
        assert_eq!(events, vec![OverlayEvent::UploadRequested]);
        assert_eq!(platform.file_requests, 1);
        assert!(overlay.image_menu_open());

        let events = overlay.complete_upload(ProductId::new(1), Ok(PIXEL_PNG.to_vec()), &mut host)?;
        assert_eq!(
            events,
            vec![
                OverlayEvent::Saved {
                    id: ProductId::new(1),
                    field: ProductField::Image
                },
                OverlayEvent::ImageReplaced(ProductId::new(1)),
                OverlayEvent::ImageMenuToggled(false),
            ]
        );
        assert_eq!(host.saved.len(), 1);
        assert!(host.saved[0].image.starts_with("data:image/png;base64,"));
        assert_eq!(host.saved[0].name, "Mug");
        assert!(!overlay.image_menu_open());
        Ok(())
    }

    #[test]
    fn unreadable_upload_leaves_menu_open() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();
        overlay.toggle_image_menu();

        let events =
            overlay.complete_upload(ProductId::new(1), Ok(b"plain text".to_vec()), &mut host)?;
        assert!(matches!(events.as_slice(), [OverlayEvent::Notice(_)]));
        assert!(overlay.image_menu_open());
        assert!(host.saved.is_empty());
        Ok(())
    }

    #[test]
    fn late_upload_after_close_is_dropped() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();
        overlay.close();

        let events = overlay.complete_upload(ProductId::new(1), Ok(PIXEL_PNG.to_vec()), &mut host)?;
        assert!(events.is_empty());
        assert!(host.saved.is_empty());
        Ok(())
    }

    #[test]
    fn non_upload_actions_close_menu_regardless_of_outcome() {
        for fail in [false, true] {
            for action in [ImageAction::Copy, ImageAction::Download, ImageAction::Shop] {
                let (mut overlay, _chrome) = open_editable();
                let mut platform = FakePlatform {
                    fail,
                    ..FakePlatform::default()
                };
                overlay.toggle_image_menu();

                let events = overlay.run_image_action(action, &mut platform);
                assert_eq!(events.last(), Some(&OverlayEvent::ImageMenuToggled(false)));
                assert!(!overlay.image_menu_open());
                assert!(overlay.is_open());
            }
        }
    }

    #[test]
    fn copy_reports_unsupported() {
        let (mut overlay, _chrome) = open_editable();
        let mut platform = FakePlatform::default();
        overlay.toggle_image_menu();

        let events = overlay.run_image_action(ImageAction::Copy, &mut platform);
        assert_eq!(
            events[0],
            OverlayEvent::Notice(COPY_UNSUPPORTED_NOTICE.to_owned())
        );
        assert!(platform.downloads.is_empty());
    }

    #[test]
    fn download_uses_product_file_name() {
        let (mut overlay, _chrome) = open_editable();
        let mut platform = FakePlatform::default();
        overlay.toggle_image_menu();

        overlay.run_image_action(ImageAction::Download, &mut platform);
        assert_eq!(
            platform.downloads,
            vec![("a.png".to_owned(), "product_1.png".to_owned())]
        );
    }

    #[test]
    fn shop_opens_search_for_product_name() {
        let (mut overlay, _chrome) = open_editable();
        let mut platform = FakePlatform::default();
        overlay.toggle_image_menu();

        overlay.run_image_action(ImageAction::Shop, &mut platform);
        assert_eq!(
            platform.opened,
            vec!["https://google.com/search?q=buy+Mug".to_owned()]
        );
    }

    #[test]
    fn menu_actions_need_open_menu() {
        let (mut overlay, _chrome) = open_editable();
        let mut platform = FakePlatform::default();

        let events = overlay.run_image_action(ImageAction::Shop, &mut platform);
        assert!(events.is_empty());
        assert!(platform.opened.is_empty());
    }

    #[test]
    fn successful_delete_closes() -> Result<()> {
        let (mut overlay, chrome) = open_editable();
        let mut host = RecordingHost {
            delete_answer: Some(true),
            ..RecordingHost::default()
        };

        let events = overlay.delete(&mut host)?;
        assert_eq!(
            events,
            vec![OverlayEvent::Deleted(ProductId::new(1)), OverlayEvent::Closed]
        );
        assert_eq!(host.deleted, vec![ProductId::new(1)]);
        assert!(!chrome.scroll_locked());
        Ok(())
    }

    #[test]
    fn rejected_delete_keeps_overlay_open() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost {
            delete_answer: Some(false),
            ..RecordingHost::default()
        };

        let events = overlay.delete(&mut host)?;
        assert_eq!(events, vec![OverlayEvent::DeleteRejected(ProductId::new(1))]);
        assert!(overlay.is_open());
        assert_eq!(overlay.working_copy(), Some(&mug()));
        Ok(())
    }

    #[test]
    fn erroring_delete_keeps_overlay_open() -> Result<()> {
        let (mut overlay, _chrome) = open_editable();
        let mut host = RecordingHost::default();

        let events = overlay.delete(&mut host)?;
        assert_eq!(events[0], OverlayEvent::DeleteRejected(ProductId::new(1)));
        assert!(overlay.is_open());
        Ok(())
    }

    #[test]
    fn delete_is_unavailable_in_view_mode() {
        let mut overlay = OverlayController::new(PageChrome::new());
        overlay.open(Some(mug()), false);
        let mut host = RecordingHost {
            delete_answer: Some(true),
            ..RecordingHost::default()
        };

        assert!(overlay.delete(&mut host).is_err());
        assert!(host.deleted.is_empty());
        assert!(overlay.is_open());
    }

    #[test]
    fn sponsored_link_opens_in_view_mode() {
        let mut overlay = OverlayController::new(PageChrome::new());
        overlay.open(
            Some(Product {
                sponsored_link: Some("https://shop.example/mug".to_owned()),
                ..mug()
            }),
            false,
        );
        let mut platform = FakePlatform::default();

        overlay.open_sponsored_link(&mut platform);
        assert_eq!(platform.opened, vec!["https://shop.example/mug".to_owned()]);
    }
}
