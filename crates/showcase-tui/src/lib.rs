// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod layout;
mod platform;

pub use layout::{OverlayLayout, centered_rect, hit_test, overlay_layout};
pub use platform::{FilePrompt, TerminalPlatform};

use anyhow::{Context, Result, anyhow};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use showcase_app::{
    AppCommand, AppMode, AppState, CursorMove, FieldCursor, ImageAction, ImageSource,
    OverlayController, OverlayEvent, OverlayVisibility, PageChrome, Product, ProductHost,
    ProductId, QuotaMonitor, QuotaPhase, StorageEstimator, TextField, format_bytes,
};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

const CURSOR_MARK: &str = "▏";
const LINK_ARROW: &str = "↗";
const SHOP_LINK_LABEL: &str = "Shop Link ↗";
const IMAGE_FAILED_NOTICE: &str = "Image Load Failed";
const DESCRIPTION_PREVIEW_CHARS: usize = 48;

/// What the terminal session needs from whoever owns the products.
pub trait AppRuntime: ProductHost {
    fn load_products(&mut self) -> Result<Vec<Product>>;
    /// Creates a blank product and returns it as stored.
    fn create_product(&mut self) -> Result<Product>;
}

pub struct SessionOptions {
    pub downloads_dir: PathBuf,
    pub estimator: Option<Box<dyn StorageEstimator>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    ImageFileRead {
        product_id: ProductId,
        result: Result<Vec<u8>, String>,
    },
}

#[derive(Debug)]
struct ViewData {
    products: Vec<Product>,
    overlay: OverlayController,
    platform: TerminalPlatform,
    quota: QuotaMonitor,
    menu_cursor: usize,
    status_token: u64,
    area: Rect,
    image_info: Option<(String, ImageSource)>,
}

impl ViewData {
    fn new(platform: TerminalPlatform, quota: QuotaMonitor) -> Self {
        Self {
            products: Vec::new(),
            overlay: OverlayController::new(PageChrome::new()),
            platform,
            quota,
            menu_cursor: 0,
            status_token: 0,
            area: Rect::default(),
            image_info: None,
        }
    }

    fn selected_product(&self, state: &AppState) -> Option<&Product> {
        self.products.get(state.selected_row)
    }

    fn link_visible(&self) -> bool {
        self.overlay
            .working_copy()
            .and_then(Product::visible_sponsored_link)
            .is_some()
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: SessionOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (internal_tx, internal_rx) = mpsc::channel();
    let platform = TerminalPlatform::new(options.downloads_dir, internal_tx.clone());
    let mut view_data = ViewData::new(platform, QuotaMonitor::new(options.estimator));

    if let Err(error) = reload_products(state, runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error:#}")));
    }
    view_data.quota.start(Instant::now());

    let mut result = Ok(());
    loop {
        view_data.quota.poll(Instant::now());
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);
        refresh_image_info(&mut view_data);

        match terminal.size() {
            Ok(size) => view_data.area = Rect::new(0, 0, size.width, size.height),
            Err(error) => {
                result = Err(error).context("read terminal size");
                break;
            }
        }

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        match event::poll(Duration::from_millis(120)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(error) => {
                result = Err(error).context("poll event");
                break;
            }
        }
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(Event::Mouse(mouse)) => {
                handle_mouse_event(state, runtime, &mut view_data, &internal_tx, mouse);
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error).context("read event");
                break;
            }
        }
    }

    view_data.overlay.close();
    view_data.quota.stop();
    disable_raw_mode().context("disable raw mode")?;
    execute!(
        io::stdout(),
        terminal::LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("leave alternate screen")?;
    result
}

fn reload_products<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    view_data.products = runtime.load_products()?;
    state.dispatch(AppCommand::SelectRow {
        index: state.selected_row,
        row_count: view_data.products.len(),
    });
    let open_id = view_data.overlay.working_copy().map(|product| product.id);
    if let Some(upstream) = open_id
        .and_then(|id| view_data.products.iter().find(|row| row.id == id))
        .cloned()
    {
        view_data.overlay.sync_upstream(&upstream);
    }
    Ok(())
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        handle_internal_event(state, runtime, view_data, tx, event);
    }
}

fn handle_internal_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    event: InternalEvent,
) {
    match event {
        InternalEvent::ClearStatus { token } if token == view_data.status_token => {
            state.dispatch(AppCommand::ClearStatus);
        }
        InternalEvent::ClearStatus { .. } => {}
        InternalEvent::ImageFileRead { product_id, result } => {
            let bytes = result.map_err(|error| anyhow!(error));
            let outcome = view_data
                .overlay
                .complete_upload(product_id, bytes, runtime);
            finish_overlay_action(state, runtime, view_data, tx, outcome);
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn finish_overlay_action<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    outcome: Result<Vec<OverlayEvent>>,
) {
    match outcome {
        Ok(events) => apply_overlay_events(state, runtime, view_data, tx, events),
        Err(error) => emit_status(state, view_data, tx, format!("{error:#}")),
    }
}

fn apply_overlay_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<OverlayEvent>,
) {
    for event in events {
        match event {
            OverlayEvent::Opened { .. } | OverlayEvent::FocusMoved(_) => {}
            OverlayEvent::Saved { id, .. } => {
                let Some(copy) = view_data.overlay.working_copy().cloned() else {
                    continue;
                };
                if let Some(row) = view_data.products.iter_mut().find(|row| row.id == id) {
                    *row = copy;
                }
            }
            OverlayEvent::ImageMenuToggled(open) => {
                if open {
                    view_data.menu_cursor = 0;
                } else {
                    view_data.platform.cancel_prompt();
                }
            }
            OverlayEvent::UploadRequested => {
                emit_status(state, view_data, tx, "type an image path; enter reads it, esc cancels");
            }
            OverlayEvent::ImageReplaced(id) => {
                emit_status(state, view_data, tx, format!("image replaced on product {id}"));
            }
            OverlayEvent::Downloaded(path) => {
                emit_status(state, view_data, tx, format!("saved {}", path.display()));
            }
            OverlayEvent::ExternalOpened(url) => {
                emit_status(state, view_data, tx, format!("opened {url}"));
            }
            OverlayEvent::Notice(message) => emit_status(state, view_data, tx, message),
            OverlayEvent::Deleted(id) => {
                emit_status(state, view_data, tx, format!("deleted product {id}"));
            }
            OverlayEvent::DeleteRejected(id) => {
                emit_status(state, view_data, tx, format!("product {id} was kept"));
            }
            OverlayEvent::Closed => {
                view_data.platform.cancel_prompt();
                if let Err(error) = reload_products(state, runtime, view_data) {
                    emit_status(state, view_data, tx, format!("reload failed: {error:#}"));
                }
            }
        }
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('q') {
        return true;
    }
    if view_data.platform.prompt().is_some() {
        handle_prompt_key(state, view_data, internal_tx, key);
        return false;
    }
    if view_data.overlay.is_open() {
        handle_overlay_key(state, runtime, view_data, internal_tx, key);
        return false;
    }
    handle_list_key(state, runtime, view_data, internal_tx, key)
}

fn handle_prompt_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.platform.cancel_prompt();
            emit_status(state, view_data, internal_tx, "upload cancelled");
        }
        KeyCode::Enter => {
            let Some(target) = view_data.overlay.working_copy().map(|product| product.id) else {
                view_data.platform.cancel_prompt();
                return;
            };
            let message = match view_data.platform.submit_prompt(target) {
                Ok(path) => format!("reading {}", path.display()),
                Err(error) => format!("{error:#}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        KeyCode::Backspace => {
            if let Some(prompt) = view_data.platform.prompt_mut() {
                prompt.input.pop();
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(prompt) = view_data.platform.prompt_mut() {
                prompt.input.push(ch);
            }
        }
        _ => {}
    }
}

fn handle_overlay_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let overlay = &mut view_data.overlay;
    let outcome = match key.code {
        KeyCode::Esc if overlay.chrome().escape_captured() => Ok(overlay.handle_escape()),
        KeyCode::Char('p') if ctrl => Ok(overlay.toggle_image_menu()),
        KeyCode::Char('d') if ctrl => overlay.delete(runtime),
        KeyCode::Char('r') if ctrl => {
            let message = match reload_products(state, runtime, view_data) {
                Ok(()) => "reloaded from store".to_owned(),
                Err(error) => format!("reload failed: {error:#}"),
            };
            emit_status(state, view_data, internal_tx, message);
            return;
        }
        _ if overlay.image_menu_open() => {
            let action = match key.code {
                KeyCode::Up => {
                    view_data.menu_cursor =
                        (view_data.menu_cursor + ImageAction::ALL.len() - 1) % ImageAction::ALL.len();
                    None
                }
                KeyCode::Down => {
                    view_data.menu_cursor = (view_data.menu_cursor + 1) % ImageAction::ALL.len();
                    None
                }
                KeyCode::Enter => ImageAction::ALL.get(view_data.menu_cursor).copied(),
                KeyCode::Char(ch) if !ctrl => ImageAction::from_shortcut(ch),
                _ => None,
            };
            match action {
                Some(action) => Ok(overlay.run_image_action(action, &mut view_data.platform)),
                None => Ok(Vec::new()),
            }
        }
        _ if overlay.visibility().is_editable() => match key.code {
            KeyCode::Tab => Ok(overlay.cycle_focus(1)),
            KeyCode::BackTab => Ok(overlay.cycle_focus(-1)),
            KeyCode::Enter => overlay.handle_enter(runtime),
            KeyCode::Backspace => overlay.backspace(runtime),
            KeyCode::Delete => overlay.delete_forward(runtime),
            KeyCode::Left => move_cursor(overlay, CursorMove::Left),
            KeyCode::Right => move_cursor(overlay, CursorMove::Right),
            KeyCode::Home => move_cursor(overlay, CursorMove::Home),
            KeyCode::End => move_cursor(overlay, CursorMove::End),
            KeyCode::Char(ch) if !ctrl => overlay.insert_text(&ch.to_string(), runtime),
            _ => Ok(Vec::new()),
        },
        KeyCode::Char('l') => Ok(overlay.open_sponsored_link(&mut view_data.platform)),
        KeyCode::Char('i') => {
            state.dispatch(AppCommand::EnterEditMode);
            let editable = state.mode.is_editable();
            Ok(view_data.overlay.set_editable(editable))
        }
        _ => Ok(Vec::new()),
    };
    finish_overlay_action(state, runtime, view_data, internal_tx, outcome);
}

fn move_cursor(overlay: &mut OverlayController, movement: CursorMove) -> Result<Vec<OverlayEvent>> {
    overlay.move_cursor(movement);
    Ok(Vec::new())
}

fn handle_list_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let row_count = view_data.products.len();
    let scroll_locked = view_data.overlay.chrome().scroll_locked();
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down if !scroll_locked => {
            state.dispatch(AppCommand::MoveSelection {
                delta: 1,
                row_count,
            });
        }
        KeyCode::Char('k') | KeyCode::Up if !scroll_locked => {
            state.dispatch(AppCommand::MoveSelection {
                delta: -1,
                row_count,
            });
        }
        KeyCode::Char('g') | KeyCode::Home if !scroll_locked => {
            state.dispatch(AppCommand::SelectRow {
                index: 0,
                row_count,
            });
        }
        KeyCode::Char('G') | KeyCode::End if !scroll_locked => {
            state.dispatch(AppCommand::SelectRow {
                index: row_count.saturating_sub(1),
                row_count,
            });
        }
        KeyCode::Enter => {
            let selected = view_data.selected_product(state).cloned();
            if selected.is_none() {
                emit_status(state, view_data, internal_tx, "no product selected");
                return false;
            }
            let events = view_data.overlay.open(selected, state.mode.is_editable());
            apply_overlay_events(state, runtime, view_data, internal_tx, events);
        }
        KeyCode::Char('i') => {
            state.dispatch(AppCommand::EnterEditMode);
        }
        KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Char('a') => {
            if state.mode != AppMode::Edit {
                emit_status(state, view_data, internal_tx, "press i to edit before adding");
                return false;
            }
            match runtime.create_product() {
                Ok(product) => {
                    let id = product.id;
                    if let Err(error) = reload_products(state, runtime, view_data) {
                        emit_status(state, view_data, internal_tx, format!("reload failed: {error:#}"));
                    }
                    if let Some(index) = view_data.products.iter().position(|row| row.id == id) {
                        state.dispatch(AppCommand::SelectRow {
                            index,
                            row_count: view_data.products.len(),
                        });
                    }
                    let events = view_data.overlay.open(Some(product), true);
                    apply_overlay_events(state, runtime, view_data, internal_tx, events);
                }
                Err(error) => {
                    emit_status(state, view_data, internal_tx, format!("add failed: {error:#}"));
                }
            }
        }
        KeyCode::Char('r') => {
            let message = if view_data.quota.refresh() {
                format!("storage refreshed: {}", quota_text(&view_data.quota))
            } else if view_data.quota.phase() == QuotaPhase::Unavailable {
                "storage estimate unavailable".to_owned()
            } else {
                "storage estimate failed; keeping last reading".to_owned()
            };
            emit_status(state, view_data, internal_tx, message);
        }
        _ => {}
    }
    false
}

fn handle_mouse_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    mouse: MouseEvent,
) {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left)
        || !view_data.overlay.is_open()
        || view_data.platform.prompt().is_some()
    {
        return;
    }
    let layout = overlay_layout(view_data.area);
    let region = hit_test(
        &layout,
        view_data.overlay.visibility(),
        view_data.link_visible(),
        mouse.column,
        mouse.row,
    );
    let outcome = view_data
        .overlay
        .click(region, runtime, &mut view_data.platform);
    finish_overlay_action(state, runtime, view_data, internal_tx, outcome);
}

fn refresh_image_info(view_data: &mut ViewData) {
    let Some(current) = view_data.overlay.working_copy().map(|p| p.image.clone()) else {
        view_data.image_info = None;
        return;
    };
    let stale = view_data
        .image_info
        .as_ref()
        .is_none_or(|(cached, _)| *cached != current);
    if stale {
        let source = ImageSource::inspect(&current);
        view_data.image_info = Some((current, source));
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(state, view_data))
        .block(Block::default().title("showcase").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    render_table(frame, layout[1], state, view_data);

    let quota_style = if view_data.quota.state().is_critical {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let status = Line::from(vec![
        Span::styled(status_text(state, view_data), Style::default().fg(Color::Yellow)),
        Span::raw(" | "),
        Span::styled(quota_text(&view_data.quota), quota_style),
    ]);
    let status_widget = Paragraph::new(status).block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if view_data.overlay.is_open() {
        render_overlay(frame, view_data);
    }

    if let Some(prompt) = view_data.platform.prompt() {
        let area = centered_rect(60, 20, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(prompt_text(&prompt.input))
            .wrap(Wrap { trim: false })
            .block(Block::default().title("upload image").borders(Borders::ALL));
        frame.render_widget(widget, area);
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let header = Row::new(["id", "name", "description", "image", "link"].map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = view_data.products.iter().enumerate().map(|(index, product)| {
        let style = if index == state.selected_row {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        Row::new(product_row_cells(product)).style(style)
    });
    let widths = [
        Constraint::Length(6),
        Constraint::Percentage(25),
        Constraint::Min(16),
        Constraint::Length(9),
        Constraint::Length(4),
    ];
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("products ({})", view_data.products.len())),
    );
    frame.render_widget(table, area);
}

fn render_overlay(frame: &mut ratatui::Frame<'_>, view_data: &ViewData) {
    let Some(product) = view_data.overlay.working_copy() else {
        return;
    };
    let layout = overlay_layout(frame.area());
    let visibility = view_data.overlay.visibility();

    frame.render_widget(Clear, layout.area);
    frame.render_widget(
        Block::default().style(Style::default().bg(Color::Black)),
        layout.area,
    );
    let title = if visibility.is_editable() {
        format!("edit product {}", product.id)
    } else {
        format!("product {}", product.id)
    };
    frame.render_widget(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
        layout.panel,
    );

    let image_text = match &view_data.image_info {
        Some((_, source)) => image_region_text(source, visibility),
        None => IMAGE_FAILED_NOTICE.to_owned(),
    };
    let broken = view_data
        .image_info
        .as_ref()
        .is_none_or(|(_, source)| source.is_broken());
    let image_style = if broken {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    frame.render_widget(
        Paragraph::new(image_text)
            .style(image_style)
            .wrap(Wrap { trim: false })
            .block(Block::default().title("image").borders(Borders::ALL)),
        layout.image_region,
    );

    if visibility.is_editable() {
        let focus = view_data.overlay.focus();
        for (field, area) in TextField::ALL.into_iter().zip(layout.fields) {
            let cursor = if focus == Some(field) {
                view_data.overlay.cursor(field)
            } else {
                None
            };
            let (text, style) =
                input_display(product.field(field.product_field()), field.placeholder(), cursor);
            let border = if cursor.is_some() {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            frame.render_widget(
                Paragraph::new(Text::styled(text, style))
                    .wrap(Wrap { trim: false })
                    .block(Block::default().borders(Borders::ALL).border_style(border)),
                area,
            );
        }
        frame.render_widget(
            Paragraph::new("[Delete Item]").style(Style::default().fg(Color::Red)),
            layout.delete,
        );
    } else {
        let fields = view_fields(product);
        frame.render_widget(
            Paragraph::new(fields.heading).style(Style::default().add_modifier(Modifier::BOLD)),
            layout.fields[0],
        );
        frame.render_widget(
            Paragraph::new(fields.description).wrap(Wrap { trim: false }),
            layout.fields[1],
        );
        if let Some(link) = fields.link {
            frame.render_widget(
                Paragraph::new(link).style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::UNDERLINED),
                ),
                layout.fields[2],
            );
        }
    }

    if visibility.image_menu_open() {
        frame.render_widget(Clear, layout.menu);
        frame.render_widget(
            Paragraph::new(menu_text(view_data.menu_cursor))
                .block(Block::default().title("image actions").borders(Borders::ALL)),
            layout.menu,
        );
    }
}

fn header_text(state: &AppState, view_data: &ViewData) -> String {
    let access = if state.read_only { " (read-only)" } else { "" };
    match view_data.selected_product(state) {
        Some(product) if !view_data.products.is_empty() => format!(
            "{}{access} | {} of {} | {}",
            state.mode.label(),
            state.selected_row + 1,
            view_data.products.len(),
            display_name(product)
        ),
        _ => format!("{}{access} | no products", state.mode.label()),
    }
}

fn product_row_cells(product: &Product) -> [String; 5] {
    [
        product.id.to_string(),
        display_name(product).to_owned(),
        preview(&product.description, DESCRIPTION_PREVIEW_CHARS),
        image_kind(&product.image).to_owned(),
        if product.visible_sponsored_link().is_some() {
            LINK_ARROW.to_owned()
        } else {
            String::new()
        },
    ]
}

fn display_name(product: &Product) -> &str {
    if product.name.trim().is_empty() {
        "(untitled)"
    } else {
        &product.name
    }
}

/// Classifies an image value by its shape alone, without touching the disk.
fn image_kind(image: &str) -> &'static str {
    let image = image.trim();
    if image.is_empty() {
        "none"
    } else if image.starts_with("data:") {
        "embedded"
    } else if image.starts_with("http://") || image.starts_with("https://") {
        "remote"
    } else {
        "file"
    }
}

fn preview(value: &str, max_chars: usize) -> String {
    let flat = value.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewFields<'a> {
    heading: &'a str,
    description: &'a str,
    link: Option<&'static str>,
}

fn view_fields(product: &Product) -> ViewFields<'_> {
    ViewFields {
        heading: &product.name,
        description: &product.description,
        link: product.visible_sponsored_link().map(|_| SHOP_LINK_LABEL),
    }
}

/// Text and style for one edit input. The focused field shows its cursor, or is
/// highlighted whole when its value is selected.
fn input_display(value: &str, placeholder: &str, cursor: Option<FieldCursor>) -> (String, Style) {
    match cursor {
        None if value.is_empty() => (placeholder.to_owned(), Style::default().fg(Color::DarkGray)),
        None => (value.to_owned(), Style::default()),
        Some(cursor) if cursor.selected_all && !value.is_empty() => (
            value.to_owned(),
            Style::default().add_modifier(Modifier::REVERSED),
        ),
        Some(cursor) => {
            let at = value
                .char_indices()
                .nth(cursor.position)
                .map_or(value.len(), |(index, _)| index);
            let mut text = String::with_capacity(value.len() + CURSOR_MARK.len());
            text.push_str(&value[..at]);
            text.push_str(CURSOR_MARK);
            text.push_str(&value[at..]);
            (text, Style::default())
        }
    }
}

fn image_region_text(source: &ImageSource, visibility: OverlayVisibility) -> String {
    let mut text = match source {
        ImageSource::Embedded {
            mime_type,
            size_bytes,
            width,
            height,
        } => format!(
            "embedded {mime_type}\n{width}x{height} px\n{}",
            format_bytes(*size_bytes as u64)
        ),
        ImageSource::Remote(url) => format!("remote image\n{url}"),
        ImageSource::Local {
            path,
            width,
            height,
        } => format!("file {}\n{width}x{height} px", path.display()),
        ImageSource::Broken => IMAGE_FAILED_NOTICE.to_owned(),
    };
    if visibility.is_editable() {
        text.push_str("\n\nctrl+p or click for image actions");
    }
    text
}

fn menu_text(cursor: usize) -> String {
    ImageAction::ALL
        .iter()
        .enumerate()
        .map(|(index, action)| {
            let marker = if index == cursor { "›" } else { " " };
            format!("{marker} {}  {}", action.shortcut(), action.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn prompt_text(input: &str) -> String {
    format!("image path: {input}{CURSOR_MARK}\n\nenter reads the file | esc cancels")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let hints = if view_data.platform.prompt().is_some() {
        "PATH | enter read | esc cancel"
    } else {
        match view_data.overlay.visibility() {
            OverlayVisibility::Closed => {
                let mode = state.mode.label();
                return match &state.status_line {
                    Some(status) => format!(
                        "{mode} | {status} | j/k enter i/esc a | r storage | q"
                    ),
                    None => format!("{mode} | j/k enter i/esc a | r storage | q"),
                };
            }
            OverlayVisibility::OpenView => "VIEW | l link | i edit | esc close",
            OverlayVisibility::OpenEdit {
                image_menu_open: false,
            } => "EDIT | tab field | ctrl+p image | ctrl+d delete | ctrl+r reload | esc close",
            OverlayVisibility::OpenEdit {
                image_menu_open: true,
            } => "IMAGE | up/down enter | u c d s | ctrl+p close",
        }
    };
    match &state.status_line {
        Some(status) => format!("{hints} | {status}"),
        None => hints.to_owned(),
    }
}

fn quota_text(quota: &QuotaMonitor) -> String {
    if quota.phase() == QuotaPhase::Unavailable {
        return "storage n/a".to_owned();
    }
    let reading = quota.state();
    let mut text = format!(
        "storage {} / {} ({:.1}%)",
        format_bytes(reading.used_bytes),
        format_bytes(reading.total_bytes),
        reading.percentage_used
    );
    if reading.is_critical {
        text.push_str(" critical");
    }
    text
}
