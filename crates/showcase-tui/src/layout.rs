// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Overlay geometry shared by rendering and mouse hit-testing.

use ratatui::layout::{Constraint, Direction, Layout, Margin, Position, Rect};
use showcase_app::{ClickRegion, ImageAction, OverlayVisibility, TextField};

const DELETE_LABEL_WIDTH: u16 = 13;
const MENU_WIDTH: u16 = 30;
const MENU_HEIGHT: u16 = ImageAction::ALL.len() as u16 + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLayout {
    /// The whole viewport; anything outside the panel is backdrop.
    pub area: Rect,
    pub panel: Rect,
    pub image_region: Rect,
    pub field_region: Rect,
    pub image: Rect,
    pub menu: Rect,
    /// Name, description and sponsored link, in [`TextField::ALL`] order. View mode
    /// draws the heading, body and shop link into the same slots.
    pub fields: [Rect; 3],
    pub delete: Rect,
}

pub fn overlay_layout(area: Rect) -> OverlayLayout {
    let panel = centered_rect(80, 80, area);
    let inner = panel.inner(Margin::new(1, 1));
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(3, 5), Constraint::Ratio(2, 5)])
        .split(inner);
    let image_region = columns[0];
    let field_region = columns[1];

    let image = image_region.inner(Margin::new(1, 1));
    let menu_width = MENU_WIDTH.min(image.width);
    let menu_height = MENU_HEIGHT.min(image.height);
    let menu = Rect::new(
        image.x + (image.width - menu_width) / 2,
        image.y + (image.height - menu_height) / 2,
        menu_width,
        menu_height,
    );

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(field_region.inner(Margin::new(1, 0)));

    // Pinned to the viewport corner, outside the panel.
    let delete_width = DELETE_LABEL_WIDTH.min(area.width);
    let delete = Rect::new(
        area.right().saturating_sub(delete_width),
        area.bottom().saturating_sub(1),
        delete_width,
        area.height.min(1),
    );

    OverlayLayout {
        area,
        panel,
        image_region,
        field_region,
        image,
        menu,
        fields: [rows[0], rows[1], rows[2]],
        delete,
    }
}

/// Maps a click at `(x, y)` to the region it landed in. The innermost target wins.
pub fn hit_test(
    layout: &OverlayLayout,
    visibility: OverlayVisibility,
    link_visible: bool,
    x: u16,
    y: u16,
) -> ClickRegion {
    let position = Position::new(x, y);

    if visibility.image_menu_open() && layout.menu.contains(position) {
        let row = y.saturating_sub(layout.menu.y + 1) as usize;
        let inside_border = y > layout.menu.y && y + 1 < layout.menu.bottom();
        return match ImageAction::ALL.get(row) {
            Some(action) if inside_border => ClickRegion::MenuAction(*action),
            _ => ClickRegion::ImageRegion,
        };
    }

    if visibility.is_editable() && layout.delete.contains(position) {
        return ClickRegion::Delete;
    }

    if !layout.panel.contains(position) {
        return ClickRegion::Backdrop;
    }

    if layout.image_region.contains(position) {
        return if layout.image.contains(position) {
            ClickRegion::Image
        } else {
            ClickRegion::ImageRegion
        };
    }

    if layout.field_region.contains(position) {
        if visibility.is_editable() {
            for (field, rect) in TextField::ALL.into_iter().zip(layout.fields) {
                if rect.contains(position) {
                    return ClickRegion::Field(field);
                }
            }
        } else if link_visible && layout.fields[2].contains(position) {
            return ClickRegion::SponsoredLink;
        }
        return ClickRegion::FieldRegion;
    }

    ClickRegion::Panel
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
