// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::AppMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub selected_row: usize,
    pub read_only: bool,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            selected_row: 0,
            read_only: false,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    EnterEditMode,
    ExitToNav,
    MoveSelection { delta: isize, row_count: usize },
    SelectRow { index: usize, row_count: usize },
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    SelectionChanged(usize),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::EnterEditMode => {
                if self.read_only {
                    return vec![self.set_status("read-only session; edit mode unavailable")];
                }
                self.mode = AppMode::Edit;
                vec![AppEvent::ModeChanged(self.mode), self.set_status("edit")]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode), self.set_status("nav")]
            }
            AppCommand::MoveSelection { delta, row_count } => {
                if row_count == 0 {
                    return Vec::new();
                }
                let max = row_count.saturating_sub(1) as isize;
                let next = (self.selected_row as isize + delta).clamp(0, max) as usize;
                self.select(next)
            }
            AppCommand::SelectRow { index, row_count } => {
                let next = index.min(row_count.saturating_sub(1));
                self.select(next)
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn select(&mut self, index: usize) -> Vec<AppEvent> {
        if index == self.selected_row {
            return Vec::new();
        }
        self.selected_row = index;
        vec![AppEvent::SelectionChanged(index)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
