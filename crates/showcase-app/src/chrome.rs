// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Page-level side effects that an open overlay holds for its lifetime: the
//! suspended outer scroll and the global Escape listener.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct ChromeCounters {
    scroll_locks: Cell<usize>,
    escape_listeners: Cell<usize>,
}

/// Shared handle to the page chrome. Cloning is cheap and every clone observes the
/// same counters.
#[derive(Debug, Clone, Default)]
pub struct PageChrome {
    counters: Rc<ChromeCounters>,
}

impl PageChrome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspends outer scroll and registers an Escape listener until the returned
    /// guard is dropped.
    pub fn acquire_overlay_scope(&self) -> OverlayScope {
        bump(&self.counters.scroll_locks, 1);
        bump(&self.counters.escape_listeners, 1);
        OverlayScope {
            chrome: self.clone(),
        }
    }

    pub fn scroll_locked(&self) -> bool {
        self.counters.scroll_locks.get() > 0
    }

    pub fn escape_listener_count(&self) -> usize {
        self.counters.escape_listeners.get()
    }

    pub fn escape_captured(&self) -> bool {
        self.escape_listener_count() > 0
    }
}

fn bump(counter: &Cell<usize>, delta: isize) {
    let next = counter.get().saturating_add_signed(delta);
    counter.set(next);
}

#[derive(Debug)]
pub struct OverlayScope {
    chrome: PageChrome,
}

impl Drop for OverlayScope {
    fn drop(&mut self) {
        bump(&self.chrome.counters.scroll_locks, -1);
        bump(&self.chrome.counters.escape_listeners, -1);
    }
}
