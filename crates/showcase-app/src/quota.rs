// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const QUOTA_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const CRITICAL_PERCENTAGE: f64 = 90.0;
pub const CRITICAL_REMAINING_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEstimate {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Reports how much of the backing storage is in use.
pub trait StorageEstimator {
    fn estimate(&mut self) -> Result<StorageEstimate>;
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuotaState {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percentage_used: f64,
    pub is_critical: bool,
}

impl QuotaState {
    pub fn from_estimate(estimate: StorageEstimate) -> Self {
        let StorageEstimate {
            used_bytes,
            total_bytes,
        } = estimate;
        let percentage_used = if total_bytes > 0 {
            used_bytes as f64 / total_bytes as f64 * 100.0
        } else {
            0.0
        };
        let mut state = Self {
            used_bytes,
            total_bytes,
            percentage_used,
            is_critical: false,
        };
        state.is_critical = percentage_used > CRITICAL_PERCENTAGE
            || (total_bytes > 0 && state.remaining_bytes() < CRITICAL_REMAINING_BYTES);
        state
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaPhase {
    Unavailable,
    Idle,
    Refreshing,
}

/// Polls a [`StorageEstimator`] on a fixed interval. The owner drives it by
/// calling [`QuotaMonitor::poll`] from its event loop.
pub struct QuotaMonitor {
    estimator: Option<Box<dyn StorageEstimator>>,
    state: QuotaState,
    phase: QuotaPhase,
    next_tick: Option<Instant>,
    refresh_count: u64,
}

impl std::fmt::Debug for QuotaMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaMonitor")
            .field("state", &self.state)
            .field("phase", &self.phase)
            .field("next_tick", &self.next_tick)
            .field("refresh_count", &self.refresh_count)
            .finish_non_exhaustive()
    }
}

impl QuotaMonitor {
    pub fn new(estimator: Option<Box<dyn StorageEstimator>>) -> Self {
        let phase = if estimator.is_some() {
            QuotaPhase::Idle
        } else {
            QuotaPhase::Unavailable
        };
        Self {
            estimator,
            state: QuotaState::default(),
            phase,
            next_tick: None,
            refresh_count: 0,
        }
    }

    pub fn unavailable() -> Self {
        Self::new(None)
    }

    pub fn state(&self) -> QuotaState {
        self.state
    }

    pub fn phase(&self) -> QuotaPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// Refreshes once right away and schedules the periodic tick. Does nothing when
    /// no estimator is available.
    pub fn start(&mut self, now: Instant) {
        if self.estimator.is_none() {
            return;
        }
        self.refresh();
        self.next_tick = Some(now + QUOTA_POLL_INTERVAL);
    }

    /// Refreshes when the tick is due. Returns whether a refresh ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_tick else {
            return false;
        };
        if now < due {
            return false;
        }
        let mut next = due + QUOTA_POLL_INTERVAL;
        while next <= now {
            next += QUOTA_POLL_INTERVAL;
        }
        self.next_tick = Some(next);
        self.refresh()
    }

    /// Runs one estimate now. A failure is logged and the previous state stays.
    pub fn refresh(&mut self) -> bool {
        let Some(estimator) = self.estimator.as_mut() else {
            return false;
        };
        self.phase = QuotaPhase::Refreshing;
        let result = estimator.estimate();
        self.phase = QuotaPhase::Idle;
        self.refresh_count += 1;

        match result {
            Ok(estimate) => {
                self.state = QuotaState::from_estimate(estimate);
                debug!(
                    used_bytes = self.state.used_bytes,
                    total_bytes = self.state.total_bytes,
                    critical = self.state.is_critical,
                    "quota refreshed"
                );
                true
            }
            Err(error) => {
                warn!(error = %error, "storage estimate failed");
                false
            }
        }
    }

    pub fn stop(&mut self) {
        self.next_tick = None;
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
