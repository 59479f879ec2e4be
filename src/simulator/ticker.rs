//! Cancellable periodic tick source.
//!
//! A `Ticker` is a single repeating timer backed by a crossbeam tick
//! channel. The owner drains due ticks on its own processing step; nothing
//! runs in the background on the owner's behalf. Cancelling swaps the
//! channel for one that never fires, so no tick can be observed afterwards.

use std::time::{Duration, Instant};

use crossbeam_channel::{never, tick, Receiver};
use serde::{Deserialize, Serialize};

/// How simulator ticks are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// Wall-clock ticks every `tick_period`.
    #[default]
    Realtime,
    /// No ticks fire on their own; the owner steps explicitly.
    Manual,
}

/// Periodic tick handle with an explicit, idempotent `cancel`.
#[derive(Debug)]
pub struct Ticker {
    rx: Receiver<Instant>,
    period: Option<Duration>,
    cancelled: bool,
}

impl Ticker {
    /// Ticks every `period` of wall time.
    #[must_use]
    pub fn interval(period: Duration) -> Self {
        Self {
            rx: tick(period),
            period: Some(period),
            cancelled: false,
        }
    }

    /// Never fires; the owner steps manually.
    #[must_use]
    pub fn manual() -> Self {
        Self {
            rx: never(),
            period: None,
            cancelled: false,
        }
    }

    /// Builds the ticker for a clock mode.
    #[must_use]
    pub fn for_mode(mode: ClockMode, period: Duration) -> Self {
        match mode {
            ClockMode::Realtime => Self::interval(period),
            ClockMode::Manual => Self::manual(),
        }
    }

    /// Tick period, if wall-clock driven.
    #[must_use]
    pub const fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Number of ticks that fired since the last drain.
    ///
    /// The tick channel holds at most one pending tick, so a slow consumer
    /// sees a slower animation rather than a burst.
    #[must_use]
    pub fn due(&self) -> usize {
        if self.cancelled {
            return 0;
        }
        self.rx.try_iter().count()
    }

    /// Blocks until the next tick. Returns `false` if it can never fire.
    #[must_use]
    pub fn wait(&self) -> bool {
        if self.cancelled || self.period.is_none() {
            return false;
        }
        self.rx.recv().is_ok()
    }

    /// Stops the ticker. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.rx = never();
    }

    /// Whether `cancel` has been called.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
