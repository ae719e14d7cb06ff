//! Clock abstraction for the wall-clock timers (dwell, debounce).
//!
//! Production code uses `SystemClock`. Tests and replays use `ManualClock`
//! and advance it frame by frame.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Source of monotonic wall-clock time
pub trait Clock: Send + Sync {
    /// Returns the current monotonic instant
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    instant: Mutex<Instant>,
}

impl ManualClock {
    /// Create a manual clock starting at the current real time
    #[must_use]
    pub fn new() -> Self {
        Self {
            instant: Mutex::new(Instant::now()),
        }
    }

    /// Advance time by the given duration
    pub fn advance(&self, duration: Duration) {
        *self.instant.lock() += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.instant.lock()
    }
}
