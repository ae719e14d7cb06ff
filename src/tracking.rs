//! Debounced tracking availability.
//!
//! A dropout becomes `Lost` only after confidence has been continuously
//! absent for the grace window; recovery is reported on the first confident
//! frame. Only actual transitions are returned, never repeats.

use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{Duration, Instant},
};

/// Whether the user's face is currently being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackingAvailability {
    /// Nothing known yet for this session
    #[default]
    Unknown,
    /// Face is tracked
    Acquired,
    /// Face has not been tracked for at least the grace window
    Lost,
}

impl fmt::Display for TrackingAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Acquired => "acquired",
            Self::Lost => "lost",
        };
        f.write_str(name)
    }
}

/// Availability debouncer
#[derive(Debug, Clone)]
pub struct TrackingMonitor {
    grace_period: Duration,
    availability: TrackingAvailability,
    dropout_since: Option<Instant>,
}

impl TrackingMonitor {
    /// Create a monitor in the `Unknown` state
    #[must_use]
    pub const fn new(grace_period: Duration) -> Self {
        Self {
            grace_period,
            availability: TrackingAvailability::Unknown,
            dropout_since: None,
        }
    }

    /// Feed one frame's confidence; returns the new value on a transition
    pub fn update(&mut self, confident: bool, now: Instant) -> Option<TrackingAvailability> {
        if confident {
            self.dropout_since = None;
            return self.transition(TrackingAvailability::Acquired);
        }

        let since = *self.dropout_since.get_or_insert(now);
        if now.saturating_duration_since(since) >= self.grace_period {
            self.transition(TrackingAvailability::Lost)
        } else {
            None
        }
    }

    /// Go to `Lost` without waiting for the grace window
    pub fn force_lost(&mut self) -> Option<TrackingAvailability> {
        self.dropout_since = None;
        self.transition(TrackingAvailability::Lost)
    }

    /// Back to `Unknown`, as at the start of a sensor session
    pub fn restart(&mut self) -> Option<TrackingAvailability> {
        self.dropout_since = None;
        self.transition(TrackingAvailability::Unknown)
    }

    fn transition(&mut self, next: TrackingAvailability) -> Option<TrackingAvailability> {
        if self.availability == next {
            return None;
        }
        info!("Tracking {} -> {}", self.availability, next);
        self.availability = next;
        Some(next)
    }

    /// Last published value
    #[must_use]
    pub const fn availability(&self) -> TrackingAvailability {
        self.availability
    }

    /// Grace window
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        self.grace_period
    }
}
