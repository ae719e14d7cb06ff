//! Dwell-based selection.
//!
//! A single-slot state machine: at most one target is being dwelt on at any
//! time. Hovering an eligible target for the dwell threshold emits one
//! activation and returns to `Idle`. Moving to another target, to empty
//! space, or onto a target that became ineligible cancels the dwell with no
//! partial credit.
//!
//! Elapsed time is wall-clock time supplied by the caller, so a cursor that
//! froze because frames stopped carrying a face still completes (or loses)
//! its dwell on the next tick.

use crate::geometry::{Rect, ScreenPoint};
use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{Duration, Instant},
};

/// Identifier of a UI target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// An interactive region owned by the UI layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeTarget {
    /// Target identifier
    pub id: TargetId,
    /// Region that counts as "on the target"
    pub hit_region: Rect,
    /// Whether the target currently accepts activation
    pub is_eligible: bool,
}

impl GazeTarget {
    /// An eligible target
    #[must_use]
    pub const fn new(id: TargetId, hit_region: Rect) -> Self {
        Self {
            id,
            hit_region,
            is_eligible: true,
        }
    }
}

/// Hit-test query answered by the UI layer.
///
/// When targets overlap the implementation must return a single,
/// deterministic one (topmost by z-order); the selector does not
/// disambiguate.
pub trait TargetProvider: Send + Sync {
    /// Target under the given point, if any
    fn target_at(&self, point: ScreenPoint) -> Option<GazeTarget>;
}

/// Simple target table with z-ordering: later registrations sit on top
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: RwLock<Vec<GazeTarget>>,
}

impl TargetRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target on top, replacing any previous target with the same id
    pub fn register(&self, target: GazeTarget) {
        let mut targets = self.targets.write();
        targets.retain(|t| t.id != target.id);
        targets.push(target);
    }

    /// Remove a target; returns whether it existed
    pub fn remove(&self, id: TargetId) -> bool {
        let mut targets = self.targets.write();
        let before = targets.len();
        targets.retain(|t| t.id != id);
        targets.len() != before
    }

    /// Enable or disable a target; returns whether it exists
    pub fn set_eligible(&self, id: TargetId, eligible: bool) -> bool {
        let mut targets = self.targets.write();
        match targets.iter_mut().find(|t| t.id == id) {
            Some(target) => {
                target.is_eligible = eligible;
                true
            }
            None => false,
        }
    }

    /// Remove all targets
    pub fn clear(&self) {
        self.targets.write().clear();
    }

    /// Number of registered targets
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.read().len()
    }

    /// Whether no targets are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.read().is_empty()
    }
}

impl TargetProvider for TargetRegistry {
    fn target_at(&self, point: ScreenPoint) -> Option<GazeTarget> {
        self.targets
            .read()
            .iter()
            .rev()
            .find(|t| t.hit_region.contains(point))
            .copied()
    }
}

/// State of the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwellPhase {
    /// No target under the cursor
    Idle,
    /// Dwelling on `target` since `started_at`
    Hovering {
        /// Target being dwelt on
        target: TargetId,
        /// When the dwell began
        started_at: Instant,
    },
}

/// Output of one selector tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DwellEvent {
    /// A dwell began on the target
    Started(TargetId),
    /// Fraction of the threshold elapsed, in [0, 1]
    Progress {
        /// Target being dwelt on
        target: TargetId,
        /// Elapsed / threshold
        fraction: f64,
    },
    /// The dwell completed
    Activated(TargetId),
    /// The dwell ended without activation
    Cancelled(TargetId),
}

/// Dwell selection state machine
#[derive(Debug, Clone)]
pub struct DwellSelector {
    threshold: Duration,
    repeat_after_activation: bool,
    phase: DwellPhase,
    // Target that must be left before it can start another dwell
    spent: Option<TargetId>,
}

impl DwellSelector {
    /// Create a selector.
    ///
    /// With `repeat_after_activation` off, a target that just activated must
    /// be left before it can be dwelt on again. With it on, staying on the
    /// target starts a fresh dwell period right away.
    #[must_use]
    pub const fn new(threshold: Duration, repeat_after_activation: bool) -> Self {
        Self {
            threshold,
            repeat_after_activation,
            phase: DwellPhase::Idle,
            spent: None,
        }
    }

    /// Evaluate one tick given the hit-test result at the cursor
    pub fn update(&mut self, hit: Option<&GazeTarget>, now: Instant) -> Vec<DwellEvent> {
        let candidate = hit.filter(|t| t.is_eligible).map(|t| t.id);
        let mut events = Vec::with_capacity(3);

        if self.spent.is_some() && self.spent != candidate {
            self.spent = None;
        }

        if let DwellPhase::Hovering { target, .. } = self.phase {
            if candidate != Some(target) {
                debug!("Dwell on {} interrupted", target);
                self.phase = DwellPhase::Idle;
                events.push(DwellEvent::Cancelled(target));
            }
        }

        if self.phase == DwellPhase::Idle {
            if let Some(id) = candidate.filter(|id| self.spent != Some(*id)) {
                debug!("Dwell started on {}", id);
                self.phase = DwellPhase::Hovering {
                    target: id,
                    started_at: now,
                };
                events.push(DwellEvent::Started(id));
            }
        }

        if let DwellPhase::Hovering { target, started_at } = self.phase {
            let elapsed = now.saturating_duration_since(started_at);
            events.push(DwellEvent::Progress {
                target,
                fraction: self.fraction(elapsed),
            });

            if elapsed >= self.threshold {
                info!("Dwell activation on {} after {:?}", target, elapsed);
                self.phase = DwellPhase::Idle;
                if !self.repeat_after_activation {
                    self.spent = Some(target);
                }
                events.push(DwellEvent::Activated(target));
            }
        }

        events
    }

    fn fraction(&self, elapsed: Duration) -> f64 {
        if self.threshold.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.threshold.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Abort any dwell without activation; the target may be dwelt on again
    /// from the next tick
    pub fn cancel(&mut self) -> Option<TargetId> {
        self.spent = None;
        self.abort()
    }

    /// Abort any dwell without activation and require the cursor to leave
    /// the target before it can be dwelt on again
    pub fn dismiss(&mut self) -> Option<TargetId> {
        let target = self.abort();
        if target.is_some() {
            self.spent = target;
        }
        target
    }

    fn abort(&mut self) -> Option<TargetId> {
        match std::mem::replace(&mut self.phase, DwellPhase::Idle) {
            DwellPhase::Hovering { target, .. } => {
                debug!("Dwell on {} cancelled", target);
                Some(target)
            }
            DwellPhase::Idle => None,
        }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> DwellPhase {
        self.phase
    }

    /// Dwell duration required for activation
    #[must_use]
    pub const fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Change the dwell duration; applies to the dwell in progress
    pub fn set_threshold(&mut self, threshold: Duration) {
        self.threshold = threshold;
    }
}
