//! Cursor position mapping.
//!
//! Integrates per-tick deltas into an absolute position on the surface.
//! Each step is clipped at the boundary and nothing of the overshoot is
//! kept, so pushing against an edge and then reversing moves away from the
//! edge immediately.

use crate::{
    config::ScreenConfig,
    geometry::{CursorDelta, ScreenPoint, ScreenSize},
};
use log::{debug, warn};

/// Absolute cursor state for one surface
#[derive(Debug, Clone)]
pub struct CursorMapper {
    bounds: ScreenSize,
    position: ScreenPoint,
    velocity: CursorDelta,
    frozen: bool,
}

impl CursorMapper {
    /// Create a mapper with the cursor at the center of the surface
    #[must_use]
    pub fn new(bounds: ScreenSize) -> Self {
        let bounds = Self::checked_bounds(bounds);
        Self {
            bounds,
            position: bounds.center(),
            velocity: CursorDelta::ZERO,
            frozen: false,
        }
    }

    fn checked_bounds(bounds: ScreenSize) -> ScreenSize {
        if bounds.is_valid() {
            bounds
        } else {
            let fallback = ScreenConfig::default().size();
            warn!(
                "Invalid surface size {}x{}, using {}x{}",
                bounds.width, bounds.height, fallback.width, fallback.height
            );
            fallback
        }
    }

    /// Apply one tick's delta and return the new position.
    ///
    /// While frozen, or for a non-finite delta, the position is unchanged.
    pub fn apply(&mut self, delta: CursorDelta) -> ScreenPoint {
        if self.frozen {
            return self.position;
        }
        if !delta.is_finite() {
            debug!("Ignoring non-finite cursor delta {:?}", delta);
            self.velocity = CursorDelta::ZERO;
            return self.position;
        }

        let next = self.bounds.clamp(self.position.offset(delta));
        self.velocity = CursorDelta::new(next.x - self.position.x, next.y - self.position.y);
        self.position = next;
        self.position
    }

    /// Stop moving; the position is kept as-is
    pub fn freeze(&mut self) {
        if !self.frozen {
            debug!("Cursor frozen at ({:.1}, {:.1})", self.position.x, self.position.y);
        }
        self.frozen = true;
        self.velocity = CursorDelta::ZERO;
    }

    /// Continue moving from the frozen position
    pub fn resume(&mut self) {
        self.frozen = false;
    }

    /// Change the surface size, re-clamping the cursor
    pub fn resize(&mut self, bounds: ScreenSize) {
        self.bounds = Self::checked_bounds(bounds);
        self.position = self.bounds.clamp(self.position);
    }

    /// Move the cursor back to the center of the surface
    pub fn recenter(&mut self) {
        self.position = self.bounds.center();
        self.velocity = CursorDelta::ZERO;
    }

    /// Current position
    #[must_use]
    pub const fn position(&self) -> ScreenPoint {
        self.position
    }

    /// Displacement actually applied on the last tick
    #[must_use]
    pub const fn velocity(&self) -> CursorDelta {
        self.velocity
    }

    /// Surface size
    #[must_use]
    pub const fn bounds(&self) -> ScreenSize {
        self.bounds
    }

    /// Whether updates are currently suspended
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }
}
