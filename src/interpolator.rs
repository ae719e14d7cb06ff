//! Tracking interpolators: the control loop that turns head pose into
//! per-tick cursor displacements.
//!
//! Two strategies share the [`TrackingInterpolator`] contract:
//! - [`PidInterpolator`] drives the production cursor. It treats the
//!   corrected angular deltas as the control error relative to center and
//!   produces a smoothed screen-space velocity.
//! - [`PassThroughInterpolator`] applies the scale with no smoothing and is
//!   only ever wired to the diagnostics cursor.
//!
//! Both hold their state when a tick has no pose, so a short dropout does not
//! make the cursor jump when tracking resumes. Frame intervals come from the
//! sample timestamps and are capped, so a long gap is integrated as a single
//! bounded step.

use crate::{
    config::InterpolatorConfig,
    correction::CorrectionOffset,
    geometry::CursorDelta,
    pose::PoseSample,
    smoothing::LowPassFilter,
    Error, Result,
};
use log::trace;
use nalgebra::Vector2;
use std::time::Duration;

/// Common contract of the control-loop strategies
pub trait TrackingInterpolator: Send {
    /// Advance the loop by one tick.
    ///
    /// Returns `None` when no pose was available this tick; the internal
    /// state is held unchanged in that case.
    fn update(&mut self, pose: Option<&PoseSample>, correction: &CorrectionOffset, scale: f64) -> Option<CursorDelta>;

    /// Drop all accumulated state
    fn reset(&mut self);

    /// Strategy name
    fn name(&self) -> &str;
}

/// Frame interval bookkeeping shared by both strategies
#[derive(Debug, Clone)]
struct FrameTiming {
    last_timestamp: Option<Duration>,
    nominal_dt: f64,
    max_dt: f64,
}

impl FrameTiming {
    fn new(config: &InterpolatorConfig) -> Self {
        let nominal_dt = 1.0 / config.nominal_fps;
        Self {
            last_timestamp: None,
            nominal_dt,
            max_dt: config.max_frame_gap().as_secs_f64().max(nominal_dt),
        }
    }

    /// Seconds since the previous sample, or `None` for a repeated or
    /// out-of-order timestamp
    fn interval(&mut self, timestamp: Duration) -> Option<f64> {
        let dt = match self.last_timestamp {
            Some(previous) if timestamp <= previous => return None,
            Some(previous) => (timestamp - previous).as_secs_f64().min(self.max_dt),
            None => self.nominal_dt,
        };
        self.last_timestamp = Some(timestamp);
        Some(dt)
    }

    fn reset(&mut self) {
        self.last_timestamp = None;
    }
}

/// Shrink each component toward zero by `dead_zone`, zeroing those inside it
fn apply_dead_zone(error: Vector2<f64>, dead_zone: f64) -> Vector2<f64> {
    error.map(|e| e.signum() * (e.abs() - dead_zone).max(0.0))
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        0.0
    }
}

/// Convert a screen-space velocity (y up) into a displacement (y down)
fn to_delta(velocity: Vector2<f64>, dt: f64) -> CursorDelta {
    CursorDelta::new(velocity.x * dt, -velocity.y * dt)
}

/// PID-style control loop driving the production cursor
#[derive(Debug, Clone)]
pub struct PidInterpolator {
    kp: f64,
    ki: f64,
    kd: f64,
    integral_limit: f64,
    integral_leak: f64,
    dead_zone: f64,
    base_speed: f64,
    timing: FrameTiming,
    integral: Vector2<f64>,
    last_error: Option<Vector2<f64>>,
    derivative: LowPassFilter,
}

impl PidInterpolator {
    /// Create a controller; out-of-range parameters are replaced as in
    /// [`InterpolatorConfig::sanitized`]
    #[must_use]
    pub fn new(config: &InterpolatorConfig) -> Self {
        let config = &config.sanitized();
        Self {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            integral_limit: config.integral_limit,
            integral_leak: config.integral_leak,
            dead_zone: config.dead_zone,
            base_speed: config.base_speed,
            timing: FrameTiming::new(config),
            integral: Vector2::zeros(),
            last_error: None,
            derivative: LowPassFilter::new(config.derivative_smoothing),
        }
    }

    /// Current integral term, for diagnostics
    #[must_use]
    pub const fn integral(&self) -> Vector2<f64> {
        self.integral
    }
}

impl Default for PidInterpolator {
    fn default() -> Self {
        Self::new(&InterpolatorConfig::default())
    }
}

impl TrackingInterpolator for PidInterpolator {
    fn update(&mut self, pose: Option<&PoseSample>, correction: &CorrectionOffset, scale: f64) -> Option<CursorDelta> {
        let pose = pose?;
        let Some(dt) = self.timing.interval(pose.timestamp) else {
            return Some(CursorDelta::ZERO);
        };

        let error = apply_dead_zone(correction.apply(pose.angular_deltas()), self.dead_zone);

        // Leaky, bounded integral: zero error always drains it
        let leak = self.integral_leak.mul_add(-dt, 1.0).clamp(0.0, 1.0);
        let limit = self.integral_limit;
        self.integral = (self.integral * leak + error * dt).map(|v| v.clamp(-limit, limit));

        let raw_derivative = self
            .last_error
            .map_or_else(Vector2::zeros, |last| (error - last) / dt);
        let derivative = self.derivative.apply(raw_derivative);
        self.last_error = Some(error);

        let control = error * self.kp + self.integral * self.ki + derivative * self.kd;
        let velocity = control * (sanitize_scale(scale) * self.base_speed);
        trace!(
            "pid: error=({:.4}, {:.4}) integral=({:.4}, {:.4}) dt={:.4}",
            error.x,
            error.y,
            self.integral.x,
            self.integral.y,
            dt
        );

        Some(to_delta(velocity, dt))
    }

    fn reset(&mut self) {
        self.timing.reset();
        self.integral = Vector2::zeros();
        self.last_error = None;
        self.derivative.reset();
    }

    fn name(&self) -> &str {
        "PidInterpolator"
    }
}

/// Unsmoothed strategy for visualizing the raw signal
#[derive(Debug, Clone)]
pub struct PassThroughInterpolator {
    base_speed: f64,
    timing: FrameTiming,
}

impl PassThroughInterpolator {
    /// Create a pass-through strategy
    #[must_use]
    pub fn new(config: &InterpolatorConfig) -> Self {
        let config = &config.sanitized();
        Self {
            base_speed: config.base_speed,
            timing: FrameTiming::new(config),
        }
    }
}

impl Default for PassThroughInterpolator {
    fn default() -> Self {
        Self::new(&InterpolatorConfig::default())
    }
}

impl TrackingInterpolator for PassThroughInterpolator {
    fn update(&mut self, pose: Option<&PoseSample>, correction: &CorrectionOffset, scale: f64) -> Option<CursorDelta> {
        let pose = pose?;
        let Some(dt) = self.timing.interval(pose.timestamp) else {
            return Some(CursorDelta::ZERO);
        };
        let error = correction.apply(pose.angular_deltas());
        Some(to_delta(error * (sanitize_scale(scale) * self.base_speed), dt))
    }

    fn reset(&mut self) {
        self.timing.reset();
    }

    fn name(&self) -> &str {
        "PassThroughInterpolator"
    }
}

/// Create an interpolator by strategy name
pub fn create_interpolator(name: &str, config: &InterpolatorConfig) -> Result<Box<dyn TrackingInterpolator>> {
    match name.to_lowercase().as_str() {
        "pid" => Ok(Box::new(PidInterpolator::new(config))),
        "passthrough" | "pass_through" | "none" => Ok(Box::new(PassThroughInterpolator::new(config))),
        _ => Err(Error::InvalidInput(format!("Unknown interpolator type: {name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn sample_at(ms: u64, forward: Vector3<f64>) -> PoseSample {
        PoseSample {
            position: Vector3::new(0.0, 0.0, -0.4),
            forward: forward.normalize(),
            tracking_confidence: 1.0,
            timestamp: Duration::from_millis(ms),
        }
    }

    fn centered(ms: u64) -> PoseSample {
        sample_at(ms, Vector3::z())
    }

    fn turned_right(ms: u64) -> PoseSample {
        sample_at(ms, Vector3::new(0.4, 0.0, 1.0))
    }

    #[test]
    fn test_zero_error_gives_zero_delta() {
        let mut pid = PidInterpolator::default();
        let correction = CorrectionOffset::default();
        for i in 0..100 {
            let delta = pid.update(Some(&centered(i * 16)), &correction, 6.0).unwrap();
            assert_eq!(delta, CursorDelta::ZERO);
        }
    }

    #[test]
    fn test_zero_error_converges_after_motion() {
        let mut pid = PidInterpolator::default();
        let correction = CorrectionOffset::default();
        let mut t = 0;
        for _ in 0..120 {
            t += 16;
            pid.update(Some(&turned_right(t)), &correction, 6.0);
        }

        let mut last = f64::INFINITY;
        for _ in 0..600 {
            t += 16;
            last = pid.update(Some(&centered(t)), &correction, 6.0).unwrap().magnitude();
        }
        assert!(last < 1e-3, "delta did not settle: {last}");
        assert!(pid.integral().norm() < 1e-4);
    }

    #[test]
    fn test_turning_right_moves_cursor_right() {
        let mut pid = PidInterpolator::default();
        let correction = CorrectionOffset::default();
        let delta = pid.update(Some(&turned_right(0)), &correction, 4.0).unwrap();
        assert!(delta.dx > 0.0);
        assert!(delta.dy.abs() < 1e-12);

        // Looking up moves the cursor toward the top of the screen
        let up = sample_at(16, Vector3::new(0.0, 0.4, 1.0));
        let delta = pid.update(Some(&up), &correction, 4.0).unwrap();
        assert!(delta.dy < 0.0);
    }

    #[test]
    fn test_integral_is_bounded() {
        let config = InterpolatorConfig::default();
        let mut pid = PidInterpolator::new(&config);
        let correction = CorrectionOffset::default();
        for i in 0..10_000 {
            pid.update(Some(&turned_right(i * 16)), &correction, 6.0);
        }
        assert!(pid.integral().x <= config.integral_limit + 1e-12);
    }

    #[test]
    fn test_missing_pose_holds_state() {
        let mut pid = PidInterpolator::default();
        let correction = CorrectionOffset::default();
        pid.update(Some(&turned_right(0)), &correction, 6.0);
        pid.update(Some(&turned_right(16)), &correction, 6.0);
        let integral = pid.integral();

        assert!(pid.update(None, &correction, 6.0).is_none());
        assert_eq!(pid.integral(), integral);
    }

    #[test]
    fn test_gap_is_capped() {
        let config = InterpolatorConfig::default();
        let correction = CorrectionOffset::default();

        let mut short = PidInterpolator::new(&config);
        short.update(Some(&turned_right(0)), &correction, 6.0);
        let capped = short
            .update(Some(&turned_right(config.max_frame_gap_ms)), &correction, 6.0)
            .unwrap();

        let mut long = PidInterpolator::new(&config);
        long.update(Some(&turned_right(0)), &correction, 6.0);
        let after_gap = long.update(Some(&turned_right(5_000)), &correction, 6.0).unwrap();

        assert!((capped.dx - after_gap.dx).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_timestamp_is_ignored() {
        let mut pid = PidInterpolator::default();
        let correction = CorrectionOffset::default();
        pid.update(Some(&turned_right(100)), &correction, 6.0);
        let integral = pid.integral();
        assert_eq!(pid.update(Some(&turned_right(100)), &correction, 6.0), Some(CursorDelta::ZERO));
        assert_eq!(pid.update(Some(&turned_right(50)), &correction, 6.0), Some(CursorDelta::ZERO));
        assert_eq!(pid.integral(), integral);
    }

    #[test]
    fn test_dead_zone() {
        let filtered = apply_dead_zone(Vector2::new(0.01, -0.5), 0.02);
        assert_eq!(filtered.x, 0.0);
        assert!((filtered.y + 0.48).abs() < 1e-12);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut pid = PidInterpolator::default();
        let correction = CorrectionOffset::default();
        for i in 0..10 {
            pid.update(Some(&turned_right(i * 16)), &correction, 6.0);
        }
        pid.reset();
        assert_eq!(pid.integral(), Vector2::zeros());
        assert_eq!(pid.update(Some(&centered(0)), &correction, 6.0), Some(CursorDelta::ZERO));
    }

    #[test]
    fn test_pass_through_scales_linearly() {
        let correction = CorrectionOffset::default();
        let mut slow = PassThroughInterpolator::default();
        let mut fast = PassThroughInterpolator::default();
        let a = slow.update(Some(&turned_right(0)), &correction, 2.0).unwrap();
        let b = fast.update(Some(&turned_right(0)), &correction, 4.0).unwrap();
        assert!((b.dx - 2.0 * a.dx).abs() < 1e-9);
        assert_eq!(slow.name(), "PassThroughInterpolator");
        assert!(slow.update(None, &correction, 2.0).is_none());
    }

    #[test]
    fn test_create_interpolator() {
        let config = InterpolatorConfig::default();
        assert_eq!(create_interpolator("pid", &config).unwrap().name(), "PidInterpolator");
        assert_eq!(
            create_interpolator("PassThrough", &config).unwrap().name(),
            "PassThroughInterpolator"
        );
        assert!(create_interpolator("kalman", &config).is_err());
    }

    #[test]
    fn test_out_of_range_config_is_repaired() {
        let config = InterpolatorConfig {
            derivative_smoothing: 0.0,
            nominal_fps: 1.0e-30,
            ..InterpolatorConfig::default()
        };
        let correction = CorrectionOffset::default();
        for name in ["pid", "passthrough"] {
            let mut interpolator = create_interpolator(name, &config).unwrap();
            interpolator.update(Some(&centered(0)), &correction, 4.5);
            let delta = interpolator.update(Some(&turned_right(16)), &correction, 4.5).unwrap();
            assert!(delta.dx.is_finite() && delta.dy.is_finite(), "{} gave {:?}", name, delta);
        }
    }
}
