//! Calibration offset and distance-adaptive sensitivity.
//!
//! Both values are set from outside the frame loop (user preference,
//! calibration) and read on every tick through [`SharedSettings`].

use crate::{
    constants::{
        DEFAULT_SENSITIVITY_LOWER, DEFAULT_SENSITIVITY_UPPER, DISTANCE_BAND_MAX, DISTANCE_BAND_MIN,
        HIGH_SENSITIVITY_LOWER, HIGH_SENSITIVITY_UPPER, LOW_SENSITIVITY_LOWER, LOW_SENSITIVITY_UPPER,
        MAX_SENSITIVITY,
    },
    pose::PoseSample,
};
use log::{info, warn};
use nalgebra::Vector2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Named sensitivity levels offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityPreset {
    /// Slow cursor
    Low,
    /// Default cursor speed
    #[default]
    Medium,
    /// Fast cursor
    High,
}

impl SensitivityPreset {
    /// Parse a preset name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "default" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Scale range for this preset
    #[must_use]
    pub const fn range(self) -> SensitivityRange {
        match self {
            Self::Low => SensitivityRange {
                lower: LOW_SENSITIVITY_LOWER,
                upper: LOW_SENSITIVITY_UPPER,
            },
            Self::Medium => SensitivityRange {
                lower: DEFAULT_SENSITIVITY_LOWER,
                upper: DEFAULT_SENSITIVITY_UPPER,
            },
            Self::High => SensitivityRange {
                lower: HIGH_SENSITIVITY_LOWER,
                upper: HIGH_SENSITIVITY_UPPER,
            },
        }
    }
}

/// Bounds on the sensitivity scale factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRange {
    /// Scale used when the face is at or beyond the far edge of the band
    pub lower: f64,
    /// Scale used when the face is at or inside the near edge of the band
    pub upper: f64,
}

impl Default for SensitivityRange {
    fn default() -> Self {
        SensitivityPreset::Medium.range()
    }
}

impl SensitivityRange {
    /// Create a range, falling back to the default when the bounds are
    /// inverted, non-finite, non-positive or absurdly large
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        let candidate = Self { lower, upper };
        if candidate.is_valid() {
            candidate
        } else {
            warn!(
                "Sensitivity range [{}, {}] is out of range, using default [{}, {}]",
                lower, upper, DEFAULT_SENSITIVITY_LOWER, DEFAULT_SENSITIVITY_UPPER
            );
            Self::default()
        }
    }

    /// Range of a named preset
    #[must_use]
    pub const fn preset(preset: SensitivityPreset) -> Self {
        preset.range()
    }

    /// Whether the bounds are usable as-is
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lower.is_finite()
            && self.upper.is_finite()
            && self.lower > 0.0
            && self.lower <= self.upper
            && self.upper <= MAX_SENSITIVITY
    }

    /// Scale factor for a head-to-sensor distance; see [`scale_for`]
    #[must_use]
    pub fn scale_for(&self, distance: f64) -> f64 {
        scale_for(distance, self)
    }
}

/// Map a head-to-sensor distance onto the sensitivity range.
///
/// The distance is normalized against the reference band, clamped to
/// [0, 1] and inverted so closer faces move the cursor faster. Distances at
/// or below the near edge give `range.upper`, at or beyond the far edge give
/// `range.lower`. A non-finite distance is treated as the far edge.
#[must_use]
pub fn scale_for(distance: f64, range: &SensitivityRange) -> f64 {
    let normalized = if distance.is_nan() {
        1.0
    } else {
        ((distance - DISTANCE_BAND_MIN) / (DISTANCE_BAND_MAX - DISTANCE_BAND_MIN)).clamp(0.0, 1.0)
    };
    let closeness = 1.0 - normalized;
    closeness.mul_add(range.upper - range.lower, range.lower)
}

/// Calibrated angular bias subtracted from the raw angular deltas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrectionOffset {
    /// Horizontal bias in normalized angle units
    pub angle_x: f64,
    /// Vertical bias in normalized angle units
    pub angle_y: f64,
}

impl CorrectionOffset {
    /// Create a new offset; non-finite components become zero
    #[must_use]
    pub fn new(angle_x: f64, angle_y: f64) -> Self {
        let finite_or_zero = |v: f64| if v.is_finite() { v.clamp(-2.0, 2.0) } else { 0.0 };
        Self {
            angle_x: finite_or_zero(angle_x),
            angle_y: finite_or_zero(angle_y),
        }
    }

    /// Subtract the offset from raw angular deltas
    #[must_use]
    pub fn apply(&self, raw: Vector2<f64>) -> Vector2<f64> {
        Vector2::new(raw.x - self.angle_x, raw.y - self.angle_y)
    }

    /// Offset that cancels the given pose's current angular deltas
    #[must_use]
    pub fn centered_on(sample: &PoseSample) -> Self {
        let raw = sample.angular_deltas();
        Self::new(raw.x, raw.y)
    }
}

/// Snapshot of the runtime-tunable settings read on each tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Settings {
    /// Calibration bias
    pub correction: CorrectionOffset,
    /// Sensitivity bounds
    pub sensitivity: SensitivityRange,
}

/// Settings shared between the frame loop and preference writers.
///
/// Writers take a short write lock. The frame loop never waits for it:
/// [`SharedSettings::snapshot`] falls back to the last value it read when a
/// writer currently holds the lock.
#[derive(Debug, Clone)]
pub struct SharedSettings {
    inner: Arc<RwLock<Settings>>,
    last_seen: Settings,
}

impl SharedSettings {
    /// Create a shared handle holding `settings`
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
            last_seen: settings,
        }
    }

    /// Current settings without blocking
    pub fn snapshot(&mut self) -> Settings {
        if let Some(guard) = self.inner.try_read() {
            self.last_seen = *guard;
        }
        self.last_seen
    }

    /// Replace the sensitivity range
    pub fn set_sensitivity(&self, range: SensitivityRange) {
        let range = SensitivityRange::new(range.lower, range.upper);
        info!("Sensitivity range set to [{}, {}]", range.lower, range.upper);
        self.inner.write().sensitivity = range;
    }

    /// Replace the calibration offset
    pub fn set_correction(&self, correction: CorrectionOffset) {
        let correction = CorrectionOffset::new(correction.angle_x, correction.angle_y);
        self.inner.write().correction = correction;
    }

    /// Calibrate so that the given pose becomes the neutral gaze
    pub fn calibrate(&self, sample: &PoseSample) -> CorrectionOffset {
        let correction = CorrectionOffset::centered_on(sample);
        info!(
            "Calibrated neutral gaze: offset ({:.3}, {:.3})",
            correction.angle_x, correction.angle_y
        );
        self.inner.write().correction = correction;
        correction
    }

    /// Clear the calibration offset
    pub fn reset_calibration(&self) {
        self.inner.write().correction = CorrectionOffset::default();
    }

    /// Current settings, waiting for any writer; for use off the frame path
    #[must_use]
    pub fn current(&self) -> Settings {
        *self.inner.read()
    }
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::time::Duration;

    #[test]
    fn test_scale_clamps_outside_band() {
        let range = SensitivityRange::new(3.0, 6.0);
        for d in [0.0, 0.1, 0.29, 0.3] {
            assert_eq!(scale_for(d, &range), 6.0, "distance {d}");
        }
        for d in [0.6, 0.61, 1.0, 5.0, f64::INFINITY] {
            assert_eq!(scale_for(d, &range), 3.0, "distance {d}");
        }
    }

    #[test]
    fn test_scale_is_monotonic_inside_band() {
        let range = SensitivityRange::new(3.0, 6.0);
        let mut last = f64::INFINITY;
        for i in 0..=300 {
            let d = 0.3 + f64::from(i) * 0.001;
            let scale = range.scale_for(d);
            assert!(scale <= last);
            assert!((3.0..=6.0).contains(&scale));
            last = scale;
        }
        assert!((range.scale_for(0.45) - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_range_falls_back_to_default() {
        assert_eq!(SensitivityRange::new(6.0, 3.0), SensitivityRange::default());
        assert_eq!(SensitivityRange::new(f64::NAN, 3.0), SensitivityRange::default());
        assert_eq!(SensitivityRange::new(-1.0, 3.0), SensitivityRange::default());
        assert_eq!(SensitivityRange::new(2.0, 2.0), SensitivityRange { lower: 2.0, upper: 2.0 });
    }

    #[test]
    fn test_presets() {
        assert_eq!(SensitivityPreset::from_name("HIGH"), Some(SensitivityPreset::High));
        assert_eq!(SensitivityPreset::from_name("bogus"), None);
        assert_eq!(SensitivityRange::default(), SensitivityRange::new(3.0, 6.0));
        assert!(SensitivityPreset::Low.range().upper <= SensitivityPreset::High.range().lower);
    }

    #[test]
    fn test_correction_apply() {
        let offset = CorrectionOffset::new(0.1, -0.2);
        let corrected = offset.apply(Vector2::new(0.3, 0.3));
        assert!((corrected.x - 0.2).abs() < 1e-12);
        assert!((corrected.y - 0.5).abs() < 1e-12);

        assert_eq!(CorrectionOffset::new(f64::NAN, 0.5), CorrectionOffset::new(0.0, 0.5));
    }

    #[test]
    fn test_calibrate_centers_pose() {
        let sample = PoseSample {
            position: Vector3::new(0.0, 0.0, -0.4),
            forward: Vector3::new(0.2, -0.1, 1.0).normalize(),
            tracking_confidence: 1.0,
            timestamp: Duration::ZERO,
        };
        let shared = SharedSettings::default();
        shared.calibrate(&sample);

        let corrected = shared.current().correction.apply(sample.angular_deltas());
        assert!(corrected.norm() < 1e-12);

        shared.reset_calibration();
        assert_eq!(shared.current().correction, CorrectionOffset::default());
    }

    #[test]
    fn test_snapshot_does_not_wait_for_writer() {
        let mut shared = SharedSettings::default();
        let writer = shared.clone();
        writer.set_sensitivity(SensitivityRange::new(1.0, 2.0));
        assert_eq!(shared.snapshot().sensitivity, SensitivityRange::new(1.0, 2.0));

        let guard = writer.inner.write();
        // Falls back to the last value seen while the writer holds the lock
        assert_eq!(shared.snapshot().sensitivity, SensitivityRange::new(1.0, 2.0));
        drop(guard);
    }
}
