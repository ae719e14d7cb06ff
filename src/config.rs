//! Configuration management for the gaze pipeline

use crate::{
    constants::{
        DEFAULT_BASE_SPEED, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DEAD_ZONE, DEFAULT_DERIVATIVE_SMOOTHING,
        DEFAULT_DWELL_THRESHOLD_MS, DEFAULT_FPS, DEFAULT_GRACE_PERIOD_MS, DEFAULT_INTEGRAL_LEAK,
        DEFAULT_INTEGRAL_LIMIT, DEFAULT_KD, DEFAULT_KI, DEFAULT_KP, DEFAULT_MAX_FRAME_GAP_MS,
        DEFAULT_OBSERVATION_CAPACITY, DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH, MAX_FPS,
        MAX_OBSERVATION_CAPACITY, MIN_FPS,
    },
    correction::{CorrectionOffset, SensitivityPreset, SensitivityRange, Settings},
    geometry::ScreenSize,
    Error, Result,
};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{ops::RangeInclusive, path::Path, time::Duration};

/// Pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Surface the cursor moves on
    pub screen: ScreenConfig,

    /// Dwell selection
    pub dwell: DwellConfig,

    /// Tracking availability debounce
    pub tracking: TrackingConfig,

    /// Sensitivity scale range
    pub sensitivity: SensitivityConfig,

    /// Initial calibration offset
    pub calibration: CalibrationConfig,

    /// Control loop tuning
    pub interpolator: InterpolatorConfig,

    /// Event fan-out
    pub dispatch: DispatchConfig,
}

/// Surface size in screen points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Surface width
    pub width: f64,

    /// Surface height
    pub height: f64,
}

/// Dwell selection parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellConfig {
    /// Hover time required for activation, in milliseconds
    pub threshold_ms: u64,

    /// Start a fresh dwell immediately after an activation while the cursor
    /// stays on the target
    pub repeat_after_activation: bool,
}

/// Tracking availability parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Continuous dropout time before `Lost` is published, in milliseconds
    pub grace_period_ms: u64,

    /// Minimum confidence for a frame to count as tracked (0.0-1.0)
    pub confidence_threshold: f32,
}

/// Sensitivity configuration: a named preset, optionally overridden by
/// explicit bounds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Named preset
    pub preset: SensitivityPreset,

    /// Explicit lower bound; used only together with `upper`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,

    /// Explicit upper bound; used only together with `lower`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

/// Calibration offset applied at startup
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Horizontal bias
    pub angle_x: f64,

    /// Vertical bias
    pub angle_y: f64,
}

/// Control loop tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolatorConfig {
    /// Proportional gain
    pub kp: f64,

    /// Integral gain
    pub ki: f64,

    /// Derivative gain
    pub kd: f64,

    /// Bound on each integral component
    pub integral_limit: f64,

    /// Integral decay rate per second
    pub integral_leak: f64,

    /// Low-pass coefficient of the derivative term, in (0, 1]
    pub derivative_smoothing: f64,

    /// Error below which the head counts as centered
    pub dead_zone: f64,

    /// Screen points per second for a unit error at scale 1.0
    pub base_speed: f64,

    /// Largest frame interval integrated in one step, in milliseconds
    pub max_frame_gap_ms: u64,

    /// Assumed sensor rate for the first frame after a reset
    pub nominal_fps: f64,
}

/// Event dispatcher parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Queue depth of each observation subscriber
    pub observation_capacity: usize,

    /// Run the pass-through diagnostics track
    pub diagnostics: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_SCREEN_WIDTH,
            height: DEFAULT_SCREEN_HEIGHT,
        }
    }
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            threshold_ms: DEFAULT_DWELL_THRESHOLD_MS,
            repeat_after_activation: false,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            kp: DEFAULT_KP,
            ki: DEFAULT_KI,
            kd: DEFAULT_KD,
            integral_limit: DEFAULT_INTEGRAL_LIMIT,
            integral_leak: DEFAULT_INTEGRAL_LEAK,
            derivative_smoothing: DEFAULT_DERIVATIVE_SMOOTHING,
            dead_zone: DEFAULT_DEAD_ZONE,
            base_speed: DEFAULT_BASE_SPEED,
            max_frame_gap_ms: DEFAULT_MAX_FRAME_GAP_MS,
            nominal_fps: DEFAULT_FPS,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            observation_capacity: DEFAULT_OBSERVATION_CAPACITY,
            diagnostics: false,
        }
    }
}

impl ScreenConfig {
    /// Surface size
    #[must_use]
    pub const fn size(&self) -> ScreenSize {
        ScreenSize::new(self.width, self.height)
    }
}

impl DwellConfig {
    /// Dwell threshold
    #[must_use]
    pub const fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }
}

impl TrackingConfig {
    /// Grace window before a dropout is published as lost
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl SensitivityConfig {
    /// Effective sensitivity range
    #[must_use]
    pub fn range(&self) -> SensitivityRange {
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => SensitivityRange::new(lower, upper),
            (None, None) => self.preset.range(),
            _ => {
                warn!("Sensitivity needs both lower and upper bounds, using the {:?} preset", self.preset);
                self.preset.range()
            }
        }
    }
}

impl CalibrationConfig {
    /// Calibration as a correction offset
    #[must_use]
    pub fn offset(&self) -> CorrectionOffset {
        CorrectionOffset::new(self.angle_x, self.angle_y)
    }
}

fn finite_at_least(name: &str, value: f64, min: f64, default: f64) -> f64 {
    if value.is_finite() && value >= min {
        value
    } else {
        warn!("{} = {} is out of range, using {}", name, value, default);
        default
    }
}

fn positive(name: &str, value: f64, default: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!("{} = {} must be positive, using {}", name, value, default);
        default
    }
}

fn within(name: &str, value: f64, range: RangeInclusive<f64>, default: f64) -> f64 {
    if range.contains(&value) {
        value
    } else {
        warn!(
            "{} = {} must be in [{}, {}], using {}",
            name,
            value,
            range.start(),
            range.end(),
            default
        );
        default
    }
}

impl InterpolatorConfig {
    /// Largest frame interval integrated in one step
    #[must_use]
    pub const fn max_frame_gap(&self) -> Duration {
        Duration::from_millis(self.max_frame_gap_ms)
    }

    /// Nominal frame period; the default rate's period when `nominal_fps`
    /// is out of range
    #[must_use]
    pub fn frame_period(&self) -> Duration {
        let fps = if (MIN_FPS..=MAX_FPS).contains(&self.nominal_fps) {
            self.nominal_fps
        } else {
            DEFAULT_FPS
        };
        Duration::try_from_secs_f64(1.0 / fps).unwrap_or(Duration::from_millis(16))
    }

    /// Copy with every out-of-range value replaced by its default
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let derivative_smoothing = if self.derivative_smoothing > 0.0 && self.derivative_smoothing <= 1.0 {
            self.derivative_smoothing
        } else {
            warn!(
                "interpolator.derivative_smoothing = {} must be in (0, 1], using {}",
                self.derivative_smoothing, defaults.derivative_smoothing
            );
            defaults.derivative_smoothing
        };
        let dead_zone = if (0.0..1.0).contains(&self.dead_zone) {
            self.dead_zone
        } else {
            warn!(
                "interpolator.dead_zone = {} must be in [0, 1), using {}",
                self.dead_zone, defaults.dead_zone
            );
            defaults.dead_zone
        };
        let max_frame_gap_ms = if self.max_frame_gap_ms == 0 {
            warn!(
                "interpolator.max_frame_gap_ms must be positive, using {}",
                defaults.max_frame_gap_ms
            );
            defaults.max_frame_gap_ms
        } else {
            self.max_frame_gap_ms
        };

        Self {
            kp: finite_at_least("interpolator.kp", self.kp, 0.0, defaults.kp),
            ki: finite_at_least("interpolator.ki", self.ki, 0.0, defaults.ki),
            kd: finite_at_least("interpolator.kd", self.kd, 0.0, defaults.kd),
            integral_limit: positive("interpolator.integral_limit", self.integral_limit, defaults.integral_limit),
            integral_leak: finite_at_least(
                "interpolator.integral_leak",
                self.integral_leak,
                0.0,
                defaults.integral_leak,
            ),
            derivative_smoothing,
            dead_zone,
            base_speed: positive("interpolator.base_speed", self.base_speed, defaults.base_speed),
            max_frame_gap_ms,
            nominal_fps: within(
                "interpolator.nominal_fps",
                self.nominal_fps,
                MIN_FPS..=MAX_FPS,
                defaults.nominal_fps,
            ),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file, clamping out-of-range values
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, clamping out-of-range values
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))?;
        Ok(config.sanitized())
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Initial runtime settings
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            correction: self.calibration.offset(),
            sensitivity: self.sensitivity.range(),
        }
    }

    /// Validate configuration, reporting the first problem found
    pub fn validate(&self) -> Result<()> {
        // Validate surface
        if !self.screen.size().is_valid() {
            return Err(Error::ConfigError(format!(
                "Screen size must be positive, got {}x{}",
                self.screen.width, self.screen.height
            )));
        }

        // Validate timing
        if self.dwell.threshold_ms == 0 {
            return Err(Error::ConfigError("Dwell threshold must be greater than 0".to_string()));
        }
        if !(MIN_FPS..=MAX_FPS).contains(&self.interpolator.nominal_fps) {
            return Err(Error::ConfigError(format!(
                "Nominal FPS must be between {} and {}",
                MIN_FPS, MAX_FPS
            )));
        }
        if self.tracking.grace_period() < self.interpolator.frame_period() {
            return Err(Error::ConfigError(format!(
                "Grace period must be at least one frame ({:?})",
                self.interpolator.frame_period()
            )));
        }
        if !(0.0..=1.0).contains(&self.tracking.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        // Validate sensitivity
        if let (Some(lower), Some(upper)) = (self.sensitivity.lower, self.sensitivity.upper) {
            if !(SensitivityRange { lower, upper }).is_valid() {
                return Err(Error::ConfigError(format!(
                    "Sensitivity range [{}, {}] is invalid",
                    lower, upper
                )));
            }
        } else if self.sensitivity.lower.is_some() || self.sensitivity.upper.is_some() {
            return Err(Error::ConfigError(
                "Sensitivity lower and upper must be given together".to_string(),
            ));
        }

        // Validate control loop
        if self.interpolator.sanitized() != self.interpolator {
            return Err(Error::ConfigError("Interpolator parameters out of range".to_string()));
        }

        if self.dispatch.observation_capacity == 0 || self.dispatch.observation_capacity > MAX_OBSERVATION_CAPACITY {
            return Err(Error::ConfigError(format!(
                "Observation capacity must be between 1 and {}",
                MAX_OBSERVATION_CAPACITY
            )));
        }

        Ok(())
    }

    /// Copy with every out-of-range value replaced by a safe default
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut config = *self;

        if !config.screen.size().is_valid() {
            warn!(
                "Screen size {}x{} is invalid, using default",
                config.screen.width, config.screen.height
            );
            config.screen = ScreenConfig::default();
        }

        if config.dwell.threshold_ms == 0 {
            warn!("Dwell threshold of 0ms, using {}ms", DEFAULT_DWELL_THRESHOLD_MS);
            config.dwell.threshold_ms = DEFAULT_DWELL_THRESHOLD_MS;
        }

        config.interpolator = config.interpolator.sanitized();

        let frame_ms = (config.interpolator.frame_period().as_micros() + 999) / 1000;
        let min_grace = u64::try_from(frame_ms).unwrap_or(u64::MAX).max(1);
        if config.tracking.grace_period_ms < min_grace {
            warn!(
                "Grace period of {}ms is shorter than one frame, using {}ms",
                config.tracking.grace_period_ms, min_grace
            );
            config.tracking.grace_period_ms = min_grace;
        }

        if !(0.0..=1.0).contains(&config.tracking.confidence_threshold) {
            warn!(
                "Confidence threshold {} is out of range, using {}",
                config.tracking.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD
            );
            config.tracking.confidence_threshold = DEFAULT_CONFIDENCE_THRESHOLD;
        }

        if let (Some(lower), Some(upper)) = (config.sensitivity.lower, config.sensitivity.upper) {
            let range = SensitivityRange::new(lower, upper);
            config.sensitivity.lower = Some(range.lower);
            config.sensitivity.upper = Some(range.upper);
        }

        let offset = config.calibration.offset();
        config.calibration = CalibrationConfig {
            angle_x: offset.angle_x,
            angle_y: offset.angle_y,
        };

        if config.dispatch.observation_capacity == 0 {
            warn!(
                "Observation capacity of 0, using {}",
                DEFAULT_OBSERVATION_CAPACITY
            );
            config.dispatch.observation_capacity = DEFAULT_OBSERVATION_CAPACITY;
        } else if config.dispatch.observation_capacity > MAX_OBSERVATION_CAPACITY {
            warn!(
                "Observation capacity of {} is too large, using {}",
                config.dispatch.observation_capacity, MAX_OBSERVATION_CAPACITY
            );
            config.dispatch.observation_capacity = MAX_OBSERVATION_CAPACITY;
        }

        config
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head Gaze Configuration

# Surface the cursor moves on, in screen points
screen:
  width: 1024.0
  height: 768.0

# Dwell selection
dwell:
  threshold_ms: 1000
  repeat_after_activation: false

# Tracking availability
tracking:
  grace_period_ms: 250
  confidence_threshold: 0.5

# Sensitivity (low, medium, high), optionally with explicit bounds
sensitivity:
  preset: medium
  # lower: 3.0
  # upper: 6.0

# Neutral gaze offset
calibration:
  angle_x: 0.0
  angle_y: 0.0

# Control loop
interpolator:
  kp: 1.0
  ki: 0.2
  kd: 0.05
  integral_limit: 0.5
  integral_leak: 2.0
  derivative_smoothing: 0.3
  dead_zone: 0.02
  base_speed: 300.0
  max_frame_gap_ms: 100
  nominal_fps: 60.0

# Event fan-out
dispatch:
  observation_capacity: 256
  diagnostics: false
"#;
