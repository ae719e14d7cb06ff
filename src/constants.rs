//! Constants used throughout the pipeline

/// Nearest head-to-sensor distance of the reference band, in meters
pub const DISTANCE_BAND_MIN: f64 = 0.3;

/// Farthest head-to-sensor distance of the reference band, in meters
pub const DISTANCE_BAND_MAX: f64 = 0.6;

/// Angle used to normalize axis angles into [-1, 1]
pub const RIGHT_ANGLE_DEG: f64 = 90.0;

/// Default sensitivity scale bounds (medium preset)
pub const DEFAULT_SENSITIVITY_LOWER: f64 = 3.0;
pub const DEFAULT_SENSITIVITY_UPPER: f64 = 6.0;

/// Low preset scale bounds
pub const LOW_SENSITIVITY_LOWER: f64 = 1.5;
pub const LOW_SENSITIVITY_UPPER: f64 = 3.0;

/// High preset scale bounds
pub const HIGH_SENSITIVITY_LOWER: f64 = 6.0;
pub const HIGH_SENSITIVITY_UPPER: f64 = 9.0;

/// Largest scale factor accepted from configuration
pub const MAX_SENSITIVITY: f64 = 50.0;

/// Default dwell duration before a target activates
pub const DEFAULT_DWELL_THRESHOLD_MS: u64 = 1000;

/// Default grace window before a dropout is published as lost
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 250;

/// Default minimum confidence for a frame to count as tracked
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Default sensor rate assumption for the first frame after a reset
pub const DEFAULT_FPS: f64 = 60.0;

/// Accepted range of the nominal sensor rate
pub const MIN_FPS: f64 = 1.0;
pub const MAX_FPS: f64 = 1000.0;

/// Largest frame interval fed to the control loop
pub const DEFAULT_MAX_FRAME_GAP_MS: u64 = 100;

/// Default PID gains
pub const DEFAULT_KP: f64 = 1.0;
pub const DEFAULT_KI: f64 = 0.2;
pub const DEFAULT_KD: f64 = 0.05;

/// Anti-windup bound on each integral component
pub const DEFAULT_INTEGRAL_LIMIT: f64 = 0.5;

/// Fraction of the integral term drained per second
pub const DEFAULT_INTEGRAL_LEAK: f64 = 2.0;

/// Low-pass coefficient applied to the derivative term
pub const DEFAULT_DERIVATIVE_SMOOTHING: f64 = 0.3;

/// Error magnitude treated as "looking at the center"
pub const DEFAULT_DEAD_ZONE: f64 = 0.02;

/// Screen points per second for a unit error at scale 1.0
pub const DEFAULT_BASE_SPEED: f64 = 300.0;

/// Default screen size
pub const DEFAULT_SCREEN_WIDTH: f64 = 1024.0;
pub const DEFAULT_SCREEN_HEIGHT: f64 = 768.0;

/// Queue depth for each observation subscriber
pub const DEFAULT_OBSERVATION_CAPACITY: usize = 256;

/// Largest queue depth accepted for an observation subscriber; bounded
/// channels allocate their slots up front
pub const MAX_OBSERVATION_CAPACITY: usize = 65_536;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
