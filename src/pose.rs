//! Pose extraction from raw sensor frames.
//!
//! The sensor reports the head position and facing direction in its own
//! coordinate frame (x toward screen right, y toward screen up, the user at
//! negative z facing +z). The extractor turns each frame into a
//! [`PoseSample`] and remembers only whether a face anchor was present on the
//! previous frame.

use crate::{
    constants::{EPSILON, RIGHT_ANGLE_DEG},
    error::{Error, Result},
};
use log::{debug, info, warn};
use nalgebra::{Vector2, Vector3};
use std::time::Duration;

/// Face anchor as delivered by the face-tracking sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceAnchor {
    /// Head position in sensor space, in meters
    pub position: Vector3<f64>,
    /// Direction the face is pointing
    pub forward: Vector3<f64>,
    /// Tracking confidence in [0, 1]
    pub confidence: f32,
}

impl FaceAnchor {
    /// Anchor with full tracking confidence
    #[must_use]
    pub const fn tracked(position: Vector3<f64>, forward: Vector3<f64>) -> Self {
        Self {
            position,
            forward,
            confidence: 1.0,
        }
    }

    /// Replace the tracking confidence
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

/// One raw frame from the sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFrame {
    /// Sensor timestamp since session start
    pub timestamp: Duration,
    /// Detected face, if any
    pub anchor: Option<FaceAnchor>,
}

impl SensorFrame {
    /// Frame with a detected face
    #[must_use]
    pub const fn with_face(timestamp: Duration, anchor: FaceAnchor) -> Self {
        Self {
            timestamp,
            anchor: Some(anchor),
        }
    }

    /// Frame in which no face was found
    #[must_use]
    pub const fn empty(timestamp: Duration) -> Self {
        Self { timestamp, anchor: None }
    }
}

/// Normalized head pose for a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    /// Head position in sensor space, in meters
    pub position: Vector3<f64>,
    /// Unit vector of the facing direction
    pub forward: Vector3<f64>,
    /// Tracking confidence in [0, 1]
    pub tracking_confidence: f32,
    /// Sensor timestamp since session start
    pub timestamp: Duration,
}

impl PoseSample {
    /// Normalized angles of the facing direction against the screen axes
    #[must_use]
    pub fn facing_angles(&self) -> Vector2<f64> {
        axis_angles(&self.forward)
    }

    /// Correction inputs derived from where the head sits relative to the
    /// sensor: normalized angles of the head-to-sensor vector.
    #[must_use]
    pub fn offset_angles(&self) -> Vector2<f64> {
        axis_angles(&(-self.position))
    }

    /// Gaze direction relative to the sensor's line of sight.
    ///
    /// Zero when the user looks straight at the sensor, wherever the head is.
    #[must_use]
    pub fn angular_deltas(&self) -> Vector2<f64> {
        self.facing_angles() - self.offset_angles()
    }

    /// Euclidean head-to-sensor distance in meters
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.position.norm()
    }

    /// Whether the sensor's confidence reaches `threshold`
    #[must_use]
    pub fn is_confident(&self, threshold: f32) -> bool {
        self.tracking_confidence >= threshold
    }
}

/// Normalized angle between `v` and `axis`: `(90° - angle) / 90°`.
///
/// Yields 1 when `v` points along `axis`, 0 when perpendicular and -1 when
/// opposite. Zero-length input maps to 0.
#[must_use]
pub fn normalized_axis_angle(v: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    if v.norm() < EPSILON || axis.norm() < EPSILON {
        return 0.0;
    }
    let angle = v.angle(axis).to_degrees();
    ((RIGHT_ANGLE_DEG - angle) / RIGHT_ANGLE_DEG).clamp(-1.0, 1.0)
}

fn axis_angles(v: &Vector3<f64>) -> Vector2<f64> {
    Vector2::new(
        normalized_axis_angle(v, &Vector3::x()),
        normalized_axis_angle(v, &Vector3::y()),
    )
}

/// Change in face-anchor presence between two frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorTransition {
    /// A face appeared after one or more frames without it
    Appeared,
    /// The face disappeared
    Disappeared,
}

/// Result of extracting one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extraction {
    /// The pose, when the frame held a usable face anchor
    pub sample: Option<PoseSample>,
    /// Presence change relative to the previous frame
    pub transition: Option<AnchorTransition>,
}

/// Converts sensor frames into pose samples
#[derive(Debug, Default)]
pub struct PoseExtractor {
    anchor_present: bool,
    failure: Option<String>,
}

impl PoseExtractor {
    /// Create a new extractor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the pose from a frame.
    ///
    /// Anchors with zero-length or non-finite vectors are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `SessionFailed` once [`PoseExtractor::fail`] has been called
    /// and until [`PoseExtractor::reset`].
    pub fn extract(&mut self, frame: &SensorFrame) -> Result<Extraction> {
        if let Some(reason) = &self.failure {
            return Err(Error::SessionFailed(reason.clone()));
        }

        let sample = frame.anchor.as_ref().and_then(|anchor| Self::to_sample(anchor, frame.timestamp));

        let present = sample.is_some();
        let transition = match (self.anchor_present, present) {
            (false, true) => Some(AnchorTransition::Appeared),
            (true, false) => Some(AnchorTransition::Disappeared),
            _ => None,
        };
        if let Some(transition) = transition {
            debug!("Face anchor {:?} at {:?}", transition, frame.timestamp);
        }
        self.anchor_present = present;

        Ok(Extraction { sample, transition })
    }

    fn to_sample(anchor: &FaceAnchor, timestamp: Duration) -> Option<PoseSample> {
        let finite = anchor.position.iter().chain(anchor.forward.iter()).all(|v| v.is_finite());
        if !finite || anchor.position.norm() < EPSILON {
            debug!("Discarding degenerate face anchor at {:?}", timestamp);
            return None;
        }
        let forward = anchor.forward.try_normalize(EPSILON)?;

        let tracking_confidence = if anchor.confidence.is_nan() {
            0.0
        } else {
            anchor.confidence.clamp(0.0, 1.0)
        };

        Some(PoseSample {
            position: anchor.position,
            forward,
            tracking_confidence,
            timestamp,
        })
    }

    /// Stop extraction after a fatal sensor error and build the error to
    /// hand to the caller
    pub fn fail(&mut self, reason: impl Into<String>) -> Error {
        let reason = reason.into();
        warn!("Sensor session failed: {}", reason);
        self.failure = Some(reason.clone());
        self.anchor_present = false;
        Error::SessionFailed(reason)
    }

    /// Whether a face anchor was present on the last frame
    #[must_use]
    pub const fn anchor_present(&self) -> bool {
        self.anchor_present
    }

    /// Clear presence and failure state for a new sensor session
    pub fn reset(&mut self) {
        if self.failure.is_some() {
            info!("Pose extractor re-armed for a new session");
        }
        self.anchor_present = false;
        self.failure = None;
    }
}
