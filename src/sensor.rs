//! Sensor sources feeding the pipeline.
//!
//! A [`SensorSource`] hands out one [`SensorFrame`] per call, blocking until
//! the frame is due if the source is paced. Two sources ship with the crate:
//! [`ScriptedSensor`] replays a prepared queue (tests), and
//! [`SyntheticSensor`] produces noisy head sweeps with dropouts (demo and
//! benchmarks).

use crate::{
    constants::{DEFAULT_FPS, MAX_FPS, MIN_FPS},
    pose::{FaceAnchor, SensorFrame},
    Error, Result,
};
use log::{debug, info, warn};
use nalgebra::Vector3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    collections::VecDeque,
    f64::consts::TAU,
    time::{Duration, Instant},
};

/// Source of sensor frames
pub trait SensorSource: Send {
    /// Next frame.
    ///
    /// Returns `Ok(None)` once the session has ended or was stopped, and
    /// [`Error::SessionFailed`] when the session died.
    fn next_frame(&mut self) -> Result<Option<SensorFrame>>;

    /// End the session; calling it again has no effect
    fn stop(&mut self);
}

/// One entry of a sensor script
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Deliver this frame
    Frame(SensorFrame),
    /// Fail the session with this reason
    Fail(String),
}

/// Replays a prepared sequence of frames
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    steps: VecDeque<ScriptStep>,
    stopped: bool,
}

impl ScriptedSensor {
    /// Create from a list of frames
    #[must_use]
    pub fn new(frames: Vec<SensorFrame>) -> Self {
        Self {
            steps: frames.into_iter().map(ScriptStep::Frame).collect(),
            stopped: false,
        }
    }

    /// Append a frame
    pub fn push_frame(&mut self, frame: SensorFrame) {
        self.steps.push_back(ScriptStep::Frame(frame));
    }

    /// Append a session failure
    pub fn push_failure(&mut self, reason: impl Into<String>) {
        self.steps.push_back(ScriptStep::Fail(reason.into()));
    }

    /// Number of steps not yet delivered
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl SensorSource for ScriptedSensor {
    fn next_frame(&mut self) -> Result<Option<SensorFrame>> {
        if self.stopped {
            return Ok(None);
        }
        match self.steps.pop_front() {
            Some(ScriptStep::Frame(frame)) => Ok(Some(frame)),
            Some(ScriptStep::Fail(reason)) => {
                self.stopped = true;
                Err(Error::SessionFailed(reason))
            }
            None => Ok(None),
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Parameters of the synthetic head motion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticMotion {
    /// Frame rate
    pub fps: f64,
    /// Head-to-sensor distance in meters
    pub distance: f64,
    /// Peak yaw of the sweep, in radians
    pub amplitude: f64,
    /// Duration of one horizontal sweep
    pub period: Duration,
    /// Peak uniform noise added to the facing direction
    pub noise: f64,
    /// Chance per frame that a dropout begins
    pub dropout_rate: f64,
    /// Frames per dropout
    pub dropout_frames: usize,
}

impl Default for SyntheticMotion {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            distance: 0.45,
            amplitude: 0.35,
            period: Duration::from_secs(6),
            noise: 0.01,
            dropout_rate: 0.002,
            dropout_frames: 20,
        }
    }
}

/// Generates a noisy sweeping head with occasional dropouts
#[derive(Debug)]
pub struct SyntheticSensor {
    motion: SyntheticMotion,
    rng: StdRng,
    index: u64,
    limit: Option<u64>,
    dropout_left: usize,
    paced_from: Option<Instant>,
    stopped: bool,
}

impl SyntheticSensor {
    /// Create an unpaced generator with a fixed seed. A frame rate outside
    /// the accepted range is replaced by the default.
    #[must_use]
    pub fn new(mut motion: SyntheticMotion, seed: u64) -> Self {
        if !(MIN_FPS..=MAX_FPS).contains(&motion.fps) {
            warn!("Synthetic frame rate {} out of range, using {}", motion.fps, DEFAULT_FPS);
            motion.fps = DEFAULT_FPS;
        }
        Self {
            motion,
            rng: StdRng::seed_from_u64(seed),
            index: 0,
            limit: None,
            dropout_left: 0,
            paced_from: None,
            stopped: false,
        }
    }

    /// End the session after `frames` frames
    #[must_use]
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Deliver frames in real time
    #[must_use]
    pub fn paced(mut self) -> Self {
        self.paced_from = Some(Instant::now());
        self
    }

    /// Frames delivered so far
    #[must_use]
    pub const fn frames_delivered(&self) -> u64 {
        self.index
    }

    fn timestamp(&self) -> Duration {
        Duration::from_secs_f64(self.index as f64 / self.motion.fps)
    }

    fn wait_until_due(&self, timestamp: Duration) {
        if let Some(start) = self.paced_from {
            let due = start + timestamp;
            let now = Instant::now();
            if due > now {
                std::thread::sleep(due - now);
            }
        }
    }

    fn anchor(&mut self, t: f64) -> FaceAnchor {
        let motion = self.motion;
        let phase = TAU * t / motion.period.as_secs_f64();
        let noise = motion.noise.abs();
        let yaw = motion.amplitude * phase.sin() + self.rng.gen_range(-noise..=noise);
        let pitch = 0.5 * motion.amplitude * (phase * 0.6).sin() + self.rng.gen_range(-noise..=noise);

        let forward = Vector3::new(yaw.sin() * pitch.cos(), pitch.sin(), yaw.cos() * pitch.cos());
        let position = Vector3::new(0.0, 0.0, -motion.distance);
        let confidence = self.rng.gen_range(0.8..=1.0);
        FaceAnchor::tracked(position, forward).with_confidence(confidence)
    }
}

impl SensorSource for SyntheticSensor {
    fn next_frame(&mut self) -> Result<Option<SensorFrame>> {
        if self.stopped || self.limit.is_some_and(|limit| self.index >= limit) {
            return Ok(None);
        }

        let timestamp = self.timestamp();
        self.wait_until_due(timestamp);
        self.index += 1;

        if self.dropout_left == 0 && self.rng.gen_bool(self.motion.dropout_rate.clamp(0.0, 1.0)) {
            debug!("Synthetic dropout at {:?}", timestamp);
            self.dropout_left = self.motion.dropout_frames;
        }
        if self.dropout_left > 0 {
            self.dropout_left -= 1;
            return Ok(Some(SensorFrame::empty(timestamp)));
        }

        let anchor = self.anchor(timestamp.as_secs_f64());
        Ok(Some(SensorFrame::with_face(timestamp, anchor)))
    }

    fn stop(&mut self) {
        if !self.stopped {
            info!("Synthetic sensor stopped after {} frames", self.index);
        }
        self.stopped = true;
    }
}
