//! Head-pose gaze pointing and dwell activation for hands-free input.
//!
//! This library turns per-frame head pose from a face-tracking sensor into a
//! stable on-screen cursor, and sustained attention on an interactive target
//! into a discrete activation event.
//!
//! Each sensor frame runs through:
//! 1. Pose extraction (head position, facing direction, confidence)
//! 2. Calibration offset and distance-adaptive sensitivity
//! 3. A PID-style control loop producing a smoothed cursor delta
//! 4. Clamped integration into an absolute cursor position
//! 5. Hit-testing and a single-slot dwell state machine
//!
//! Tracking availability is debounced alongside, and all results are
//! published through a [`dispatch::Dispatcher`].
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use head_gaze::{
//!     clock::SystemClock,
//!     config::Config,
//!     dispatch::{GazeEvent, Topic},
//!     dwell::{GazeTarget, TargetId, TargetRegistry},
//!     geometry::Rect,
//!     pipeline::GazePipeline,
//!     sensor::{SyntheticMotion, SyntheticSensor},
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let targets = Arc::new(TargetRegistry::new());
//! targets.register(GazeTarget::new(TargetId(1), Rect::new(400.0, 300.0, 200.0, 200.0)));
//!
//! let mut pipeline = GazePipeline::new(&Config::default(), targets, Arc::new(SystemClock));
//! let input = pipeline.subscribe(&[Topic::Input]);
//!
//! let mut sensor = SyntheticSensor::new(SyntheticMotion::default(), 42).with_limit(600).paced();
//! pipeline.run(&mut sensor)?;
//!
//! for envelope in input.drain() {
//!     if let GazeEvent::Activation(target) = envelope.event {
//!         println!("Activated {target}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving Ticks Manually
//!
//! ```
//! use head_gaze::{
//!     clock::ManualClock,
//!     config::Config,
//!     dwell::TargetRegistry,
//!     pipeline::GazePipeline,
//!     pose::{FaceAnchor, SensorFrame},
//!     tracking::TrackingAvailability,
//! };
//! use nalgebra::Vector3;
//! use std::{sync::Arc, time::Duration};
//!
//! let clock = Arc::new(ManualClock::new());
//! let mut pipeline = GazePipeline::new(&Config::default(), Arc::new(TargetRegistry::new()), clock.clone());
//!
//! let head = Vector3::new(0.0, 0.0, -0.45);
//! let frame = SensorFrame::with_face(Duration::ZERO, FaceAnchor::tracked(head, -head));
//! let report = pipeline.process_frame(&frame).unwrap();
//! assert_eq!(report.availability, TrackingAvailability::Acquired);
//! ```

/// Constants used throughout the pipeline
pub mod constants;

/// Error types and result handling
pub mod error;

/// Configuration management
pub mod config;

/// Screen-space points, deltas and regions
pub mod geometry;

/// Wall-clock abstraction
pub mod clock;

/// Pose extraction from sensor frames
pub mod pose;

/// Calibration offset and sensitivity scale
pub mod correction;

/// Low-pass smoothing
pub mod smoothing;

/// Control loop strategies
pub mod interpolator;

/// Cursor position integration
pub mod cursor;

/// Dwell selection state machine and hit-testing
pub mod dwell;

/// Tracking availability debounce
pub mod tracking;

/// Event fan-out
pub mod dispatch;

/// Sensor frame sources
pub mod sensor;

/// The per-tick pipeline
pub mod pipeline;

/// Cursor output for X11 systems
#[cfg(feature = "x11")]
pub mod cursor_control;

pub use error::{Error, Result};
