//! The per-tick gaze pipeline.
//!
//! One call to [`GazePipeline::process_frame`] runs a whole tick on the
//! caller's thread: pose extraction, availability debounce, control loop,
//! cursor integration, then hit-testing and dwell. Results leave through the
//! [`Dispatcher`]; nothing here touches UI state.
//!
//! The cursor only moves while tracking is `Acquired`. A `Lost` transition
//! freezes it in place, cancels any dwell and resets the control loop.

use crate::{
    clock::Clock,
    config::Config,
    correction::{CorrectionOffset, Settings, SharedSettings},
    cursor::CursorMapper,
    dispatch::{Dispatcher, GazeEvent, Subscriber, Topic},
    dwell::{DwellEvent, DwellPhase, DwellSelector, TargetId, TargetProvider},
    geometry::{CursorDelta, ScreenPoint, ScreenSize},
    interpolator::{PassThroughInterpolator, PidInterpolator, TrackingInterpolator},
    pose::{AnchorTransition, PoseExtractor, PoseSample, SensorFrame},
    sensor::SensorSource,
    tracking::{TrackingAvailability, TrackingMonitor},
    Error, Result,
};
use log::{debug, info, trace, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

/// One control loop and the cursor it drives
struct Track {
    interpolator: Box<dyn TrackingInterpolator>,
    cursor: CursorMapper,
}

impl Track {
    fn new(interpolator: Box<dyn TrackingInterpolator>, bounds: ScreenSize) -> Self {
        let mut cursor = CursorMapper::new(bounds);
        cursor.freeze();
        Self { interpolator, cursor }
    }

    fn advance(&mut self, sample: Option<&PoseSample>, settings: &Settings) -> Option<ScreenPoint> {
        let scale = sample.map_or(0.0, |s| settings.sensitivity.scale_for(s.distance()));
        let delta = self.interpolator.update(sample, &settings.correction, scale)?;
        Some(self.cursor.apply(delta))
    }

    fn halt(&mut self) {
        self.interpolator.reset();
        self.cursor.freeze();
    }

    fn recenter(&mut self) {
        self.interpolator.reset();
        self.cursor.recenter();
    }
}

/// Outcome of a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Production cursor after the tick
    pub position: ScreenPoint,
    /// Displacement the production cursor moved on this tick, after clipping
    pub velocity: CursorDelta,
    /// Availability after the tick
    pub availability: TrackingAvailability,
    /// Availability transition published on this tick
    pub transition: Option<TrackingAvailability>,
    /// Raw face-anchor presence change, before confidence filtering and debounce
    pub anchor: Option<AnchorTransition>,
    /// Target activated on this tick
    pub activation: Option<TargetId>,
}

/// Totals of a [`GazePipeline::run`] session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames processed
    pub frames: u64,
    /// Activations emitted
    pub activations: u64,
}

/// Cloneable handle that ends a [`GazePipeline::run`] loop.
///
/// A request made while no loop is running makes the next `run` return
/// before its first frame. Each `run` consumes the request when it returns.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the run loop to stop after the current frame
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Head pose to cursor and dwell activation
pub struct GazePipeline {
    config: Config,
    clock: Arc<dyn Clock>,
    targets: Arc<dyn TargetProvider>,
    dispatcher: Arc<Dispatcher>,
    settings: SharedSettings,
    extractor: PoseExtractor,
    production: Track,
    diagnostics: Option<Track>,
    dwell: DwellSelector,
    monitor: TrackingMonitor,
    last_sample: Option<PoseSample>,
    running: bool,
    stop: StopHandle,
}

impl GazePipeline {
    /// Create a pipeline for a new sensor session.
    ///
    /// Out-of-range configuration is replaced by safe defaults. Availability
    /// starts as `Unknown` with the cursor frozen at the surface center.
    pub fn new(config: &Config, targets: Arc<dyn TargetProvider>, clock: Arc<dyn Clock>) -> Self {
        let config = config.sanitized();
        let bounds = config.screen.size();
        info!(
            "Initializing gaze pipeline: {}x{} surface, {}ms dwell",
            bounds.width, bounds.height, config.dwell.threshold_ms
        );

        let production = Track::new(Box::new(PidInterpolator::new(&config.interpolator)), bounds);
        let diagnostics = config.dispatch.diagnostics.then(|| {
            info!("Diagnostics track enabled");
            Track::new(Box::new(PassThroughInterpolator::new(&config.interpolator)), bounds)
        });

        Self {
            clock,
            targets,
            dispatcher: Arc::new(Dispatcher::new(config.dispatch.observation_capacity)),
            settings: SharedSettings::new(config.settings()),
            extractor: PoseExtractor::new(),
            production,
            diagnostics,
            dwell: DwellSelector::new(config.dwell.threshold(), config.dwell.repeat_after_activation),
            monitor: TrackingMonitor::new(config.tracking.grace_period()),
            last_sample: None,
            running: true,
            stop: StopHandle::default(),
            config,
        }
    }

    /// Run one tick for a sensor frame.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` while the pipeline is stopped and
    /// `SessionFailed` after the sensor session failed, until
    /// [`GazePipeline::restart`].
    pub fn process_frame(&mut self, frame: &SensorFrame) -> Result<TickReport> {
        if !self.running {
            return Err(Error::InvalidInput("pipeline is stopped".to_string()));
        }
        let now = self.clock.now();
        let extraction = self.extractor.extract(frame)?;
        if let Some(anchor) = extraction.transition {
            debug!("Face anchor {:?} at {:?}", anchor, frame.timestamp);
        }
        let settings = self.settings.snapshot();

        let threshold = self.config.tracking.confidence_threshold;
        let sample = extraction.sample.filter(|s| s.is_confident(threshold));
        if sample.is_some() {
            self.last_sample = sample;
        }

        let transition = self.monitor.update(sample.is_some(), now);
        match transition {
            Some(TrackingAvailability::Acquired) => self.resume_tracks(),
            Some(TrackingAvailability::Lost) => self.halt_tracks(),
            _ => {}
        }
        if let Some(availability) = transition {
            self.dispatcher.publish(GazeEvent::Tracking(availability));
        }

        let (position, velocity) = match self.production.advance(sample.as_ref(), &settings) {
            Some(point) => (point, self.production.cursor.velocity()),
            None => (self.production.cursor.position(), CursorDelta::ZERO),
        };
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            if let Some(point) = diagnostics.advance(sample.as_ref(), &settings) {
                self.dispatcher.publish(GazeEvent::DiagnosticCursor(point));
            }
        }

        let availability = self.monitor.availability();
        let mut activation = None;
        if availability == TrackingAvailability::Acquired {
            self.dispatcher.publish(GazeEvent::Cursor(position));
            let hit = self.targets.target_at(position);
            for event in self.dwell.update(hit.as_ref(), now) {
                if let DwellEvent::Activated(target) = event {
                    activation = Some(target);
                }
                self.publish_dwell(event);
            }
        }
        trace!(
            "tick {:?}: cursor=({:.1}, {:.1}) {}",
            frame.timestamp,
            position.x,
            position.y,
            availability
        );

        Ok(TickReport {
            position,
            velocity,
            availability,
            transition,
            anchor: extraction.transition,
            activation,
        })
    }

    fn publish_dwell(&self, event: DwellEvent) {
        match event {
            DwellEvent::Started(target) => debug!("Hovering {}", target),
            DwellEvent::Progress { target, fraction } => {
                self.dispatcher.publish(GazeEvent::DwellProgress { target, fraction });
            }
            DwellEvent::Activated(target) => {
                self.dispatcher.publish(GazeEvent::Activation(target));
            }
            DwellEvent::Cancelled(target) => {
                self.dispatcher.publish(GazeEvent::DwellCancelled(target));
            }
        }
    }

    fn resume_tracks(&mut self) {
        self.production.cursor.resume();
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            diagnostics.cursor.resume();
        }
    }

    fn halt_tracks(&mut self) {
        self.production.halt();
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            diagnostics.halt();
        }
        if let Some(target) = self.dwell.cancel() {
            self.dispatcher.publish(GazeEvent::DwellCancelled(target));
        }
    }

    /// Pull frames from `source` until it ends, fails or a stop is requested.
    ///
    /// The pipeline is stopped when this returns, so availability is `Lost`.
    ///
    /// # Errors
    ///
    /// Returns `SessionFailed` when the sensor session died, after the
    /// pipeline has been stopped.
    pub fn run(&mut self, source: &mut dyn SensorSource) -> Result<RunSummary> {
        self.start();
        info!("Starting gaze session");
        let mut summary = RunSummary::default();

        let result = loop {
            if self.stop.is_stop_requested() {
                info!("Stop requested");
                break Ok(());
            }
            match source.next_frame() {
                Ok(Some(frame)) => match self.process_frame(&frame) {
                    Ok(report) => {
                        summary.frames += 1;
                        if report.activation.is_some() {
                            summary.activations += 1;
                        }
                    }
                    Err(e) => break Err(e),
                },
                Ok(None) => {
                    info!("Sensor session ended");
                    break Ok(());
                }
                Err(Error::SessionFailed(reason)) => break Err(self.extractor.fail(reason)),
                Err(e) => {
                    warn!("Sensor error: {}", e);
                    break Err(e);
                }
            }
        };

        source.stop();
        self.stop();
        self.stop.clear();
        info!(
            "Gaze session finished: {} frames, {} activations",
            summary.frames, summary.activations
        );
        result.map(|()| summary)
    }

    /// Begin a session if none is running
    pub fn start(&mut self) {
        if !self.running {
            self.restart();
        }
    }

    /// Begin a fresh session: availability back to `Unknown`, control loop
    /// and dwell cleared
    pub fn restart(&mut self) {
        info!("Restarting gaze session");
        self.extractor.reset();
        self.halt_tracks();
        self.last_sample = None;
        if let Some(availability) = self.monitor.restart() {
            self.dispatcher.publish(GazeEvent::Tracking(availability));
        }
        self.running = true;
    }

    /// End the session: availability forced to `Lost`, dwell cancelled,
    /// cursor frozen. Calling it again has no effect.
    pub fn stop(&mut self) {
        if self.running {
            info!("Stopping gaze session");
        }
        self.running = false;
        self.halt_tracks();
        if let Some(availability) = self.monitor.force_lost() {
            self.dispatcher.publish(GazeEvent::Tracking(availability));
        }
    }

    /// Handle that stops [`GazePipeline::run`] from another thread
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Abort the dwell in progress without activation. The cursor must leave
    /// the target before it can be dwelt on again.
    pub fn cancel_active_target(&mut self) -> Option<TargetId> {
        let target = self.dwell.dismiss()?;
        info!("Dwell on {} cancelled by the UI", target);
        self.dispatcher.publish(GazeEvent::DwellCancelled(target));
        Some(target)
    }

    /// Make the last confidently tracked pose the neutral gaze
    pub fn calibrate(&mut self) -> Option<CorrectionOffset> {
        let sample = self.last_sample?;
        Some(self.settings.calibrate(&sample))
    }

    /// Move the cursor back to the surface center and clear the control
    /// loop. A frozen cursor stays frozen at the center.
    pub fn recenter_cursor(&mut self) -> ScreenPoint {
        self.production.recenter();
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            diagnostics.recenter();
        }
        let position = self.production.cursor.position();
        info!("Cursor recentered at ({:.1}, {:.1})", position.x, position.y);
        if self.monitor.availability() == TrackingAvailability::Acquired {
            self.dispatcher.publish(GazeEvent::Cursor(position));
        }
        position
    }

    /// Change the surface size; the cursor is re-clamped
    pub fn resize(&mut self, bounds: ScreenSize) {
        info!("Surface resized to {}x{}", bounds.width, bounds.height);
        self.production.cursor.resize(bounds);
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            diagnostics.cursor.resize(bounds);
        }
    }

    /// Change the dwell threshold
    pub fn set_dwell_threshold(&mut self, threshold: Duration) {
        if threshold.is_zero() {
            warn!("Ignoring zero dwell threshold");
            return;
        }
        self.dwell.set_threshold(threshold);
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self, topics: &[Topic]) -> Subscriber {
        self.dispatcher.subscribe(topics)
    }

    /// Event dispatcher, for subscribing from other threads
    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Writer handle for sensitivity and calibration
    #[must_use]
    pub fn settings(&self) -> SharedSettings {
        self.settings.clone()
    }

    /// Production cursor position
    #[must_use]
    pub const fn cursor_position(&self) -> ScreenPoint {
        self.production.cursor.position()
    }

    /// Pass-through cursor position, when the diagnostics track is enabled
    #[must_use]
    pub fn diagnostic_position(&self) -> Option<ScreenPoint> {
        self.diagnostics.as_ref().map(|d| d.cursor.position())
    }

    /// Current tracking availability
    #[must_use]
    pub const fn availability(&self) -> TrackingAvailability {
        self.monitor.availability()
    }

    /// Current dwell state
    #[must_use]
    pub const fn dwell_phase(&self) -> DwellPhase {
        self.dwell.phase()
    }

    /// Whether a session is running
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Effective configuration after sanitizing
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}
