//! Gaze pointing demo: drives the pipeline with a synthetic head and logs
//! the resulting activations and tracking changes.

use anyhow::{bail, Context, Result};
use clap::Parser;
use head_gaze::{
    clock::SystemClock,
    config::Config,
    correction::SensitivityPreset,
    dispatch::{GazeEvent, Subscriber, Topic},
    dwell::{GazeTarget, TargetId, TargetRegistry},
    geometry::Rect,
    pipeline::GazePipeline,
    sensor::{SyntheticMotion, SyntheticSensor},
};
use log::{info, warn};
use std::{sync::Arc, thread};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Number of sensor frames to generate
    #[arg(short, long, default_value = "1800")]
    frames: u64,

    /// Sensor frame rate
    #[arg(long, default_value = "60")]
    fps: f64,

    /// Dwell threshold in milliseconds (overrides the config file)
    #[arg(long)]
    dwell_ms: Option<u64>,

    /// Sensitivity preset (low, medium, high)
    #[arg(short, long)]
    sensitivity: Option<String>,

    /// Also run the pass-through diagnostics cursor
    #[arg(long)]
    diagnostics: bool,

    /// Seed for the synthetic head motion
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Move the X11 pointer along with the cursor
    #[cfg(feature = "x11")]
    #[arg(long)]
    x11: bool,
}

/// Grid of targets covering the surface, 4 columns by 3 rows
fn register_grid(registry: &TargetRegistry, width: f64, height: f64) {
    let (cols, rows) = (4_u32, 3_u32);
    let cell_w = width / f64::from(cols);
    let cell_h = height / f64::from(rows);
    for row in 0..rows {
        for col in 0..cols {
            let id = TargetId(u64::from(row * cols + col));
            // Inset so neighbouring cells do not share an edge
            let rect = Rect::new(
                f64::from(col) * cell_w + 8.0,
                f64::from(row) * cell_h + 8.0,
                cell_w - 16.0,
                cell_h - 16.0,
            );
            registry.register(GazeTarget::new(id, rect));
        }
    }
}

fn log_events(events: &Subscriber) -> u64 {
    let mut activations = 0;
    while let Ok(envelope) = events.recv() {
        match envelope.event {
            GazeEvent::Activation(target) => {
                activations += 1;
                info!("Activation: {}", target);
            }
            GazeEvent::Tracking(availability) => info!("Tracking {}", availability),
            _ => {}
        }
    }
    activations
}

fn load_config(args: &Args) -> Result<Config> {
    if !(args.fps.is_finite() && args.fps > 0.0) {
        bail!("Frame rate must be positive, got {}", args.fps);
    }

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            Config::from_file(path).with_context(|| format!("Failed to load config file {path}"))?
        }
        None => Config::default(),
    };

    if let Some(dwell_ms) = args.dwell_ms {
        config.dwell.threshold_ms = dwell_ms;
    }
    if let Some(name) = &args.sensitivity {
        let Some(preset) = SensitivityPreset::from_name(name) else {
            bail!("Unknown sensitivity preset: {name}");
        };
        config.sensitivity.preset = preset;
        config.sensitivity.lower = None;
        config.sensitivity.upper = None;
    }
    if args.diagnostics {
        config.dispatch.diagnostics = true;
    }
    config.interpolator.nominal_fps = args.fps;

    if let Err(e) = config.validate() {
        warn!("{}; out-of-range values will be replaced", e);
    }
    Ok(config.sanitized())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!(
        "Head Gaze {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TARGET")
    );

    #[allow(unused_mut)]
    let mut config = load_config(&args)?;

    #[cfg(feature = "x11")]
    let sink = if args.x11 {
        let sink = head_gaze::cursor_control::X11CursorSink::new()?;
        let size = sink.screen_size();
        config.screen.width = size.width;
        config.screen.height = size.height;
        Some(sink)
    } else {
        None
    };

    if args.print_config {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let targets = Arc::new(TargetRegistry::new());
    register_grid(&targets, config.screen.width, config.screen.height);

    let mut pipeline = GazePipeline::new(&config, targets, Arc::new(SystemClock));
    let events = pipeline.subscribe(&[Topic::Input, Topic::Observation]);
    let logger = thread::spawn(move || log_events(&events));

    #[cfg(feature = "x11")]
    let follower = sink.map(|sink| {
        let cursor = pipeline.subscribe(&[Topic::Observation]);
        thread::spawn(move || sink.follow(&cursor))
    });

    let motion = SyntheticMotion {
        fps: pipeline.config().interpolator.nominal_fps,
        ..SyntheticMotion::default()
    };
    let mut sensor = SyntheticSensor::new(motion, args.seed).with_limit(args.frames).paced();
    let summary = pipeline.run(&mut sensor)?;
    let position = pipeline.cursor_position();
    drop(pipeline);

    let logged = logger
        .join()
        .map_err(|_| anyhow::anyhow!("event logger thread panicked"))?;

    #[cfg(feature = "x11")]
    if let Some(follower) = follower {
        follower
            .join()
            .map_err(|_| anyhow::anyhow!("cursor sink thread panicked"))??;
    }

    info!(
        "Processed {} frames, {} activations ({} logged), final cursor ({:.1}, {:.1})",
        summary.frames, summary.activations, logged, position.x, position.y
    );
    Ok(())
}
