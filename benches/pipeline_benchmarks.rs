//! End-to-end benchmarks of the per-frame pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use head_gaze::{
    clock::ManualClock,
    config::Config,
    dispatch::{Dispatcher, GazeEvent, Topic},
    dwell::{GazeTarget, TargetId, TargetRegistry},
    geometry::{Rect, ScreenPoint},
    pipeline::GazePipeline,
    pose::SensorFrame,
    sensor::{SensorSource, SyntheticMotion, SyntheticSensor},
};
use std::{sync::Arc, time::Duration};

fn synthetic_frames(count: u64) -> Vec<SensorFrame> {
    let mut sensor = SyntheticSensor::new(SyntheticMotion::default(), 7).with_limit(count);
    let mut frames = Vec::new();
    while let Ok(Some(frame)) = sensor.next_frame() {
        frames.push(frame);
    }
    frames
}

/// Registry with a `side` x `side` grid of targets on a 1024x768 surface
fn grid(side: u32) -> Arc<TargetRegistry> {
    let registry = Arc::new(TargetRegistry::new());
    let (w, h) = (1024.0 / f64::from(side), 768.0 / f64::from(side));
    for row in 0..side {
        for col in 0..side {
            let rect = Rect::new(f64::from(col) * w, f64::from(row) * h, w, h);
            registry.register(GazeTarget::new(TargetId(u64::from(row * side + col)), rect));
        }
    }
    registry
}

fn benchmark_process_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_frame");
    let frames = synthetic_frames(600);

    for (name, diagnostics) in [("production", false), ("with_diagnostics", true)] {
        let mut config = Config::default();
        config.dispatch.diagnostics = diagnostics;

        group.bench_with_input(BenchmarkId::new("sequence_600", name), &frames, |b, data| {
            b.iter(|| {
                let clock = Arc::new(ManualClock::new());
                let mut pipeline = GazePipeline::new(&config, grid(4), clock.clone());
                for frame in data {
                    black_box(pipeline.process_frame(frame).ok());
                    clock.advance(Duration::from_micros(16_667));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_hit_test(c: &mut Criterion) {
    use head_gaze::dwell::TargetProvider;

    let mut group = c.benchmark_group("hit_test");
    for side in [2_u32, 8, 32] {
        let registry = grid(side);
        group.bench_with_input(BenchmarkId::new("target_at", side * side), &registry, |b, registry| {
            b.iter(|| black_box(registry.target_at(black_box(ScreenPoint::new(511.0, 383.0)))));
        });
    }
    group.finish();
}

fn benchmark_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    for subscribers in [1_usize, 4, 16] {
        let dispatcher = Dispatcher::new(1024);
        let receivers: Vec<_> = (0..subscribers)
            .map(|_| dispatcher.subscribe(&[Topic::Observation]))
            .collect();

        group.bench_with_input(BenchmarkId::new("publish_drain", subscribers), &receivers, |b, receivers| {
            b.iter(|| {
                for _ in 0..100 {
                    dispatcher.publish(GazeEvent::Cursor(ScreenPoint::new(1.0, 2.0)));
                }
                for receiver in receivers {
                    black_box(receiver.drain());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_process_frame, benchmark_hit_test, benchmark_dispatch);
criterion_main!(benches);
