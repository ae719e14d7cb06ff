//! The cursor never leaves the surface, whatever the deltas or head pose


use head_gaze::{
    cursor::CursorMapper,
    geometry::{CursorDelta, ScreenPoint, ScreenSize},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use test_helpers::{registry, scenario_config, turned_frame, Harness};

#[test]
fn test_random_deltas_stay_in_bounds() {
    let bounds = ScreenSize::new(1920.0, 1080.0);
    let mut mapper = CursorMapper::new(bounds);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..10_000 {
        let delta = CursorDelta::new(rng.gen_range(-800.0..800.0), rng.gen_range(-800.0..800.0));
        let position = mapper.apply(delta);
        assert!(bounds.contains(position), "{:?} escaped {:?}", position, bounds);
    }
}

#[test]
fn test_non_finite_deltas_are_ignored() {
    let bounds = ScreenSize::new(800.0, 600.0);
    let mut mapper = CursorMapper::new(bounds);
    let start = mapper.position();

    for delta in [
        CursorDelta::new(f64::NAN, 0.0),
        CursorDelta::new(0.0, f64::INFINITY),
        CursorDelta::new(f64::NEG_INFINITY, f64::NAN),
    ] {
        assert_eq!(mapper.apply(delta), start);
    }
}

#[test]
fn test_reversing_at_edge_moves_away_immediately() {
    let bounds = ScreenSize::new(800.0, 600.0);
    let mut mapper = CursorMapper::new(bounds);

    for _ in 0..20 {
        mapper.apply(CursorDelta::new(500.0, 0.0));
    }
    assert_eq!(mapper.position().x, 800.0);

    let position = mapper.apply(CursorDelta::new(-10.0, 0.0));
    assert_eq!(position, ScreenPoint::new(790.0, 300.0));
}

#[test]
fn test_hard_turn_pins_cursor_to_corner() {
    let mut harness = Harness::new(&scenario_config(), registry(&[]));
    let bounds = ScreenSize::new(1000.0, 800.0);

    let reports = harness.run_until(5000, |ms| turned_frame(ms, 3.0, -3.0));
    assert!(reports.iter().all(|r| bounds.contains(r.position)));
    assert_eq!(harness.pipeline.cursor_position(), ScreenPoint::new(1000.0, 800.0));
}

#[test]
fn test_random_head_motion_stays_in_bounds() {
    let mut harness = Harness::new(&scenario_config(), registry(&[]));
    let bounds = ScreenSize::new(1000.0, 800.0);
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..2000 {
        let (x, y) = (rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
        let report = harness.tick(|ms| turned_frame(ms, x, y));
        assert!(bounds.contains(report.position));
    }
}
