//! Error handling tests for all modules


use head_gaze::{
    clock::ManualClock,
    config::{Config, InterpolatorConfig},
    correction::{SensitivityPreset, SensitivityRange, SharedSettings},
    dispatch::{Dispatcher, GazeEvent, Topic},
    geometry::ScreenPoint,
    interpolator::create_interpolator,
    pipeline::GazePipeline,
    pose::PoseExtractor,
    sensor::{ScriptedSensor, SensorSource},
    Error, Result,
};
use std::{sync::Arc, thread, time::Duration};
use test_helpers::{centered_frame, registry};

#[test]
fn test_interpolator_creation_errors() {
    let config = InterpolatorConfig::default();

    let result = create_interpolator("invalid_strategy", &config);
    match result {
        Err(Error::InvalidInput(msg)) => assert!(msg.contains("invalid_strategy")),
        _ => panic!("Expected InvalidInput"),
    }

    for name in ["pid", "PID", "passthrough", "pass_through", "none"] {
        assert!(create_interpolator(name, &config).is_ok(), "Failed for {}", name);
    }
}

#[test]
fn test_invalid_sensitivity_parameters() {
    let cases = [
        (f64::NAN, 6.0),
        (0.0, 6.0),
        (-3.0, 6.0),
        (6.0, 3.0),
        (3.0, f64::INFINITY),
    ];

    for (lower, upper) in cases {
        let range = SensitivityRange::new(lower, upper);
        assert!(range.is_valid(), "[{}, {}] was not repaired", lower, upper);
    }
    assert!(SensitivityPreset::from_name("extreme").is_none());
}

#[test]
fn test_session_failure_is_sticky_until_reset() {
    let mut extractor = PoseExtractor::new();
    let error = extractor.fail("usb reset");
    assert!(matches!(error, Error::SessionFailed(_)));

    assert!(matches!(
        extractor.extract(&centered_frame(0)),
        Err(Error::SessionFailed(msg)) if msg == "usb reset"
    ));

    extractor.reset();
    assert!(extractor.extract(&centered_frame(0)).is_ok());
}

#[test]
fn test_scripted_sensor_failure() {
    let mut sensor = ScriptedSensor::new(vec![centered_frame(0)]);
    sensor.push_failure("lost camera");

    assert!(matches!(sensor.next_frame(), Ok(Some(_))));
    assert!(matches!(sensor.next_frame(), Err(Error::SessionFailed(_))));
    assert!(matches!(sensor.next_frame(), Ok(None)));
}

#[test]
fn test_stopped_pipeline_rejects_frames() {
    let clock = Arc::new(ManualClock::new());
    let mut pipeline = GazePipeline::new(&Config::default(), registry(&[]), clock);
    pipeline.stop();

    let result = pipeline.process_frame(&centered_frame(0));
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn test_closed_dispatcher_reports_error() {
    let dispatcher = Dispatcher::new(4);
    let subscriber = dispatcher.subscribe(&[Topic::Observation]);
    dispatcher.publish(GazeEvent::Cursor(ScreenPoint::new(1.0, 1.0)));
    drop(dispatcher);

    // Queued events are still delivered, then the closed channel is an error
    assert!(matches!(subscriber.try_recv(), Ok(Some(_))));
    assert!(subscriber.try_recv().is_err());
    assert!(subscriber.recv_timeout(Duration::from_millis(10)).is_err());
}

#[test]
fn test_concurrent_settings_writers() {
    let settings = SharedSettings::default();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let writer = settings.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    writer.set_sensitivity(SensitivityRange::new(1.0 + f64::from(i), 2.0 + f64::from(i)));
                }
            })
        })
        .collect();

    let mut reader = settings.clone();
    for _ in 0..100 {
        assert!(reader.snapshot().sensitivity.is_valid());
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(settings.current().sensitivity.is_valid());
}

#[test]
fn test_error_display_formatting() {
    let errors = vec![
        Error::InvalidInput("Test input error".to_string()),
        Error::ConfigError("Test config error".to_string()),
        Error::SessionFailed("Test sensor error".to_string()),
        Error::CursorControl("Test cursor error".to_string()),
        Error::IoError("Test io error".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty());
        assert!(display.contains("Test"));
    }
}

#[test]
fn test_error_conversion_traits() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let error: Error = io.into();
    assert!(matches!(error, Error::Io(_)));

    let yaml = serde_yaml::from_str::<Config>("screen: [1, 2").unwrap_err();
    let error: Error = yaml.into();
    assert!(matches!(error, Error::Yaml(_)));

    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}

#[test]
fn test_result_type_operations() {
    let ok_result: Result<i32> = Ok(42);
    let err_result: Result<i32> = Err(Error::InvalidInput("Test".to_string()));

    assert!(ok_result.is_ok());
    assert!(err_result.is_err());

    let mapped_ok = ok_result.map(|x| x * 2);
    assert_eq!(mapped_ok.unwrap(), 84);

    let mapped_err = err_result.map(|x| x * 2);
    assert!(mapped_err.is_err());
}
