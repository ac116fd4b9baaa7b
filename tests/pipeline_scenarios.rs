use approx::assert_abs_diff_eq;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fs;
use std::sync::Arc;
use stride_tracker::sensors::{parse_records, RecordedSession};
use stride_tracker::{
    DirectorySink, PathPoint, PipelineController, SampleQueue, SensorKind, SensorSample,
    TimedVector3, TrackerConfig, TrackerError, TrackerSession,
};

/// Vertical accelerometer trace whose magnitude is 9.45 + 0.8 sin(2πt/500),
/// sampled every 10 ms. After smoothing and gain this peaks near 11.4.
fn walking_trace(duration_ms: i64) -> Vec<TimedVector3> {
    (0..duration_ms / 10)
        .map(|i| {
            let ts = i * 10;
            let magnitude = 9.45 + 0.8 * (2.0 * PI * ts as f64 / 500.0).sin();
            TimedVector3::new(ts, 0.0, 0.0, magnitude)
        })
        .collect()
}

/// One magnetometer sample per 100 ms pointing the device north or east
fn compass_trace(duration_ms: i64, east: bool) -> Vec<TimedVector3> {
    (0..duration_ms / 100)
        .map(|i| {
            if east {
                TimedVector3::new(i * 100, -22.0, 0.0, -40.0)
            } else {
                TimedVector3::new(i * 100, 0.0, 22.0, -40.0)
            }
        })
        .collect()
}

fn run(controller: &mut PipelineController, recorded: &RecordedSession) {
    for sample in recorded.merged() {
        controller.on_sample(sample).unwrap();
    }
}

#[test]
fn test_walking_north_ten_steps() {
    let recorded = RecordedSession {
        accelerometer: walking_trace(5000),
        gyroscope: Vec::new(),
        magnetometer: compass_trace(5000, false),
    };
    let mut controller = PipelineController::new(TrackerConfig::default()).unwrap();
    controller.start();
    run(&mut controller, &recorded);
    controller.stop();

    assert_eq!(controller.step_count(), 10);
    let position = controller.current_position();
    assert_abs_diff_eq!(position.x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(position.y, 6.5, epsilon = 1e-9);

    for pair in controller.steps().windows(2) {
        assert!(pair[1].timestamp - pair[0].timestamp >= 300);
    }
}

#[test]
fn test_walking_east_moves_along_x() {
    let recorded = RecordedSession {
        accelerometer: walking_trace(2000),
        gyroscope: Vec::new(),
        magnetometer: compass_trace(2000, true),
    };
    let mut controller = PipelineController::new(TrackerConfig::default()).unwrap();
    controller.start();
    run(&mut controller, &recorded);

    let steps = controller.step_count();
    assert!(steps > 0);
    let position = controller.current_position();
    assert_abs_diff_eq!(position.x, 0.65 * steps as f64, epsilon = 1e-6);
    assert_abs_diff_eq!(position.y, 0.0, epsilon = 1e-6);
    assert!(controller
        .headings()
        .iter()
        .all(|h| (h.azimuth - FRAC_PI_2).abs() < 1e-9));
}

#[test]
fn test_resting_then_single_ramp() {
    let mut controller = PipelineController::new(TrackerConfig::default()).unwrap();
    controller.start();
    controller.on_magnetometer(TimedVector3::new(0, 0.0, 22.0, -40.0));

    let mut ts = 0;
    let mut feed = |controller: &mut PipelineController, magnitude: f64| {
        ts += 20;
        controller
            .on_accelerometer(TimedVector3::new(ts, 0.0, 0.0, magnitude))
            .unwrap()
    };

    // one full filter window at rest
    for _ in 0..7 {
        assert!(feed(&mut controller, 9.45).is_none());
    }
    assert!(controller.steps().is_empty());
    assert_eq!(controller.path(), &[PathPoint::ORIGIN]);

    let mut updates = Vec::new();
    for magnitude in [9.8, 10.3, 10.9, 11.6, 12.0, 11.6, 10.9, 10.3, 9.8]
        .into_iter()
        .chain(std::iter::repeat(9.45).take(20))
    {
        if let Some(update) = feed(&mut controller, magnitude) {
            updates.push(update);
        }
    }

    assert_eq!(updates.len(), 1);
    assert_eq!(controller.steps().len(), 1);
    assert_eq!(controller.path().len(), 2);
    assert_abs_diff_eq!(updates[0].position.x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(updates[0].position.y, 0.65, epsilon = 1e-9);
}

#[test]
fn test_steps_before_any_heading_are_reported() {
    let mut controller = PipelineController::new(TrackerConfig::default()).unwrap();
    controller.start();

    let mut first_error = None;
    for sample in walking_trace(1000) {
        if let Err(e) = controller.on_accelerometer(sample) {
            first_error.get_or_insert(e);
        }
    }
    assert!(matches!(first_error, Some(TrackerError::IllegalState(_))));
    assert!(!controller.steps().is_empty());
    assert_eq!(controller.path(), &[PathPoint::ORIGIN]);
}

#[test]
fn test_start_twice_resets_everything() {
    let recorded = RecordedSession {
        accelerometer: walking_trace(2000),
        gyroscope: vec![TimedVector3::new(0, 0.0, 0.0, 0.1)],
        magnetometer: compass_trace(2000, false),
    };
    let mut controller = PipelineController::new(TrackerConfig::default()).unwrap();
    controller.start();
    run(&mut controller, &recorded);
    assert!(controller.step_count() > 0);

    controller.start();
    controller.start();
    assert_eq!(controller.step_count(), 0);
    assert_eq!(controller.path(), &[PathPoint::ORIGIN]);
    assert!(controller.headings().is_empty());
    assert_eq!(controller.raw_log().count(SensorKind::Gyroscope), 0);
}

#[test]
fn test_queue_replay_matches_direct_replay() {
    let recorded = RecordedSession {
        accelerometer: walking_trace(5000),
        gyroscope: Vec::new(),
        magnetometer: compass_trace(5000, false),
    };

    let session = Arc::new(TrackerSession::new(TrackerConfig::default()).unwrap());
    session.start().unwrap();
    let queue = SampleQueue::spawn(session.clone());
    for sample in recorded.merged() {
        queue.send(sample).unwrap();
    }
    let stats = queue.close().unwrap();
    session.stop().unwrap();

    assert_eq!(stats.processed as usize, recorded.len());
    assert_eq!(stats.steps, 10);
    assert_eq!(session.step_count().unwrap(), 10);
}

#[test]
fn test_saved_session_replays_identically() {
    let dir = tempfile::tempdir().unwrap();
    let session = TrackerSession::new(TrackerConfig::default()).unwrap();
    session.start().unwrap();

    let recorded = RecordedSession {
        accelerometer: walking_trace(3000),
        gyroscope: vec![
            TimedVector3::new(5, 0.01, -0.02, 0.5),
            TimedVector3::new(15, 0.0, 0.0, 0.25),
        ],
        magnetometer: compass_trace(3000, true),
    };
    for sample in recorded.merged() {
        session.push_sample(sample).unwrap();
    }
    session
        .push_sample(SensorSample::gyroscope(2990, 0.0, 0.0, 0.0))
        .unwrap();
    session.stop().unwrap();
    let steps = session.step_count().unwrap();

    let mut sink = DirectorySink::new(dir.path()).unwrap();
    let written = session.save(&mut sink, None).unwrap();
    assert_eq!(written, 5);
    assert_eq!(sink.written().len(), 5);

    let acce = sink
        .written()
        .iter()
        .find(|p| p.to_string_lossy().ends_with("_acce.txt"))
        .unwrap()
        .clone();
    let text = fs::read_to_string(&acce).unwrap();
    let parsed = parse_records(text.as_bytes()).unwrap();
    assert_eq!(parsed, recorded.accelerometer);

    let reloaded = RecordedSession::load_dir(dir.path()).unwrap();
    assert_eq!(reloaded.gyroscope.len(), 3);
    let mut replay = PipelineController::new(TrackerConfig::default()).unwrap();
    replay.start();
    run(&mut replay, &reloaded);
    assert_eq!(replay.step_count(), steps);
}
