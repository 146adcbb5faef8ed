//! End-to-end heart rate estimation in both operating modes

mod test_helpers;

use heart_rate_monitor::estimators::{create_estimator, EstimatorKind};
use heart_rate_monitor::monitor::HeartRateMonitor;
use heart_rate_monitor::sample::{IntensityMethod, Sample};
use heart_rate_monitor::{Bpm, PulseType};
use test_helpers::{periodic_frames, ready_values, square_frames, with_noise, Harness, FINGER};

#[test]
fn test_frequency_mode_reports_on_bin_rate() {
    let harness = Harness::new(HeartRateMonitor::new());
    let updates = harness.stream.subscribe().unwrap();
    harness.place_finger(0);

    // 4 cycles per 128 frames at 25 ms -> bin 4 at fs = 128 / 3.175 s
    let frames = periodic_frames(200, 128, 4, 25, 2000);
    for frame in &frames {
        harness.push(frame);
    }

    let events = updates.drain();
    assert_eq!(events[0], Bpm::NOT_READY);
    let values = ready_values(&events);
    assert_eq!(values.len(), 200 - 127);
    assert!(values.iter().all(|&v| v == 76), "values: {values:?}");
    assert!(events[1..].iter().all(|b| b.pulse == PulseType::On));
}

#[test]
fn test_frequency_mode_waits_for_full_window() {
    let harness = Harness::new(HeartRateMonitor::new().with_sample_window_size(64));
    let updates = harness.stream.subscribe().unwrap();
    harness.place_finger(0);

    for frame in &periodic_frames(63, 64, 2, 25, 2000) {
        harness.push(frame);
    }
    assert_eq!(updates.drain(), vec![Bpm::NOT_READY]);
    assert_eq!(harness.stream.stats().processed, 63);
}

#[test]
fn test_flat_signal_never_publishes() {
    let harness = Harness::new(HeartRateMonitor::new());
    let updates = harness.stream.subscribe().unwrap();
    harness.place_finger(0);

    let (r, g, b) = FINGER;
    for i in 0..400 {
        harness.camera.push_rgb(2000 + i * 33, r, g, b);
    }
    assert_eq!(updates.drain(), vec![Bpm::NOT_READY]);
}

#[test]
fn test_fft_estimates_are_deterministic() {
    let frames = with_noise(&periodic_frames(300, 128, 5, 30, 0), 3.0, 7);
    let samples: Vec<Sample> = frames
        .iter()
        .map(|f| Sample::new(f.timestamp_ms, f.red, f.green, f.blue, IntensityMethod::Sum))
        .collect();

    let run = || {
        let kind = EstimatorKind::Frequency {
            window_size: 128,
            history_size: 150,
        };
        let mut estimator = create_estimator(kind).unwrap();
        let mut out = Vec::new();
        for s in &samples {
            estimator.process(s, &mut |bpm| out.push(bpm));
        }
        out
    };

    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first, run());
}

#[test]
fn test_time_domain_mode_counts_sixty_bpm() {
    let harness = Harness::new(HeartRateMonitor::new().with_average_after_seconds(10));
    let updates = harness.stream.subscribe().unwrap();
    harness.place_finger(0);

    for frame in &square_frames(1000, 50, 10_000, 2000) {
        harness.push(frame);
    }

    let events = updates.drain();
    assert_eq!(events[0], Bpm::NOT_READY);
    // Pulse phase events before the first period carry no average yet
    assert!(events[1..events.len() - 1].iter().all(|b| b.value == 0));
    assert!(events.iter().any(|b| b.pulse == PulseType::On));

    let last = events.last().unwrap().value;
    assert!((last - 60).abs() <= 1, "got {last}");
}

#[test]
fn test_time_domain_uses_mean_intensity() {
    let charts = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&charts);
    let harness = Harness::new(
        HeartRateMonitor::new()
            .with_average_after_seconds(5)
            .on_chart_sample(move |v| sink.lock().unwrap().push(v)),
    );
    let _updates = harness.stream.subscribe().unwrap();

    harness.camera.push_rgb(0, 201.7, 40.9, 30.0);
    // trunc((201 + 40) / 2)
    assert_eq!(*charts.lock().unwrap(), vec![120.0]);
}

#[test]
fn test_estimator_reset_clears_state() {
    let mut estimator = create_estimator(EstimatorKind::Frequency {
        window_size: 16,
        history_size: 4,
    })
    .unwrap();
    let frames = periodic_frames(16, 16, 2, 25, 0);
    let mut published = Vec::new();
    for f in &frames {
        let s = Sample::new(f.timestamp_ms, f.red, f.green, f.blue, IntensityMethod::Sum);
        estimator.process(&s, &mut |bpm| published.push(bpm));
    }
    assert_eq!(published.len(), 1);

    estimator.reset();
    published.clear();
    let s = Sample::new(1000, 200.0, 50.0, 30.0, IntensityMethod::Sum);
    estimator.process(&s, &mut |bpm| published.push(bpm));
    assert!(published.is_empty(), "window restarts empty after reset");
}
