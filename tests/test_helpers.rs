//! Helper functions and utilities for tests

#![allow(dead_code)]

use heart_rate_monitor::monitor::{BpmStream, HeartRateMonitor};
use heart_rate_monitor::scheduler::ManualScheduler;
use heart_rate_monitor::source::{Frame, PushHandle, PushSource};
use heart_rate_monitor::Bpm;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

/// Channel averages of a well-placed fingertip
pub const FINGER: (f64, f64, f64) = (200.0, 50.0, 30.0);

/// Channel averages of an uncovered lens
pub const NO_FINGER: (f64, f64, f64) = (70.0, 80.0, 75.0);

pub const DEBOUNCE_MS: u64 = 2000;

/// A monitor driven by a manual clock and fed through a push source
pub struct Harness {
    pub clock: Arc<ManualScheduler>,
    pub camera: PushHandle,
    pub stream: BpmStream,
}

impl Harness {
    /// Build a harness around a configured monitor
    pub fn new(monitor: HeartRateMonitor) -> Self {
        let clock = Arc::new(ManualScheduler::new());
        let source = PushSource::new();
        let camera = source.handle();
        let stream = monitor
            .with_scheduler(clock.clone())
            .bpm_updates(Box::new(source))
            .expect("valid monitor configuration");
        Self { clock, camera, stream }
    }

    /// Push a valid finger frame and let the debounce timer expire
    pub fn place_finger(&self, timestamp_ms: i64) {
        let (r, g, b) = FINGER;
        self.camera.push_rgb(timestamp_ms, r, g, b);
        self.clock.advance(Duration::from_millis(DEBOUNCE_MS));
    }

    pub fn push(&self, frame: &Frame) {
        self.camera.push_rgb(frame.timestamp_ms, frame.red, frame.green, frame.blue);
    }
}

/// Sinusoidal red channel with exactly `cycles` periods every `n` frames
pub fn periodic_frames(count: usize, n: usize, cycles: usize, step_ms: i64, start_ms: i64) -> Vec<Frame> {
    (0..count)
        .map(|i| {
            let phase = 2.0 * PI * (cycles * i) as f64 / n as f64;
            Frame {
                timestamp_ms: start_ms + i as i64 * step_ms,
                red: 200.0 + 20.0 * phase.sin(),
                green: 50.0,
                blue: 30.0,
            }
        })
        .collect()
}

/// Square wave alternating between two red levels every half period
pub fn square_frames(period_ms: i64, step_ms: i64, duration_ms: i64, start_ms: i64) -> Vec<Frame> {
    (0..=duration_ms / step_ms)
        .map(|i| {
            let t = i * step_ms;
            let red = if t % period_ms < period_ms / 2 { 220.0 } else { 180.0 };
            Frame {
                timestamp_ms: start_ms + t,
                red,
                green: 40.0,
                blue: 30.0,
            }
        })
        .collect()
}

/// Add seeded uniform noise to the red channel
pub fn with_noise(frames: &[Frame], amplitude: f64, seed: u64) -> Vec<Frame> {
    let mut rng = StdRng::seed_from_u64(seed);
    frames
        .iter()
        .map(|f| Frame {
            red: f.red + rng.gen_range(-amplitude..=amplitude),
            ..*f
        })
        .collect()
}

/// Ready values among published events
pub fn ready_values(events: &[Bpm]) -> Vec<i32> {
    events.iter().filter(|b| b.is_ready()).map(|b| b.value).collect()
}
