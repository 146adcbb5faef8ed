//! Time-domain heart rate estimation.
//!
//! Each sample is compared against the mean of the last few intensities. A dip
//! below the mean marks the pulse as `On`, a rise above it marks it `Off`, and
//! every `Off -> On` edge counts as a beat. Beats are converted to BPM once per
//! averaging period and smoothed over the last three periods.

use super::Estimator;
use crate::constants::{
    AVERAGE_ARRAY_SIZE, BEATS_ARRAY_SIZE, MAX_PLAUSIBLE_BPM, MIN_PLAUSIBLE_BPM, MS_PER_SECOND,
    SECONDS_PER_MINUTE,
};
use crate::sample::{Bpm, PulseType, Sample};
use crate::utils::safe_cast::{f64_to_i32, round_to_i32};
use crate::window::WrappingSlots;
use log::debug;

/// Threshold-crossing pulse counter
#[derive(Debug, Clone)]
pub struct TimeDomainEstimator {
    averaging_period_s: f64,
    recent: WrappingSlots,
    periods: WrappingSlots,
    beats: u32,
    period_start_ms: Option<i64>,
    pulse: PulseType,
    previous_average: i32,
}

impl TimeDomainEstimator {
    /// Create a new estimator averaging every `averaging_period_seconds`
    #[must_use]
    pub fn new(averaging_period_seconds: u32) -> Self {
        Self {
            averaging_period_s: f64::from(averaging_period_seconds),
            recent: WrappingSlots::new(AVERAGE_ARRAY_SIZE),
            periods: WrappingSlots::new(BEATS_ARRAY_SIZE),
            beats: 0,
            period_start_ms: None,
            pulse: PulseType::Off,
            previous_average: 0,
        }
    }

    /// Current pulse phase
    #[must_use]
    pub fn pulse(&self) -> PulseType {
        self.pulse
    }

    /// Beats counted in the current averaging period
    #[must_use]
    pub fn beats(&self) -> u32 {
        self.beats
    }

    /// Smoothed BPM of the last completed period, 0 before the first one
    #[must_use]
    pub fn previous_average(&self) -> i32 {
        self.previous_average
    }

    fn restart_period(&mut self, now_ms: i64) {
        self.beats = 0;
        self.period_start_ms = Some(now_ms);
    }

    fn close_period(&mut self, now_ms: i64, elapsed_s: f64, emit: &mut dyn FnMut(Bpm)) {
        let bpm = match round_to_i32(f64::from(self.beats) / elapsed_s * SECONDS_PER_MINUTE) {
            Ok(bpm) => bpm,
            Err(e) => {
                debug!("Discarding period: {}", e);
                self.restart_period(now_ms);
                return;
            }
        };

        if !(MIN_PLAUSIBLE_BPM..=MAX_PLAUSIBLE_BPM).contains(&bpm) {
            debug!("Discarding implausible period: {} bpm from {} beats", bpm, self.beats);
            self.restart_period(now_ms);
            return;
        }

        self.periods.insert(i64::from(bpm));
        let average = i32::try_from(self.periods.mean_non_zero()).unwrap_or(bpm);
        debug!("Period closed: {} bpm, average {}", bpm, average);

        self.previous_average = average;
        emit(Bpm::new(average, self.pulse));
        self.restart_period(now_ms);
    }
}

impl Estimator for TimeDomainEstimator {
    fn process(&mut self, sample: &Sample, emit: &mut dyn FnMut(Bpm)) {
        let intensity = match f64_to_i32(sample.intensity) {
            Ok(v) => i64::from(v),
            Err(e) => {
                debug!("Skipping sample: {}", e);
                return;
            }
        };
        let start_ms = *self.period_start_ms.get_or_insert(sample.timestamp_ms);

        let rolling_average = self.recent.mean_non_zero();
        let pulse = if intensity < rolling_average {
            PulseType::On
        } else if intensity > rolling_average {
            PulseType::Off
        } else {
            self.pulse
        };

        if self.pulse == PulseType::Off && pulse == PulseType::On {
            self.beats += 1;
        }
        self.recent.insert(intensity);

        if pulse != self.pulse {
            self.pulse = pulse;
            emit(Bpm::new(self.previous_average, pulse));
        }

        let Some(elapsed_ms) = sample.timestamp_ms.checked_sub(start_ms) else {
            debug!("Timestamp {} unusable against period start {}", sample.timestamp_ms, start_ms);
            self.restart_period(sample.timestamp_ms);
            return;
        };
        #[allow(clippy::cast_precision_loss)]
        let elapsed_s = elapsed_ms as f64 / MS_PER_SECOND;
        if elapsed_s > 0.0 && elapsed_s >= self.averaging_period_s {
            self.close_period(sample.timestamp_ms, elapsed_s, emit);
        }
    }

    fn reset(&mut self) {
        self.recent.clear();
        self.periods.clear();
        self.beats = 0;
        self.period_start_ms = None;
        self.pulse = PulseType::Off;
        self.previous_average = 0;
    }

    fn name(&self) -> &str {
        "TimeDomainEstimator"
    }
}
