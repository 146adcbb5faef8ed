//! Frequency-domain heart rate estimation.
//!
//! Once the rolling window is full, every new sample triggers an FFT over the
//! window. The strongest bin inside the physiological band becomes the
//! instantaneous BPM, which is smoothed by averaging a trailing history.

use super::Estimator;
use crate::constants::{
    MAX_BAND_BPM, MIN_BAND_BPM, MIN_PEAK_MAGNITUDE, MS_PER_SECOND, SECONDS_PER_MINUTE,
};
use crate::sample::{Bpm, PulseType, Sample};
use crate::utils::safe_cast::{round_to_i32, round_to_index};
use crate::window::{BoundedHistory, RollingWindow, WindowSnapshot};
use log::debug;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Dominant in-band frequency of one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakEstimate {
    /// Effective sampling rate in samples per second
    pub sampling_rate: f64,
    /// Index of the strongest bin
    pub bin: usize,
    /// Magnitude of the strongest bin
    pub magnitude: f64,
    /// Bin frequency in beats per minute
    pub bpm: i32,
}

/// Why a window produced no estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Timestamps span no time, so the sampling rate is undefined
    UndefinedRate,
    /// The band maps to no bins at this sampling rate
    EmptyBand,
    /// The peak is too weak to be a pulse
    WeakPeak(f64),
}

/// Effective sampling rate of a snapshot, `None` if it spans no time
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sampling_rate(snapshot: &WindowSnapshot) -> Option<f64> {
    let span_s = snapshot.span_ms()? as f64 / MS_PER_SECOND;
    let fs = snapshot.len() as f64 / span_s;
    (fs.is_finite() && fs > 0.0).then_some(fs)
}

/// Find the strongest in-band FFT bin of a snapshot
///
/// `fft` must be planned for `snapshot.len()` points.
///
/// # Errors
///
/// Returns the [`Rejection`] reason when no estimate can be published
#[allow(clippy::cast_precision_loss)]
pub fn dominant_frequency(
    snapshot: &WindowSnapshot,
    fft: &dyn Fft<f64>,
) -> std::result::Result<PeakEstimate, Rejection> {
    let n = snapshot.len();
    let fs = sampling_rate(snapshot).ok_or(Rejection::UndefinedRate)?;
    let size = n as f64;

    let mut spectrum: Vec<Complex64> = snapshot
        .intensities
        .iter()
        .map(|&v| Complex64::new(v, 0.0))
        .collect();
    fft.process(&mut spectrum);

    let low = round_to_index(size * MIN_BAND_BPM / SECONDS_PER_MINUTE / fs)
        .map_err(|_| Rejection::EmptyBand)?;
    let high = round_to_index(size * MAX_BAND_BPM / SECONDS_PER_MINUTE / fs)
        .map_err(|_| Rejection::EmptyBand)?
        .min(n / 2 + 1);
    if low >= high {
        return Err(Rejection::EmptyBand);
    }

    let mut best_bin = 0;
    let mut best_magnitude = 0.0;
    for (bin, value) in spectrum.iter().enumerate().take(high).skip(low) {
        let magnitude = value.norm();
        if magnitude > best_magnitude {
            best_magnitude = magnitude;
            best_bin = bin;
        }
    }

    if best_magnitude < MIN_PEAK_MAGNITUDE {
        return Err(Rejection::WeakPeak(best_magnitude));
    }

    let bpm = round_to_i32(best_bin as f64 * fs * SECONDS_PER_MINUTE / size)
        .map_err(|_| Rejection::UndefinedRate)?;

    Ok(PeakEstimate {
        sampling_rate: fs,
        bin: best_bin,
        magnitude: best_magnitude,
        bpm,
    })
}

/// FFT-based estimator with history smoothing
pub struct FrequencyEstimator {
    window: RollingWindow,
    history: BoundedHistory,
    fft: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for FrequencyEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrequencyEstimator")
            .field("window", &self.window.len())
            .field("capacity", &self.window.capacity())
            .field("history", &self.history.len())
            .finish()
    }
}

impl FrequencyEstimator {
    /// Create a new frequency-domain estimator
    ///
    /// # Panics
    ///
    /// Panics if `window_size` or `history_size` is zero
    #[must_use]
    pub fn new(window_size: usize, history_size: usize) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(window_size);
        Self {
            window: RollingWindow::new(window_size),
            history: BoundedHistory::new(history_size),
            fft,
        }
    }

    /// Number of samples currently buffered
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.window.len()
    }

    #[must_use]
    pub fn is_window_full(&self) -> bool {
        self.window.is_full()
    }
}

impl Estimator for FrequencyEstimator {
    fn process(&mut self, sample: &Sample, emit: &mut dyn FnMut(Bpm)) {
        self.window.push(*sample);
        if !self.window.is_full() {
            return;
        }

        let snapshot = self.window.snapshot();
        match dominant_frequency(&snapshot, self.fft.as_ref()) {
            Ok(peak) => {
                debug!(
                    "bpm={} (bin {}, magnitude {:.1}, fs {:.2})",
                    peak.bpm, peak.bin, peak.magnitude, peak.sampling_rate
                );
                self.history.push(peak.bpm);
                if let Some(average) = self.history.mean() {
                    emit(Bpm::new(average, PulseType::On));
                }
            }
            Err(Rejection::WeakPeak(magnitude)) => {
                debug!("Peak magnitude {:.1} below floor, skipping", magnitude);
            }
            Err(reason) => {
                debug!("No estimate for window: {:?}", reason);
            }
        }
    }

    fn reset(&mut self) {
        self.window.clear();
        self.history.clear();
    }

    fn name(&self) -> &str {
        "FrequencyEstimator"
    }
}
