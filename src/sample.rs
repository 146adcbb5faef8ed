//! Per-frame sample values and published results.

use crate::constants::NOT_READY_BPM;
use serde::{Deserialize, Serialize};

/// How the combined intensity of a sample is derived from its colour channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntensityMethod {
    /// `trunc(red + green)`, used by the frequency-domain estimator
    Sum,
    /// `trunc((trunc(red) + trunc(green)) / 2)`, used by the time-domain estimator
    Mean,
}

impl IntensityMethod {
    /// Combine red and green channel averages into one intensity value
    #[must_use]
    pub fn combine(self, red: f64, green: f64) -> f64 {
        match self {
            Self::Sum => (red + green).trunc(),
            Self::Mean => ((red.trunc() + green.trunc()) / 2.0).trunc(),
        }
    }
}

/// Colour averages of one video frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Frame timestamp in milliseconds
    pub timestamp_ms: i64,
    /// Average red channel value (0-255)
    pub red: f64,
    /// Average green channel value (0-255)
    pub green: f64,
    /// Average blue channel value (0-255)
    pub blue: f64,
    /// Combined intensity fed to the estimators
    pub intensity: f64,
}

impl Sample {
    /// Build a sample from channel averages
    #[must_use]
    pub fn new(timestamp_ms: i64, red: f64, green: f64, blue: f64, method: IntensityMethod) -> Self {
        Self {
            timestamp_ms,
            red,
            green,
            blue,
            intensity: method.combine(red, green),
        }
    }

    /// Build a sample with an explicit intensity value
    #[must_use]
    pub fn with_intensity(timestamp_ms: i64, red: f64, green: f64, blue: f64, intensity: f64) -> Self {
        Self {
            timestamp_ms,
            red,
            green,
            blue,
            intensity,
        }
    }
}

/// Phase of the detected pulse waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PulseType {
    Off,
    On,
}

/// A published heart rate estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bpm {
    /// Beats per minute, or -1 when no estimate is available yet
    pub value: i32,
    /// Pulse phase (time-domain) or validity flag (frequency-domain)
    pub pulse: PulseType,
}

impl Bpm {
    /// Sentinel emitted to every subscriber before processing starts
    pub const NOT_READY: Self = Self {
        value: NOT_READY_BPM,
        pulse: PulseType::Off,
    };

    #[must_use]
    pub const fn new(value: i32, pulse: PulseType) -> Self {
        Self { value, pulse }
    }

    /// Whether this is a real estimate rather than the sentinel
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.value != NOT_READY_BPM
    }
}
