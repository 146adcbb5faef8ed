//! Heart rate estimators.
//!
//! Both estimators consume present-finger samples one at a time and emit zero
//! or more [`Bpm`] events per sample. Exactly one of them runs per session,
//! chosen from the configuration when the session starts.

/// FFT dominant-frequency estimator
pub mod frequency;

/// Rolling-average threshold crossing estimator
pub mod time_domain;

use crate::sample::{Bpm, IntensityMethod, Sample};
use crate::Result;

/// Trait for all heart rate estimators
pub trait Estimator: Send {
    /// Feed one sample, calling `emit` for every estimate it produces
    fn process(&mut self, sample: &Sample, emit: &mut dyn FnMut(Bpm));

    /// Drop all buffered state
    fn reset(&mut self);

    /// Get estimator name
    fn name(&self) -> &str;
}

/// Operating mode of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorKind {
    /// FFT over a rolling window (default)
    Frequency {
        window_size: usize,
        history_size: usize,
    },
    /// Pulse counting averaged every `averaging_period_seconds`
    TimeDomain { averaging_period_seconds: u32 },
}

impl EstimatorKind {
    /// Intensity combination used by this mode
    #[must_use]
    pub fn intensity_method(self) -> IntensityMethod {
        match self {
            Self::Frequency { .. } => IntensityMethod::Sum,
            Self::TimeDomain { .. } => IntensityMethod::Mean,
        }
    }
}

/// Create an estimator for the given mode
///
/// # Errors
///
/// Returns `Error::EstimatorError` if a size or period is zero
pub fn create_estimator(kind: EstimatorKind) -> Result<Box<dyn Estimator>> {
    match kind {
        EstimatorKind::Frequency {
            window_size,
            history_size,
        } => {
            if window_size < 2 {
                return Err(crate::Error::EstimatorError(format!(
                    "Window size must be at least 2, got {window_size}"
                )));
            }
            if history_size == 0 {
                return Err(crate::Error::EstimatorError(
                    "History size must be greater than 0".to_string(),
                ));
            }
            Ok(Box::new(frequency::FrequencyEstimator::new(window_size, history_size)))
        }
        EstimatorKind::TimeDomain {
            averaging_period_seconds,
        } => {
            if averaging_period_seconds == 0 {
                return Err(crate::Error::EstimatorError(
                    "Averaging period must be greater than 0".to_string(),
                ));
            }
            Ok(Box::new(time_domain::TimeDomainEstimator::new(averaging_period_seconds)))
        }
    }
}
