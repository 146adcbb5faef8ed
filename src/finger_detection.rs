//! Finger presence classification.
//!
//! A fingertip pressed over the lit camera lens turns the frame strongly red.
//! Anything else (no finger, partial cover, ambient light) fails the colour
//! rule below. Presence is debounced on arrival and dropped immediately on
//! removal.

use crate::constants::{MIN_RED_AVG_VALUE, OTHER_COLOR_MAX_VALUE};
use crate::sample::Sample;

/// Debounced finger presence state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerState {
    /// No valid finger
    Absent,
    /// A valid sample arrived at `since_ms`; waiting for the debounce timer
    Pending { since_ms: i64 },
    /// Samples flow to the estimator
    Present,
}

/// Result of feeding a sample (or a timer expiry) to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed
    Unchanged,
    /// Absent -> Pending; the caller must schedule the debounce timer
    DebounceStarted,
    /// Pending -> Absent after the timer found the latest sample invalid
    DebounceFailed,
    /// Pending -> Present
    Detected,
    /// Present -> Absent
    Lost,
}

impl Transition {
    /// New presence value for Absent/Present edges, `None` otherwise
    #[must_use]
    pub fn presence_changed(self) -> Option<bool> {
        match self {
            Self::Detected => Some(true),
            Self::Lost => Some(false),
            _ => None,
        }
    }
}

/// Check whether a sample looks like a well-placed fingertip
#[must_use]
pub fn is_valid(sample: &Sample) -> bool {
    let Sample { red, green, blue, .. } = *sample;
    !(red < MIN_RED_AVG_VALUE
        || green > red
        || blue > red
        || blue > OTHER_COLOR_MAX_VALUE
        || green > OTHER_COLOR_MAX_VALUE)
}

/// Debounced finger presence state machine
#[derive(Debug, Clone)]
pub struct FingerDetector {
    state: FingerState,
    latest: Option<Sample>,
}

impl Default for FingerDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerDetector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: FingerState::Absent,
            latest: None,
        }
    }

    /// Feed one sample
    pub fn classify(&mut self, sample: &Sample) -> Transition {
        self.latest = Some(*sample);
        let valid = is_valid(sample);

        match self.state {
            FingerState::Present if !valid => {
                self.state = FingerState::Absent;
                Transition::Lost
            }
            FingerState::Absent if valid => {
                self.state = FingerState::Pending {
                    since_ms: sample.timestamp_ms,
                };
                Transition::DebounceStarted
            }
            // Pending accepts everything until the timer fires
            _ => Transition::Unchanged,
        }
    }

    /// Settle a pending state using the latest sample seen
    pub fn resolve_debounce(&mut self) -> Transition {
        if !matches!(self.state, FingerState::Pending { .. }) {
            return Transition::Unchanged;
        }

        if self.latest.as_ref().is_some_and(is_valid) {
            self.state = FingerState::Present;
            Transition::Detected
        } else {
            self.state = FingerState::Absent;
            Transition::DebounceFailed
        }
    }

    #[must_use]
    pub fn state(&self) -> FingerState {
        self.state
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.state == FingerState::Present
    }

    pub fn reset(&mut self) {
        self.state = FingerState::Absent;
        self.latest = None;
    }
}
