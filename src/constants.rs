//! Constants used throughout the library

/// Minimum average red value for a covered, illuminated fingertip
pub const MIN_RED_AVG_VALUE: f64 = 120.0;

/// Maximum average green or blue value for a covered fingertip
pub const OTHER_COLOR_MAX_VALUE: f64 = 90.0;

/// Time a finger must stay in place before it counts as present
pub const DEFAULT_FINGER_DEBOUNCE_MS: u64 = 2000;

/// Delay before a debounce timer retries while a frame is in flight (milliseconds)
pub const DEBOUNCE_RETRY_MS: u64 = 10;

/// Default rolling window length (FFT size)
pub const DEFAULT_SAMPLE_WINDOW_SIZE: usize = 128;

/// Default number of BPM estimates kept for smoothing
pub const DEFAULT_BPM_HISTORY_SIZE: usize = 150;

/// Physiological band scanned by the frequency-domain estimator
pub const MIN_BAND_BPM: f64 = 50.0;
pub const MAX_BAND_BPM: f64 = 160.0;

/// FFT peaks weaker than this are treated as noise
pub const MIN_PEAK_MAGNITUDE: f64 = 30.0;

/// Slot counts of the time-domain wrapping arrays
pub const AVERAGE_ARRAY_SIZE: usize = 6;
pub const BEATS_ARRAY_SIZE: usize = 3;

/// Plausible range for a time-domain averaging window
pub const MIN_PLAUSIBLE_BPM: i32 = 40;
pub const MAX_PLAUSIBLE_BPM: i32 = 180;

/// Value published before any estimate is available
pub const NOT_READY_BPM: i32 = -1;

/// Milliseconds per second
pub const MS_PER_SECOND: f64 = 1000.0;

/// Seconds per minute
pub const SECONDS_PER_MINUTE: f64 = 60.0;
