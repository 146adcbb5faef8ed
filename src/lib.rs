//! Heart rate estimation from fingertip camera video.
//!
//! A fingertip pressed over a lit camera lens changes colour slightly with
//! every heartbeat (photoplethysmography). This library turns per-frame colour
//! averages into beats-per-minute estimates:
//! - Finger presence detection with debounce, so only well-placed fingers count
//! - A rolling window of samples with jitter-compensated sampling rate
//! - An FFT estimator that picks the dominant frequency in the 50-160 BPM band
//! - A time-domain estimator that counts dips below a rolling average
//! - Broadcast delivery of results to any number of subscribers
//!
//! Camera acquisition is left to the host. Frames enter through a
//! [`source::FrameSource`], either as channel averages or as raw NV21 buffers.
//!
//! # Examples
//!
//! ## Pushing frames from a camera callback
//!
//! ```no_run
//! use heart_rate_monitor::{monitor::HeartRateMonitor, source::PushSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = PushSource::new();
//! let camera = source.handle();
//!
//! let stream = HeartRateMonitor::new()
//!     .on_finger_presence_changed(|present| println!("finger present: {present}"))
//!     .bpm_updates(Box::new(source))?;
//! let updates = stream.subscribe()?;
//!
//! // In the camera preview callback:
//! # let (frame, width, height, timestamp_ms) = (vec![0u8; 6], 2, 2, 0);
//! camera.push_yuv(&frame, width, height, timestamp_ms);
//!
//! while let Some(bpm) = updates.try_recv() {
//!     if bpm.is_ready() {
//!         println!("{} bpm", bpm.value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Replaying a synthetic signal
//!
//! ```no_run
//! use heart_rate_monitor::monitor::HeartRateMonitor;
//! use heart_rate_monitor::source::{Pacing, ReplaySource, SyntheticSignal};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frames = SyntheticSignal { bpm: 75.0, ..SyntheticSignal::default() }.frames();
//! let source = ReplaySource::new(frames, Pacing::RealTime);
//!
//! let stream = HeartRateMonitor::new()
//!     .with_average_after_seconds(10)
//!     .bpm_updates(Box::new(source))?;
//! let updates = stream.subscribe()?;
//! while let Some(bpm) = updates.recv() {
//!     println!("{:?}", bpm);
//! }
//! # Ok(())
//! # }
//! ```

/// Per-frame samples and published BPM values
pub mod sample;

/// Finger presence classification and debounce state machine
pub mod finger_detection;

/// Rolling sample windows and averaging buffers
pub mod window;

/// Frequency-domain and time-domain heart rate estimators
pub mod estimators;

/// Broadcast delivery of BPM events
pub mod publisher;

/// Deferred callbacks for the debounce timer
pub mod scheduler;

/// Frame processing with drop-on-busy admission
pub mod pipeline;

/// Frame source abstraction and built-in sources
pub mod source;

/// Measurement sessions and subscriptions
pub mod monitor;

/// Utility functions for frame decoding and numeric conversions
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
pub use monitor::{BpmStream, HeartRateMonitor, Subscription};
pub use sample::{Bpm, PulseType, Sample};
