//! Frame processing pipeline.
//!
//! Frame sources call into a [`FrameSink`] from their delivery thread. Only one
//! frame is processed at a time: a frame that arrives while another is in
//! flight is dropped on the spot, without touching any state. Admitted frames
//! pass the finger gate and, while a finger is present, reach the session's
//! estimator. Listeners and subscribers are notified after the session lock is
//! released.

use crate::constants::DEBOUNCE_RETRY_MS;
use crate::estimators::Estimator;
use crate::finger_detection::{FingerDetector, FingerState, Transition};
use crate::publisher::Publisher;
use crate::sample::{Bpm, IntensityMethod, Sample};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::utils::yuv;
use log::{debug, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Callback for finger presence edges
pub type PresenceListener = Arc<dyn Fn(bool) + Send + Sync>;
/// Callback for raw channel averages of present samples: (timestamp, red, green, blue)
pub type RawSampleListener = Arc<dyn Fn(i64, f64, f64, f64) + Send + Sync>;
/// Callback for the intensity of every admitted frame
pub type ChartListener = Arc<dyn Fn(f64) + Send + Sync>;

/// Optional side-channel callbacks
#[derive(Clone, Default)]
pub struct Listeners {
    pub finger_presence: Option<PresenceListener>,
    pub raw_sample: Option<RawSampleListener>,
    pub chart_sample: Option<ChartListener>,
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("finger_presence", &self.finger_presence.is_some())
            .field("raw_sample", &self.raw_sample.is_some())
            .field("chart_sample", &self.chart_sample.is_some())
            .finish()
    }
}

/// What happened to a delivered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Another frame was in flight; this one was ignored
    Dropped,
    /// Frame data was malformed and was discarded
    Rejected,
    /// No session is running
    Inactive,
    /// Finger not present; the estimator did not run
    Gated,
    /// The estimator consumed the sample
    Processed,
}

/// Frame counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub processed: u64,
    pub gated: u64,
    pub dropped: u64,
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    gated: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
}

/// Pipeline settings fixed at construction
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub intensity_method: IntensityMethod,
    pub debounce: Duration,
    pub logging_enabled: bool,
}

struct Session {
    id: u64,
    finger: FingerDetector,
    estimator: Box<dyn Estimator>,
    debounce: Option<TimerHandle>,
}

/// Side effects collected under the lock and applied after it is released
#[derive(Default)]
struct Effects {
    chart: Option<f64>,
    presence: Option<bool>,
    raw: Option<Sample>,
    published: Vec<Bpm>,
}

struct Shared {
    busy: AtomicBool,
    session: Mutex<Option<Session>>,
    next_session: AtomicU64,
    publisher: Arc<Publisher>,
    listeners: Listeners,
    scheduler: Arc<dyn Scheduler>,
    settings: PipelineSettings,
    counters: Counters,
}

/// Clears the busy flag when processing ends, even on panic
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Entry point handed to frame sources
#[derive(Clone)]
pub struct FrameSink {
    shared: Arc<Shared>,
}

impl fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSink")
            .field("settings", &self.shared.settings)
            .field("stats", &self.stats())
            .finish()
    }
}

impl FrameSink {
    /// Create an idle pipeline
    #[must_use]
    pub fn new(
        settings: PipelineSettings,
        publisher: Arc<Publisher>,
        listeners: Listeners,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                busy: AtomicBool::new(false),
                session: Mutex::new(None),
                next_session: AtomicU64::new(1),
                publisher,
                listeners,
                scheduler,
                settings,
                counters: Counters::default(),
            }),
        }
    }

    /// Deliver a frame as channel averages
    pub fn deliver_rgb(&self, timestamp_ms: i64, red: f64, green: f64, blue: f64) -> FrameOutcome {
        let sample = Sample::new(timestamp_ms, red, green, blue, self.shared.settings.intensity_method);
        self.deliver(sample)
    }

    /// Deliver a raw NV21 frame
    ///
    /// Malformed buffers are logged and dropped; the pipeline keeps running.
    pub fn deliver_yuv(&self, data: &[u8], width: usize, height: usize, timestamp_ms: i64) -> FrameOutcome {
        let Some(_busy) = self.try_acquire() else {
            return FrameOutcome::Dropped;
        };

        match yuv::average_rgb(data, width, height) {
            Ok(averages) => {
                let sample = averages.to_sample(timestamp_ms, self.shared.settings.intensity_method);
                self.shared.process(sample)
            }
            Err(e) => {
                warn!("Dropping frame at {} ms: {}", timestamp_ms, e);
                self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                FrameOutcome::Rejected
            }
        }
    }

    /// Deliver a fully formed sample
    pub fn deliver(&self, sample: Sample) -> FrameOutcome {
        let Some(_busy) = self.try_acquire() else {
            return FrameOutcome::Dropped;
        };
        self.shared.process(sample)
    }

    fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        let guard = self.shared.acquire_busy();
        if guard.is_none() {
            self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
        }
        guard
    }

    /// Start a session around `estimator`, replacing any previous one
    pub fn begin_session(&self, estimator: Box<dyn Estimator>) {
        let id = self.shared.next_session.fetch_add(1, Ordering::Relaxed);
        info!("Starting session {} with {}", id, estimator.name());
        let previous = self.shared.lock_session().replace(Session {
            id,
            finger: FingerDetector::new(),
            estimator,
            debounce: None,
        });
        if let Some(handle) = previous.and_then(|s| s.debounce) {
            handle.cancel();
        }
    }

    /// End the running session and discard its buffers
    ///
    /// Safe to call repeatedly.
    pub fn end_session(&self) {
        let Some(mut session) = self.shared.lock_session().take() else {
            return;
        };
        session.estimator.reset();
        if let Some(handle) = session.debounce {
            handle.cancel();
        }
        info!("Session {} ended", session.id);
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.lock_session().is_some()
    }

    /// Finger state of the running session
    #[must_use]
    pub fn finger_state(&self) -> Option<FingerState> {
        self.shared.lock_session().as_ref().map(|s| s.finger.state())
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        let c = &self.shared.counters;
        PipelineStats {
            processed: c.processed.load(Ordering::Relaxed),
            gated: c.gated.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
        }
    }
}

impl Shared {
    fn acquire_busy(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        // Session state stays consistent across a listener panic, so recover it
        self.session.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn process(self: &Arc<Self>, sample: Sample) -> FrameOutcome {
        let mut effects = Effects::default();

        let outcome = {
            let mut guard = self.lock_session();
            let Some(session) = guard.as_mut() else {
                return FrameOutcome::Inactive;
            };

            effects.chart = Some(sample.intensity);
            if self.settings.logging_enabled {
                debug!(
                    "frame {} ms: r={:.1} g={:.1} b={:.1} i={}",
                    sample.timestamp_ms, sample.red, sample.green, sample.blue, sample.intensity
                );
            }

            match session.finger.classify(&sample) {
                Transition::DebounceStarted => {
                    session.debounce = Some(self.schedule_debounce(session.id, self.settings.debounce));
                }
                transition => effects.presence = transition.presence_changed(),
            }

            if session.finger.is_present() {
                effects.raw = Some(sample);
                session
                    .estimator
                    .process(&sample, &mut |bpm| effects.published.push(bpm));
                FrameOutcome::Processed
            } else {
                FrameOutcome::Gated
            }
        };

        match outcome {
            FrameOutcome::Processed => self.counters.processed.fetch_add(1, Ordering::Relaxed),
            _ => self.counters.gated.fetch_add(1, Ordering::Relaxed),
        };

        self.apply(effects);
        outcome
    }

    fn schedule_debounce(self: &Arc<Self>, session_id: u64, delay: Duration) -> TimerHandle {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.resolve_debounce(session_id);
                }
            }),
        )
    }

    fn resolve_debounce(self: &Arc<Self>, session_id: u64) {
        // Presence edges must not interleave with a frame's listener calls
        let Some(_busy) = self.acquire_busy() else {
            let mut guard = self.lock_session();
            if let Some(session) = guard.as_mut().filter(|s| s.id == session_id) {
                debug!("Frame in flight, retrying debounce for session {}", session_id);
                session.debounce =
                    Some(self.schedule_debounce(session_id, Duration::from_millis(DEBOUNCE_RETRY_MS)));
            }
            return;
        };

        let transition = {
            let mut guard = self.lock_session();
            match guard.as_mut() {
                Some(session) if session.id == session_id => {
                    session.debounce = None;
                    session.finger.resolve_debounce()
                }
                _ => {
                    debug!("Ignoring debounce from ended session {}", session_id);
                    return;
                }
            }
        };

        if self.settings.logging_enabled {
            debug!("Debounce resolved: {:?}", transition);
        }
        self.apply(Effects {
            presence: transition.presence_changed(),
            ..Effects::default()
        });
    }

    fn apply(&self, effects: Effects) {
        let listeners = &self.listeners;
        if let (Some(intensity), Some(listener)) = (effects.chart, &listeners.chart_sample) {
            listener(intensity);
        }
        if let (Some(present), Some(listener)) = (effects.presence, &listeners.finger_presence) {
            listener(present);
        }
        if let (Some(s), Some(listener)) = (effects.raw, &listeners.raw_sample) {
            listener(s.timestamp_ms, s.red, s.green, s.blue);
        }
        for bpm in effects.published {
            self.publisher.publish(bpm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::{create_estimator, EstimatorKind};
    use crate::scheduler::ManualScheduler;

    fn pipeline(scheduler: Arc<ManualScheduler>, listeners: Listeners) -> (FrameSink, Arc<Publisher>) {
        let publisher = Arc::new(Publisher::new());
        let sink = FrameSink::new(
            PipelineSettings {
                intensity_method: IntensityMethod::Sum,
                debounce: Duration::from_millis(2000),
                logging_enabled: true,
            },
            Arc::clone(&publisher),
            listeners,
            scheduler,
        );
        (sink, publisher)
    }

    fn fft_estimator() -> Box<dyn Estimator> {
        create_estimator(EstimatorKind::Frequency {
            window_size: 8,
            history_size: 150,
        })
        .unwrap()
    }

    #[test]
    fn test_inactive_without_session() {
        let (sink, _) = pipeline(Arc::new(ManualScheduler::new()), Listeners::default());
        assert_eq!(sink.deliver_rgb(0, 200.0, 50.0, 30.0), FrameOutcome::Inactive);
    }

    #[test]
    fn test_gated_until_debounce_fires() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (sink, _) = pipeline(Arc::clone(&scheduler), Listeners::default());
        sink.begin_session(fft_estimator());

        assert_eq!(sink.deliver_rgb(0, 200.0, 50.0, 30.0), FrameOutcome::Gated);
        assert!(matches!(sink.finger_state(), Some(FingerState::Pending { .. })));

        scheduler.advance(Duration::from_millis(2000));
        assert_eq!(sink.finger_state(), Some(FingerState::Present));
        assert_eq!(sink.deliver_rgb(33, 200.0, 50.0, 30.0), FrameOutcome::Processed);
    }

    #[test]
    fn test_late_debounce_after_end_is_ignored() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (sink, _) = pipeline(Arc::clone(&scheduler), Listeners::default());
        sink.begin_session(fft_estimator());
        sink.deliver_rgb(0, 200.0, 50.0, 30.0);
        sink.end_session();
        sink.end_session();

        sink.begin_session(fft_estimator());
        scheduler.advance(Duration::from_secs(5));
        assert_eq!(sink.finger_state(), Some(FingerState::Absent));
    }

    #[test]
    fn test_rejects_malformed_yuv() {
        let (sink, _) = pipeline(Arc::new(ManualScheduler::new()), Listeners::default());
        sink.begin_session(fft_estimator());
        assert_eq!(sink.deliver_yuv(&[0u8; 4], 4, 4, 0), FrameOutcome::Rejected);
        assert_eq!(sink.deliver_yuv(&[], 0, 0, 0), FrameOutcome::Rejected);
        assert_eq!(sink.deliver_yuv(&[0u8; 16], usize::MAX / 2, 4, 0), FrameOutcome::Rejected);
        assert_eq!(sink.stats().rejected, 3);
        // Pipeline keeps accepting frames
        assert_eq!(sink.deliver_rgb(0, 10.0, 10.0, 10.0), FrameOutcome::Gated);
    }
}
