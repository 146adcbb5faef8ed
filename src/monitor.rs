//! Heart rate monitor sessions.
//!
//! [`HeartRateMonitor`] collects configuration and listeners, then binds a
//! [`FrameSource`] into a [`BpmStream`]. Subscribing to the stream starts the
//! session: the subscriber first receives [`Bpm::NOT_READY`], then the source
//! is started. When the last subscription goes away the source is stopped and
//! every buffer is dropped.

use crate::config::Config;
use crate::pipeline::{FrameSink, Listeners, PipelineSettings, PipelineStats};
use crate::publisher::{Publisher, SubscriberId};
use crate::sample::Bpm;
use crate::scheduler::{Scheduler, ThreadScheduler};
use crate::source::FrameSource;
use crate::{Error, Result};
use crossbeam_channel::Receiver;
use log::{info, warn};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Builder for heart rate measurement sessions
pub struct HeartRateMonitor {
    config: Config,
    listeners: Listeners,
    scheduler: Arc<dyn Scheduler>,
}

impl fmt::Debug for HeartRateMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartRateMonitor")
            .field("config", &self.config)
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl Default for HeartRateMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartRateMonitor {
    /// Monitor with default configuration (frequency-domain mode)
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            listeners: Listeners::default(),
            scheduler: Arc::new(ThreadScheduler),
        }
    }

    /// Switch to time-domain mode, averaging every `seconds`
    #[must_use]
    pub fn with_average_after_seconds(mut self, seconds: u32) -> Self {
        self.config.averaging_period_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_sample_window_size(mut self, size: usize) -> Self {
        self.config.sample_window_size = size;
        self
    }

    #[must_use]
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.config.debounce_ms = debounce_ms;
        self
    }

    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.config.logging_enabled = enabled;
        self
    }

    /// Replace the scheduler that runs the finger debounce timer
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Called with `true`/`false` whenever a finger is detected or removed
    #[must_use]
    pub fn on_finger_presence_changed<F>(mut self, listener: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.listeners.finger_presence = Some(Arc::new(listener));
        self
    }

    /// Called with (timestamp, red, green, blue) for every present sample
    #[must_use]
    pub fn on_raw_sample<F>(mut self, listener: F) -> Self
    where
        F: Fn(i64, f64, f64, f64) + Send + Sync + 'static,
    {
        self.listeners.raw_sample = Some(Arc::new(listener));
        self
    }

    /// Called with the intensity of every admitted frame
    #[must_use]
    pub fn on_chart_sample<F>(mut self, listener: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.listeners.chart_sample = Some(Arc::new(listener));
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bind a frame source; nothing starts until the stream is subscribed
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the configuration is invalid
    pub fn bpm_updates(self, source: Box<dyn FrameSource>) -> Result<BpmStream> {
        self.config.validate()?;

        let publisher = Arc::new(Publisher::new());
        let sink = FrameSink::new(
            PipelineSettings {
                intensity_method: self.config.intensity_method(),
                debounce: self.config.debounce(),
                logging_enabled: self.config.logging_enabled,
            },
            Arc::clone(&publisher),
            self.listeners,
            self.scheduler,
        );

        Ok(BpmStream {
            inner: Arc::new(StreamInner {
                config: self.config,
                publisher,
                sink,
                lifecycle: Mutex::new(Lifecycle { source, active: false }),
            }),
        })
    }
}

struct Lifecycle {
    source: Box<dyn FrameSource>,
    active: bool,
}

struct StreamInner {
    config: Config,
    publisher: Arc<Publisher>,
    sink: FrameSink,
    lifecycle: Mutex<Lifecycle>,
}

impl StreamInner {
    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn start(&self, lifecycle: &mut Lifecycle) -> Result<()> {
        let estimator = self.config.create_estimator()?;
        self.sink.begin_session(estimator);

        if let Err(e) = lifecycle.source.start(self.sink.clone()) {
            warn!("Frame source failed to start: {}", e);
            self.sink.end_session();
            return Err(match e {
                Error::FrameSource(_) => e,
                other => Error::FrameSource(other.to_string()),
            });
        }

        lifecycle.active = true;
        info!("Measurement started");
        Ok(())
    }

    fn teardown(&self, lifecycle: &mut Lifecycle) {
        if !lifecycle.active {
            return;
        }
        lifecycle.source.stop();
        self.sink.end_session();
        lifecycle.active = false;
        info!("Measurement stopped");
    }

    fn release(&self, id: SubscriberId) {
        let mut lifecycle = self.lock_lifecycle();
        if self.publisher.unsubscribe(id) == 0 {
            self.teardown(&mut lifecycle);
        }
    }
}

/// A frame source bound to a monitor configuration
#[derive(Clone)]
pub struct BpmStream {
    inner: Arc<StreamInner>,
}

impl fmt::Debug for BpmStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BpmStream")
            .field("config", &self.inner.config)
            .field("subscribers", &self.inner.publisher.subscriber_count())
            .field("active", &self.is_active())
            .finish()
    }
}

impl BpmStream {
    /// Subscribe to BPM events, starting the session if it is not running
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameSource` if the source cannot be started. The
    /// session stays idle; call `subscribe` again to retry.
    pub fn subscribe(&self) -> Result<Subscription> {
        let mut lifecycle = self.inner.lock_lifecycle();
        let (id, receiver) = self.inner.publisher.subscribe();

        if !lifecycle.active {
            if let Err(e) = self.inner.start(&mut lifecycle) {
                self.inner.publisher.unsubscribe(id);
                return Err(e);
            }
        }

        Ok(Subscription {
            id,
            receiver,
            stream: Some(Arc::clone(&self.inner)),
        })
    }

    /// Stop the session regardless of subscribers
    ///
    /// Existing subscriptions stay connected but receive nothing until a new
    /// subscription restarts the session.
    pub fn shutdown(&self) {
        let mut lifecycle = self.inner.lock_lifecycle();
        self.inner.teardown(&mut lifecycle);
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.lock_lifecycle().active
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.publisher.subscriber_count()
    }

    /// Frame counters of the pipeline
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.inner.sink.stats()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

/// Receiving end of a [`BpmStream`]; dropping it unsubscribes
pub struct Subscription {
    id: SubscriberId,
    receiver: Receiver<Bpm>,
    stream: Option<Arc<StreamInner>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl Subscription {
    /// Block until the next event; `None` once the stream is gone
    pub fn recv(&self) -> Option<Bpm> {
        self.receiver.recv().ok()
    }

    /// Next event if one is queued
    pub fn try_recv(&self) -> Option<Bpm> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Bpm> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Drain every queued event
    pub fn drain(&self) -> Vec<Bpm> {
        self.receiver.try_iter().collect()
    }

    /// Underlying channel, for use with `crossbeam_channel::select!`
    #[must_use]
    pub fn receiver(&self) -> &Receiver<Bpm> {
        &self.receiver
    }

    /// Unsubscribe now; the last subscriber tears the session down
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
