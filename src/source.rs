//! Frame sources.
//!
//! Camera acquisition lives outside this crate. A [`FrameSource`] is whatever
//! produces per-frame colour averages: a host camera callback
//! ([`PushSource`]), a recorded trace ([`ReplaySource`]), or a generated
//! fingertip signal ([`SyntheticSignal`]).

use crate::pipeline::FrameSink;
use crate::scheduler::ManualScheduler;
use crate::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info, warn};
use std::f64::consts::PI;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Something that delivers frames to a [`FrameSink`] between `start` and `stop`
pub trait FrameSource: Send {
    /// Acquire the underlying resource and begin delivering frames
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameSource` if the resource cannot be acquired
    fn start(&mut self, sink: FrameSink) -> Result<()>;

    /// Stop delivering and release the resource; must be idempotent
    fn stop(&mut self);
}

/// Channel averages of one recorded frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub timestamp_ms: i64,
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

/// Parse a trace with one `timestamp_ms red green blue` frame per line
///
/// Blank lines and lines starting with `#` are skipped. Fields may be
/// separated by whitespace or commas.
///
/// # Errors
///
/// Returns `Error::InvalidInput` naming the first malformed line
pub fn parse_trace(content: &str) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != 4 {
            return Err(Error::InvalidInput(format!(
                "Line {}: expected 4 fields, got {}",
                index + 1,
                fields.len()
            )));
        }

        let bad = |field: &str| Error::InvalidInput(format!("Line {}: invalid value '{}'", index + 1, field));
        let timestamp_ms = fields[0].parse::<i64>().map_err(|_| bad(fields[0]))?;
        let red = fields[1].parse::<f64>().map_err(|_| bad(fields[1]))?;
        let green = fields[2].parse::<f64>().map_err(|_| bad(fields[2]))?;
        let blue = fields[3].parse::<f64>().map_err(|_| bad(fields[3]))?;

        frames.push(Frame {
            timestamp_ms,
            red,
            green,
            blue,
        });
    }
    Ok(frames)
}

/// Fingertip PPG signal generator
#[derive(Debug, Clone, Copy)]
pub struct SyntheticSignal {
    /// Pulse rate of the generated signal
    pub bpm: f64,
    /// Frames per second
    pub fps: f64,
    /// Length of the signal
    pub duration: Duration,
    /// Peak-to-peak swing of the red channel
    pub amplitude: f64,
    /// Mean red channel level
    pub baseline_red: f64,
}

impl Default for SyntheticSignal {
    fn default() -> Self {
        Self {
            bpm: 72.0,
            fps: 30.0,
            duration: Duration::from_secs(30),
            amplitude: 6.0,
            baseline_red: 200.0,
        }
    }
}

impl SyntheticSignal {
    /// Generate frames with a systolic peak and a weaker dicrotic harmonic
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn frames(&self) -> Vec<Frame> {
        let count = (self.duration.as_secs_f64() * self.fps).floor() as usize;
        let beat_hz = self.bpm / 60.0;
        let half = self.amplitude / 2.0;

        (0..count)
            .map(|i| {
                let t = i as f64 / self.fps;
                let phase = 2.0 * PI * beat_hz * t;
                let pulse = half * (0.8 * phase.sin() + 0.2 * (2.0 * phase).sin());
                Frame {
                    timestamp_ms: (t * 1000.0).round() as i64,
                    red: self.baseline_red + pulse,
                    green: 40.0 + pulse * 0.3,
                    blue: 20.0,
                }
            })
            .collect()
    }
}

/// How a replay advances time
#[derive(Clone, Default)]
pub enum Pacing {
    /// Deliver frames back to back
    #[default]
    Immediate,
    /// Sleep between frames to match their timestamps
    RealTime,
    /// Advance a manual scheduler by each frame's timestamp delta
    Clock(Arc<ManualScheduler>),
}

impl fmt::Debug for Pacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => write!(f, "Immediate"),
            Self::RealTime => write!(f, "RealTime"),
            Self::Clock(_) => write!(f, "Clock"),
        }
    }
}

/// Plays a list of frames on a delivery thread
pub struct ReplaySource {
    frames: Arc<Vec<Frame>>,
    pacing: Pacing,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl fmt::Debug for ReplaySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplaySource")
            .field("frames", &self.frames.len())
            .field("pacing", &self.pacing)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

impl ReplaySource {
    #[must_use]
    pub fn new(frames: Vec<Frame>, pacing: Pacing) -> Self {
        let (done_tx, done_rx) = bounded(1);
        Self {
            frames: Arc::new(frames),
            pacing,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            done_tx,
            done_rx,
        }
    }

    /// Load a trace file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P, pacing: Pacing) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::IoError(format!("{}: {}", path.as_ref().display(), e)))?;
        Ok(Self::new(parse_trace(&content)?, pacing))
    }

    /// Signals once when the replay has delivered its last frame or was stopped
    #[must_use]
    pub fn completion(&self) -> Receiver<()> {
        self.done_rx.clone()
    }

    fn run(frames: &[Frame], pacing: &Pacing, running: &AtomicBool, sink: &FrameSink) {
        let mut previous: Option<i64> = None;
        for frame in frames {
            if !running.load(Ordering::Acquire) {
                debug!("Replay stopped early");
                return;
            }

            if let Some(prev) = previous {
                let delta = Duration::from_millis(u64::try_from(frame.timestamp_ms - prev).unwrap_or(0));
                match pacing {
                    Pacing::Immediate => {}
                    Pacing::RealTime => thread::sleep(delta),
                    Pacing::Clock(clock) => clock.advance(delta),
                }
            }
            previous = Some(frame.timestamp_ms);

            sink.deliver_rgb(frame.timestamp_ms, frame.red, frame.green, frame.blue);
        }
        info!("Replay finished after {} frames", frames.len());
    }
}

impl FrameSource for ReplaySource {
    fn start(&mut self, sink: FrameSink) -> Result<()> {
        if self.worker.is_some() {
            return Err(Error::FrameSource("Replay already running".to_string()));
        }
        if self.frames.is_empty() {
            return Err(Error::FrameSource("Replay has no frames".to_string()));
        }

        self.running.store(true, Ordering::Release);
        let frames = Arc::clone(&self.frames);
        let pacing = self.pacing.clone();
        let running = Arc::clone(&self.running);
        let done = self.done_tx.clone();

        let worker = thread::Builder::new()
            .name("hrm-replay".to_string())
            .spawn(move || {
                Self::run(&frames, &pacing, &running, &sink);
                running.store(false, Ordering::Release);
                let _ = done.try_send(());
            })
            .map_err(|e| Error::FrameSource(format!("Failed to spawn replay thread: {e}")))?;

        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Stopping from inside a listener runs on the replay thread itself
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            warn!("Replay thread panicked");
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Source fed by the host, typically from a camera preview callback
///
/// The host keeps a [`PushHandle`] and calls it once per frame; frames pushed
/// while no session is running are ignored.
#[derive(Debug, Clone, Default)]
pub struct PushSource {
    sink: Arc<Mutex<Option<FrameSink>>>,
}

/// Host-side handle of a [`PushSource`]
#[derive(Debug, Clone)]
pub struct PushHandle {
    sink: Arc<Mutex<Option<FrameSink>>>,
}

impl PushSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle used to push frames
    #[must_use]
    pub fn handle(&self) -> PushHandle {
        PushHandle {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl FrameSource for PushSource {
    fn start(&mut self, sink: FrameSink) -> Result<()> {
        let mut slot = self
            .sink
            .lock()
            .map_err(|_| Error::FrameSource("Push source lock poisoned".to_string()))?;
        *slot = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Ok(mut slot) = self.sink.lock() {
            slot.take();
        }
    }
}

impl PushHandle {
    /// Current sink, if a session is running
    #[must_use]
    pub fn sink(&self) -> Option<FrameSink> {
        self.sink.lock().ok().and_then(|s| s.clone())
    }

    /// Push channel averages; `None` when no session is running
    pub fn push_rgb(&self, timestamp_ms: i64, red: f64, green: f64, blue: f64) -> Option<crate::pipeline::FrameOutcome> {
        self.sink().map(|sink| sink.deliver_rgb(timestamp_ms, red, green, blue))
    }

    /// Push a raw NV21 frame; `None` when no session is running
    pub fn push_yuv(
        &self,
        data: &[u8],
        width: usize,
        height: usize,
        timestamp_ms: i64,
    ) -> Option<crate::pipeline::FrameOutcome> {
        self.sink().map(|sink| sink.deliver_yuv(data, width, height, timestamp_ms))
    }
}
