//! Deferred one-shot callbacks for the finger debounce timer.
//!
//! The pipeline never sleeps on the frame delivery thread. It hands the
//! debounce callback to a [`Scheduler`], which runs it later on its own terms.

use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A deferred task
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a scheduled task
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    /// Prevent the task from running if it has not started yet
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs one-shot tasks after a delay
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run once after `delay`
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;
}

/// Scheduler that sleeps on a short-lived background thread per task
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let handle = TimerHandle::default();
        let cancelled = Arc::clone(&handle.cancelled);
        let spawned = thread::Builder::new()
            .name("hrm-debounce".to_string())
            .spawn(move || {
                thread::sleep(delay);
                if !cancelled.load(Ordering::SeqCst) {
                    task();
                }
            });
        if let Err(e) = spawned {
            log::warn!("Failed to spawn debounce timer thread: {}", e);
        }
        handle
    }
}

struct PendingTask {
    due: Duration,
    handle: TimerHandle,
    task: Task,
}

/// Scheduler driven by an explicit clock
///
/// Tasks run only when [`ManualScheduler::advance`] moves the clock past their
/// due time, which makes debounce behaviour deterministic for hosts that derive
/// time from frame timestamps, and for tests.
#[derive(Default)]
pub struct ManualScheduler {
    inner: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    pending: Vec<PendingTask>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock value
    #[must_use]
    pub fn now(&self) -> Duration {
        self.inner.lock().map(|s| s.now).unwrap_or_default()
    }

    /// Number of tasks still waiting (cancelled ones included)
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.lock().map(|s| s.pending.len()).unwrap_or_default()
    }

    /// Move the clock forward and run every task that became due
    ///
    /// Tasks run in due order, outside the scheduler lock, so they may
    /// schedule new tasks.
    pub fn advance(&self, by: Duration) {
        let due = {
            let Ok(mut state) = self.inner.lock() else {
                return;
            };
            state.now += by;
            let now = state.now;
            let (mut due, rest): (Vec<_>, Vec<_>) = state.pending.drain(..).partition(|p| p.due <= now);
            state.pending = rest;
            due.sort_by_key(|p| p.due);
            due
        };

        for pending in due {
            if pending.handle.is_cancelled() {
                debug!("Skipping cancelled task due at {:?}", pending.due);
                continue;
            }
            (pending.task)();
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let handle = TimerHandle::default();
        if let Ok(mut state) = self.inner.lock() {
            let due = state.now + delay;
            state.pending.push(PendingTask {
                due,
                handle: handle.clone(),
                task,
            });
        }
        handle
    }
}
