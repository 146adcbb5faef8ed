//! Broadcast delivery of BPM events.
//!
//! Every subscriber owns an unbounded channel, so publishing never blocks the
//! frame pipeline. Subscribers that hang up are pruned on the next publish.

use crate::sample::Bpm;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifier of one subscriber
pub type SubscriberId = u64;

/// Fan-out channel of [`Bpm`] values
#[derive(Debug, Default)]
pub struct Publisher {
    subscribers: Mutex<Vec<(SubscriberId, Sender<Bpm>)>>,
    next_id: AtomicU64,
}

impl Publisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<(SubscriberId, Sender<Bpm>)>> {
        // The list stays valid across a panicking holder, so recover it
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a subscriber; its first event is always [`Bpm::NOT_READY`]
    pub fn subscribe(&self) -> (SubscriberId, Receiver<Bpm>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded();
        // The receiver is alive, so this send cannot fail
        let _ = tx.send(Bpm::NOT_READY);
        self.lock_subscribers().push((id, tx));
        (id, rx)
    }

    /// Remove a subscriber, returning how many remain
    pub fn unsubscribe(&self, id: SubscriberId) -> usize {
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len()
    }

    /// Send a value to every subscriber in publish order
    pub fn publish(&self, bpm: Bpm) {
        self.lock_subscribers().retain(|(id, tx)| {
            let alive = tx.send(bpm).is_ok();
            if !alive {
                debug!("Dropping disconnected subscriber {}", id);
            }
            alive
        });
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }
}
