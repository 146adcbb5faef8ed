//! Bounded sample buffers.
//!
//! Two kinds of buffers live here and they are not interchangeable:
//! [`RollingWindow`] and [`BoundedHistory`] are dense FIFO queues that evict the
//! oldest entry once full, while [`WrappingSlots`] keeps a fixed number of slots
//! and overwrites them by a wrapping index, treating zero slots as unfilled.

use crate::sample::Sample;
use ndarray::Array1;
use std::collections::VecDeque;

/// Owned copy of the window contents, oldest first
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    pub intensities: Array1<f64>,
    pub timestamps: Array1<i64>,
}

impl WindowSnapshot {
    /// Number of samples in the snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.intensities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intensities.is_empty()
    }

    /// Time between the oldest and newest sample in milliseconds
    ///
    /// `None` for an empty snapshot or when the difference overflows.
    #[must_use]
    pub fn span_ms(&self) -> Option<i64> {
        let n = self.timestamps.len();
        if n == 0 {
            return None;
        }
        self.timestamps[n - 1].checked_sub(self.timestamps[0])
    }
}

/// Fixed-capacity FIFO of the most recent samples
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl RollingWindow {
    /// Create an empty window
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Window size must be greater than 0");
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest one once full
    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy intensities and timestamps out of the window
    #[must_use]
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            intensities: self.samples.iter().map(|s| s.intensity).collect(),
            timestamps: self.samples.iter().map(|s| s.timestamp_ms).collect(),
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Fixed-capacity FIFO of recent BPM estimates
#[derive(Debug, Clone)]
pub struct BoundedHistory {
    capacity: usize,
    values: VecDeque<i32>,
}

impl BoundedHistory {
    /// # Panics
    ///
    /// Panics if `capacity` is zero
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "History size must be greater than 0");
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: i32) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Truncating integer mean of all stored values
    #[must_use]
    pub fn mean(&self) -> Option<i32> {
        if self.values.is_empty() {
            return None;
        }
        let sum: i64 = self.values.iter().map(|&v| i64::from(v)).sum();
        i32::try_from(sum / self.values.len() as i64).ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Fixed slot array overwritten by a wrapping index
///
/// Zero slots count as unfilled and are ignored by [`WrappingSlots::mean_non_zero`].
#[derive(Debug, Clone)]
pub struct WrappingSlots {
    slots: Vec<i64>,
    index: usize,
}

impl WrappingSlots {
    /// # Panics
    ///
    /// Panics if `size` is zero
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "Slot count must be greater than 0");
        Self {
            slots: vec![0; size],
            index: 0,
        }
    }

    /// Overwrite the slot at the current index and advance it
    pub fn insert(&mut self, value: i64) {
        if self.index == self.slots.len() {
            self.index = 0;
        }
        self.slots[self.index] = value;
        self.index += 1;
    }

    /// Truncating integer mean of the non-zero slots, 0 when none are filled
    #[must_use]
    pub fn mean_non_zero(&self) -> i64 {
        let (sum, count) = self
            .slots
            .iter()
            .filter(|&&v| v > 0)
            .fold((0i64, 0i64), |(sum, count), &v| (sum + v, count + 1));
        if count > 0 {
            sum / count
        } else {
            0
        }
    }

    #[must_use]
    pub fn slots(&self) -> &[i64] {
        &self.slots
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|v| *v = 0);
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: i64, intensity: f64) -> Sample {
        Sample::with_intensity(ts, 150.0, 50.0, 20.0, intensity)
    }

    #[test]
    fn test_rolling_window_evicts_oldest() {
        let mut window = RollingWindow::new(3);
        for i in 0..5 {
            window.push(sample(i * 10, i as f64));
            assert!(window.len() <= 3);
        }
        assert!(window.is_full());

        let snapshot = window.snapshot();
        assert_eq!(snapshot.intensities.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(snapshot.timestamps.to_vec(), vec![20, 30, 40]);
        assert_eq!(snapshot.span_ms(), Some(20));
    }

    #[test]
    fn test_span_overflow_is_undefined() {
        let mut window = RollingWindow::new(2);
        assert_eq!(window.snapshot().span_ms(), None);
        window.push(sample(i64::MIN, 1.0));
        window.push(sample(1_000, 2.0));
        assert_eq!(window.snapshot().span_ms(), None);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut window = RollingWindow::new(2);
        window.push(sample(0, 1.0));
        let snapshot = window.snapshot();
        window.push(sample(1, 2.0));
        window.push(sample(2, 3.0));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.intensities[0], 1.0);
    }

    #[test]
    fn test_history_mean_truncates() {
        let mut history = BoundedHistory::new(2);
        assert_eq!(history.mean(), None);
        history.push(70);
        history.push(73);
        assert_eq!(history.mean(), Some(71));
        history.push(80);
        // 70 evicted
        assert_eq!(history.mean(), Some(76));
    }

    #[test]
    fn test_wrapping_slots_ignore_unfilled() {
        let mut slots = WrappingSlots::new(3);
        assert_eq!(slots.mean_non_zero(), 0);
        slots.insert(60);
        assert_eq!(slots.mean_non_zero(), 60);
        slots.insert(70);
        assert_eq!(slots.mean_non_zero(), 65);
    }

    #[test]
    fn test_wrapping_slots_overwrite_by_index() {
        let mut slots = WrappingSlots::new(3);
        for v in [10, 20, 30, 40] {
            slots.insert(v);
        }
        assert_eq!(slots.slots(), &[40, 20, 30]);
        slots.insert(0);
        // A zero write clears the slot from the mean
        assert_eq!(slots.slots(), &[40, 0, 30]);
        assert_eq!(slots.mean_non_zero(), 35);
    }

    #[test]
    #[should_panic(expected = "Window size must be greater than 0")]
    fn test_zero_window_panics() {
        let _ = RollingWindow::new(0);
    }
}
