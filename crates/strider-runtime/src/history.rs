//! [`BoundedHistory`] – fixed-capacity sample window.
//!
//! The window is always exactly `capacity` samples long.  A fresh (or
//! cleared) history is padded with a fill sample; appending pushes the
//! oldest entry out.  [`BoundedHistory::valid_count`] tracks how many of the
//! entries were actually appended since the last clear.
//!
//! # Example
//!
//! ```rust
//! use strider_runtime::history::BoundedHistory;
//!
//! let mut history = BoundedHistory::new(3, 0);
//! history.append(7);
//! assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![0, 0, 7]);
//! assert_eq!(history.valid_count(), 1);
//! assert_eq!(history.latest(), Some(&7));
//! ```

use std::collections::VecDeque;

/// Default window length for action and velocity histories.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

// ─────────────────────────────────────────────────────────────────────────────
// BoundedHistory
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed-length window of the most recent samples, oldest first.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T: Clone> {
    samples: VecDeque<T>,
    fill: T,
    capacity: usize,
    valid: usize,
}

impl<T: Clone> BoundedHistory<T> {
    /// Create a history of `capacity` entries, all set to `fill`.
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize, fill: T) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: std::iter::repeat_n(fill.clone(), capacity).collect(),
            fill,
            capacity,
            valid: 0,
        }
    }

    /// Push `sample` as the newest entry, evicting the oldest.
    pub fn append(&mut self, sample: T) {
        self.samples.pop_front();
        self.samples.push_back(sample);
        self.valid = (self.valid + 1).min(self.capacity);
    }

    /// Reset every entry to the fill sample.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.samples
            .extend(std::iter::repeat_n(self.fill.clone(), self.capacity));
        self.valid = 0;
    }

    /// All entries, oldest to newest, padding included.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.samples.iter()
    }

    /// Only the appended entries, oldest to newest.
    pub fn valid_iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.samples.range(self.capacity - self.valid..)
    }

    /// Newest appended entry, or `None` when nothing has been appended.
    pub fn latest(&self) -> Option<&T> {
        if self.valid == 0 {
            None
        } else {
            self.samples.back()
        }
    }

    /// Always equal to [`capacity`](Self::capacity).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn valid_count(&self) -> usize {
        self.valid
    }

    /// `true` when no sample has been appended since the last clear.
    pub fn is_empty(&self) -> bool {
        self.valid == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_history_is_padded() {
        let h = BoundedHistory::new(DEFAULT_HISTORY_CAPACITY, -1);
        assert_eq!(h.len(), 20);
        assert_eq!(h.capacity(), 20);
        assert_eq!(h.valid_count(), 0);
        assert!(h.is_empty());
        assert!(h.iter().all(|&v| v == -1));
        assert_eq!(h.latest(), None);
        assert_eq!(h.valid_iter().count(), 0);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut h = BoundedHistory::new(DEFAULT_HISTORY_CAPACITY, 0);
        for i in 1..=25 {
            h.append(i);
        }
        assert_eq!(h.len(), 20);
        assert_eq!(h.valid_count(), 20);
        let kept: Vec<i32> = h.iter().copied().collect();
        assert_eq!(kept, (6..=25).collect::<Vec<_>>());
        assert_eq!(h.latest(), Some(&25));
    }

    #[test]
    fn valid_iter_skips_padding() {
        let mut h = BoundedHistory::new(5, 0);
        h.append(10);
        h.append(20);
        assert_eq!(h.valid_iter().copied().collect::<Vec<_>>(), vec![10, 20]);
        assert_eq!(h.valid_iter().rev().next(), Some(&20));
    }

    #[test]
    fn clear_restores_padding() {
        let mut h = BoundedHistory::new(4, 'x');
        h.append('a');
        h.append('b');
        h.clear();
        assert_eq!(h.len(), 4);
        assert!(h.is_empty());
        assert!(h.iter().all(|&c| c == 'x'));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut h = BoundedHistory::new(0, 0u8);
        assert_eq!(h.capacity(), 1);
        h.append(3);
        h.append(4);
        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![4]);
        assert_eq!(h.valid_count(), 1);
    }
}
