//! Bounded FIFO windows.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Count-bounded FIFO: pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct BoundedWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedWindow<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be >= 1");
        Self { items: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Replace the newest entry, or push when empty.
    pub fn replace_last(&mut self, item: T) {
        match self.items.back_mut() {
            Some(last) => *last = item,
            None => self.items.push_back(item),
        }
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &T> + DoubleEndedIterator {
        self.items.iter()
    }
}

/// Time-bounded window of `(timestamp, value)` samples.
///
/// Keeps exactly one sample at or beyond the horizon as the anchor, so the
/// span `newest − oldest` reaches the horizon even with irregular sampling.
/// Past `capacity` samples the second-oldest is dropped: the window thins
/// out but the anchor survives.
#[derive(Debug, Clone)]
pub struct TimeWindow<T> {
    samples: VecDeque<(DateTime<Utc>, T)>,
    horizon: Duration,
    capacity: usize,
}

impl<T> TimeWindow<T> {
    pub fn new(horizon: Duration, capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self { samples: VecDeque::with_capacity(capacity), horizon, capacity }
    }

    pub fn push(&mut self, ts: DateTime<Utc>, item: T) {
        self.samples.push_back((ts, item));
        self.evict_old(ts);
        if self.samples.len() > self.capacity {
            self.samples.remove(1);
        }
    }

    fn evict_old(&mut self, now: DateTime<Utc>) {
        while self.samples.len() >= 2 {
            let second = self.samples[1].0;
            if now - second >= self.horizon {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Oldest retained sample.
    pub fn anchor(&self) -> Option<&(DateTime<Utc>, T)> {
        self.samples.front()
    }

    pub fn latest(&self) -> Option<&(DateTime<Utc>, T)> {
        self.samples.back()
    }

    /// newest − oldest, zero when fewer than two samples.
    pub fn span(&self) -> Duration {
        match (self.samples.front(), self.samples.back()) {
            (Some((first, _)), Some((last, _))) => *last - *first,
            _ => Duration::zero(),
        }
    }

    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
