//! Bounded, drop-oldest queue shared by the readings queue, the
//! notification queue and each event-bus subscriber's inbox.
//!
//! Grounded on the teacher's non-blocking `try_send`-and-drop pattern in
//! `Transmitter`/`FeedbackLoop`, generalized from "drop the new item" to
//! "drop the oldest queued item" per the specification's stated rationale:
//! staleness is worse than loss for alarm evaluation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

/// A bounded MPSC-style queue. `push` never blocks: when full, the oldest
/// queued item is evicted to make room and the drop counter is incremented.
pub struct BoundedDropOldest<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    dropped: AtomicU64,
}

impl<T> BoundedDropOldest<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
            }),
            not_empty: Condvar::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Push a new item. Evicts the oldest queued item first if at capacity.
    /// Returns `true` when an eviction happened, so callers that track a
    /// drop counter of their own (e.g. readings dropped) know to bump it.
    pub fn push(&self, item: T) -> bool {
        let mut guard = self.inner.lock();
        let evicted = if guard.items.len() >= guard.capacity {
            guard.items.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        };
        guard.items.push_back(item);
        drop(guard);
        self.not_empty.notify_one();
        evicted
    }

    /// Pop the oldest item, blocking up to `timeout` while the queue is
    /// empty and not closed. Returns `None` on timeout or once the queue is
    /// closed and drained.
    pub fn pop_timeout(&self, timeout: std::time::Duration) -> Option<T> {
        let mut guard = self.inner.lock();
        if guard.items.is_empty() && !guard.closed {
            let result = self.not_empty.wait_for(&mut guard, timeout);
            if result.timed_out() && guard.items.is_empty() {
                return None;
            }
        }
        guard.items.pop_front()
    }

    /// Pop without blocking; returns `None` immediately if empty.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Marks the queue closed and wakes any blocked poppers so shutdown can
    /// proceed without waiting out the full timeout.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.not_empty.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn drops_oldest_on_overflow() {
        let q: BoundedDropOldest<i32> = BoundedDropOldest::new(4);
        for i in 0..8 {
            q.push(i);
        }
        assert_eq!(q.len(), 4);
        assert_eq!(q.dropped_count(), 4);
        // the four most recent values should have survived, in order
        let mut collected = Vec::new();
        while let Some(v) = q.try_pop() {
            collected.push(v);
        }
        assert_eq!(collected, vec![4, 5, 6, 7]);
    }

    #[test]
    fn concurrent_flood_never_deadlocks_and_respects_capacity() {
        let q = Arc::new(BoundedDropOldest::<u64>::new(16));
        let mut handles = Vec::new();
        for t in 0..4 {
            let q = q.clone();
            handles.push(thread::spawn(move || {
                for i in 0..160u64 {
                    q.push(t * 1000 + i);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(q.len(), 16);
        assert!(q.dropped_count() >= (4 * 160 - 16) as u64);
    }

    #[test]
    fn pop_timeout_returns_none_when_empty() {
        let q: BoundedDropOldest<i32> = BoundedDropOldest::new(2);
        let start = std::time::Instant::now();
        let result = q.pop_timeout(std::time::Duration::from_millis(30));
        assert!(result.is_none());
        assert!(start.elapsed() >= std::time::Duration::from_millis(25));
    }
}
