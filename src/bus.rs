//! In-process publish/subscribe event bus: §4.6 of the specification.
//!
//! `publish` is synchronous from the caller's thread but never blocks on a
//! subscriber's behalf: each subscriber owns a [`BoundedDropOldest`] inbox
//! (the per-subscriber bounded queue strategy sanctioned by §9), so a slow
//! or wedged subscriber only ever loses its own oldest queued events, never
//! stalls the publisher. The subscriber list itself is guarded by a short
//! `parking_lot::Mutex`, never held during dispatch — mirroring how the
//! teacher's `SyncManager` only ever holds its mutex for the duration of one
//! field update.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::model::AlarmEvent;
use crate::queue::BoundedDropOldest;

const SUBSCRIBER_INBOX_CAPACITY: usize = 256;

/// A subscriber's handle for draining its own inbox.
pub struct Subscription {
    inbox: Arc<BoundedDropOldest<AlarmEvent>>,
}

impl Subscription {
    pub fn recv_timeout(&self, timeout: Duration) -> Option<AlarmEvent> {
        self.inbox.pop_timeout(timeout)
    }

    pub fn try_recv(&self) -> Option<AlarmEvent> {
        self.inbox.try_pop()
    }
}

pub struct EventBus {
    subscribers: Mutex<Vec<Arc<BoundedDropOldest<AlarmEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new subscriber and returns its handle. Subscribers never
    /// unregister in this design — the pipeline's subscriber set is fixed at
    /// wiring time.
    pub fn subscribe(&self) -> Subscription {
        let inbox = Arc::new(BoundedDropOldest::new(SUBSCRIBER_INBOX_CAPACITY));
        self.subscribers.lock().push(inbox.clone());
        Subscription { inbox }
    }

    /// Dispatches `event` to every current subscriber's inbox. Never blocks.
    pub fn publish(&self, event: AlarmEvent) {
        let subscribers = self.subscribers.lock().clone();
        for inbox in subscribers {
            inbox.push(event.clone());
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
