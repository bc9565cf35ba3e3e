//! Notification adapter: §4.7 of the specification.
//!
//! Subscribes to the event bus; on each event, joins it with the current
//! counters into a delivery payload and pushes it onto the bounded
//! notification queue (drop-oldest on overflow).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::info;

use crate::bus::Subscription;
use crate::queue::BoundedDropOldest;
use crate::shutdown::{Shutdown, POLL_INTERVAL};
use crate::store::StateStore;

use super::{NotificationPayload, QueuedPayload};

pub struct NotificationAdapter {
    subscription: Subscription,
    store: Arc<StateStore>,
    queue: Arc<BoundedDropOldest<QueuedPayload>>,
    shutdown: Shutdown,
}

impl NotificationAdapter {
    pub fn new(
        subscription: Subscription,
        store: Arc<StateStore>,
        queue: Arc<BoundedDropOldest<QueuedPayload>>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            subscription,
            store,
            queue,
            shutdown,
        }
    }

    pub fn run(&self) {
        while !self.shutdown.is_signaled() {
            let Some(event) = self.subscription.recv_timeout(POLL_INTERVAL) else {
                continue;
            };
            let totals = self.store.counters();
            let payload = NotificationPayload::new(event, totals);
            self.queue.push(QueuedPayload {
                payload,
                attempt: 0,
                not_before: Utc::now(),
            });
        }
        info!("notification adapter: shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::model::{AlarmEvent, AlarmKey, Severity, Transition};
    use chrono::Utc;
    use std::thread;

    #[test]
    fn builds_and_enqueues_payload_on_event() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        let store = Arc::new(StateStore::new());
        let queue = Arc::new(BoundedDropOldest::new(16));
        let shutdown = Shutdown::new();

        let adapter = NotificationAdapter::new(sub, store, queue.clone(), shutdown.clone());
        let handle = thread::spawn(move || adapter.run());

        bus.publish(AlarmEvent {
            key: AlarmKey::new("Pressure", "HIGH_LIMIT"),
            transition: Transition::Raised,
            severity: Severity::Warning,
            timestamp: Utc::now(),
            message: "high".into(),
            value: Some(2.3),
            details: None,
        });

        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        let mut queued = None;
        while std::time::Instant::now() < deadline {
            if let Some(q) = queue.try_pop() {
                queued = Some(q);
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        shutdown.signal();
        handle.join().unwrap();

        let queued = queued.expect("expected a queued payload");
        assert_eq!(queued.payload.kind, "alarm_event");
        assert_eq!(queued.attempt, 0);
    }
}
