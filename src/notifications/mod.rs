//! Notification adapter and worker: §4.7 of the specification.

mod adapter;
mod worker;

pub use adapter::NotificationAdapter;
pub use worker::NotificationWorker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AlarmEvent, Counters};

/// Wire shape posted to the webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: AlarmEvent,
    pub totals: Counters,
}

impl NotificationPayload {
    pub fn new(event: AlarmEvent, totals: Counters) -> Self {
        Self {
            kind: "alarm_event".to_string(),
            event,
            totals,
        }
    }
}

/// A payload queued for delivery, carrying its retry attempt count and the
/// earliest time it may be retried. `not_before` lets the worker skip a
/// backing-off payload and keep draining fresh ones instead of sleeping
/// inline, so a slow or down webhook never head-of-line-blocks the queue.
#[derive(Debug, Clone)]
pub struct QueuedPayload {
    pub payload: NotificationPayload,
    pub attempt: u32,
    pub not_before: DateTime<Utc>,
}
