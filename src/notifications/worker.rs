//! Notification worker: §4.7 of the specification.
//!
//! Drains the notification queue, POSTs each payload to the configured
//! webhook, and applies the retry policy: 5xx/transport errors retry with
//! exponential backoff up to N attempts (requeued to the tail with an
//! incremented attempt counter so a slow webhook never head-of-line-blocks
//! fresh payloads), 4xx errors are logged and dropped, 2xx is success.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::blocking::Client;

use crate::config::WebhookConfig;
use crate::error::NotifyError;
use crate::queue::BoundedDropOldest;
use crate::shutdown::{Shutdown, POLL_INTERVAL};
use crate::store::StateStore;
use crate::transport::Backoff;

use super::QueuedPayload;

pub struct NotificationWorker {
    config: WebhookConfig,
    queue: Arc<BoundedDropOldest<QueuedPayload>>,
    store: Arc<StateStore>,
    client: Client,
    shutdown: Shutdown,
}

impl NotificationWorker {
    pub fn new(config: WebhookConfig, queue: Arc<BoundedDropOldest<QueuedPayload>>, store: Arc<StateStore>, shutdown: Shutdown) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_s))
            .timeout(Duration::from_secs(config.total_timeout_s))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .expect("failed to build HTTP client");
        Self {
            config,
            queue,
            store,
            client,
            shutdown,
        }
    }

    pub fn run(&self) {
        while !self.shutdown.is_signaled() {
            let Some(queued) = self.queue.pop_timeout(POLL_INTERVAL) else {
                continue;
            };
            if queued.not_before > Utc::now() {
                // Not ready yet: put it back and give fresh payloads queued
                // behind it a chance to be dequeued first, instead of
                // blocking this thread until the backoff elapses.
                self.queue.push(queued);
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
            self.deliver(queued);
        }
    }

    fn deliver(&self, queued: QueuedPayload) {
        match self.post(&queued) {
            Ok(()) => {
                debug!(
                    "notification worker: delivered {} (attempt {})",
                    queued.payload.event.key.alarm_type, queued.attempt
                );
            }
            Err(NotifyError::ClientError(status)) => {
                warn!(
                    "notification worker: webhook rejected payload with {status}, dropping"
                );
            }
            Err(e) => {
                if queued.attempt + 1 >= self.config.retries {
                    warn!("notification worker: giving up after {} attempts: {e}", queued.attempt + 1);
                    return;
                }
                let mut backoff = Backoff::new(1_000, 30_000);
                // fast-forward the backoff state to this payload's attempt
                // number so later retries wait longer, matching the spec's
                // "exponential backoff, initial 1s, factor 2, cap 30s".
                for _ in 0..queued.attempt {
                    backoff.next_delay();
                }
                let delay = backoff.next_delay();
                let not_before = not_before_after(delay);
                self.queue.push(QueuedPayload {
                    payload: queued.payload,
                    attempt: queued.attempt + 1,
                    not_before,
                });
            }
        }
    }

    fn post(&self, queued: &QueuedPayload) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.config.url).json(&queued.payload);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(NotifyError::Transport)?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            self.store.record_notification_dropped();
            Err(NotifyError::ClientError(status.as_u16()))
        } else {
            Err(NotifyError::ServerError(status.as_u16()))
        }
    }
}

/// Converts a `std::time::Duration` backoff delay into an absolute
/// `not_before` timestamp, since `DateTime<Utc>` only adds `chrono::Duration`.
fn not_before_after(delay: Duration) -> DateTime<Utc> {
    Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(30))
}
