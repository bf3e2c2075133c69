//! Durable hand-off queue between alert creation and the dispatcher
//!
//! A single FIFO list holding the full alert record as JSON. Delivery
//! is at-least-once; consumers tolerate duplicates through the lease
//! discipline and idempotent transitions.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::domain::Alert;
use crate::transient::TransientStore;

/// Queue key shared by all producers and workers
pub const ALERT_QUEUE_KEY: &str = "alerts:queue";

#[derive(Clone)]
pub struct AlertQueue {
    store: Arc<dyn TransientStore>,
}

impl AlertQueue {
    pub fn new(store: Arc<dyn TransientStore>) -> Self {
        Self { store }
    }

    /// Append an alert to the queue tail.
    pub async fn enqueue(&self, alert: &Alert) -> Result<()> {
        let payload = serde_json::to_string(alert)?;
        self.store.rpush(ALERT_QUEUE_KEY, &payload).await
    }

    /// Pop the next alert, blocking up to `timeout` (`Duration::ZERO`
    /// blocks indefinitely).
    ///
    /// Payloads that fail to decode are logged and skipped, not
    /// reprocessed.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<Alert>> {
        loop {
            let Some(payload) = self.store.blpop(ALERT_QUEUE_KEY, timeout).await? else {
                return Ok(None);
            };

            match serde_json::from_str::<Alert>(&payload) {
                Ok(alert) => return Ok(Some(alert)),
                Err(e) => {
                    error!("Discarding malformed queue payload: {}", e);
                    continue;
                }
            }
        }
    }

    /// Number of queued alerts.
    pub async fn len(&self) -> Result<u64> {
        self.store.llen(ALERT_QUEUE_KEY).await
    }
}
