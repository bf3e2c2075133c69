//! Lease registry: short-TTL keys coordinating alert processing
//!
//! Three keys exist per in-flight alert:
//! - `alerts:lock:{id}` — exclusive processing marker (at most one owner)
//! - `alerts:escalation:{id}` — presence means the escalation timer is
//!   still pending; its TTL expiry is the timeout signal
//! - `alerts:ack:{id}` — presence means an ack arrived; the value is
//!   the acknowledging user id
//!
//! Every key carries a TTL and none is relied on for durability.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::transient::TransientStore;

fn lock_key(alert_id: &str) -> String {
    format!("alerts:lock:{}", alert_id)
}

fn escalation_key(alert_id: &str) -> String {
    format!("alerts:escalation:{}", alert_id)
}

fn ack_key(alert_id: &str) -> String {
    format!("alerts:ack:{}", alert_id)
}

#[derive(Clone)]
pub struct LeaseRegistry {
    store: Arc<dyn TransientStore>,
}

impl LeaseRegistry {
    pub fn new(store: Arc<dyn TransientStore>) -> Self {
        Self { store }
    }

    /// Try to take exclusive processing rights for an alert.
    ///
    /// Atomic set-if-absent: returns false when another worker already
    /// holds the lease.
    pub async fn acquire_lease(
        &self,
        alert_id: &str,
        worker_tag: &str,
        ttl: Duration,
    ) -> Result<bool> {
        self.store
            .set_nx_ex(&lock_key(alert_id), worker_tag, ttl)
            .await
    }

    /// Release the lease; the TTL is the backstop if this is never
    /// reached.
    pub async fn release_lease(&self, alert_id: &str) -> Result<()> {
        self.store.del(&lock_key(alert_id)).await?;
        Ok(())
    }

    /// Arm the escalation timer. The key's expiry, observed as absence,
    /// means "no ack in time".
    pub async fn arm_escalation(&self, alert_id: &str, ttl: Duration) -> Result<()> {
        self.store
            .set_ex(&escalation_key(alert_id), "pending", ttl)
            .await
    }

    /// True while the escalation timer has not expired.
    pub async fn escalation_pending(&self, alert_id: &str) -> Result<bool> {
        self.store.exists(&escalation_key(alert_id)).await
    }

    /// Cancel a pending escalation timer.
    pub async fn disarm_escalation(&self, alert_id: &str) -> Result<()> {
        self.store.del(&escalation_key(alert_id)).await?;
        Ok(())
    }

    /// Record an ack signal for the waiting worker.
    pub async fn signal_ack(&self, alert_id: &str, user: &str, ttl: Duration) -> Result<()> {
        self.store.set_ex(&ack_key(alert_id), user, ttl).await
    }

    /// Read a pending ack signal; the value is the acking user id.
    pub async fn ack_signal(&self, alert_id: &str) -> Result<Option<String>> {
        self.store.get(&ack_key(alert_id)).await
    }

    /// Remove the ack signal once consumed.
    pub async fn clear_ack(&self, alert_id: &str) -> Result<()> {
        self.store.del(&ack_key(alert_id)).await?;
        Ok(())
    }

    /// Drop every transient key for an alert (close, shutdown).
    pub async fn clear(&self, alert_id: &str) -> Result<()> {
        self.store.del(&lock_key(alert_id)).await?;
        self.store.del(&escalation_key(alert_id)).await?;
        self.store.del(&ack_key(alert_id)).await?;
        Ok(())
    }
}
