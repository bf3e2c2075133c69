//! Alert lifecycle engine
//!
//! The sole writer of alert status. Every transition is a single
//! guarded update statement; anything else in the system only emits
//! events towards this module.

use std::future::Future;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::assign::AssignmentResolver;
use crate::domain::{Alert, AlertStatus, Severity};
use crate::error::{OncallError, Result};
use crate::lease::LeaseRegistry;
use crate::queue::AlertQueue;
use crate::store::AlertStore;

/// Creation request: the caller supplies the condition, the engine
/// supplies identity, status and assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAlert {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub source: String,
}

/// Retry a transient store operation: 3 attempts, exponential backoff.
async fn with_retries<T, F, Fut>(what: &str, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut delay = Duration::from_millis(100);
    let mut last_err = None;

    for attempt in 1..=3 {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{} failed (attempt {}/3): {}", what, attempt, e);
                last_err = Some(e);
                if attempt < 3 {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{}: retries exhausted", what)))
}

#[derive(Clone)]
pub struct LifecycleEngine {
    alerts: AlertStore,
    queue: AlertQueue,
    leases: LeaseRegistry,
    resolver: AssignmentResolver,
    /// TTL stamped on ack-signal keys; aligned with the escalation TTL
    ack_signal_ttl: Duration,
}

impl LifecycleEngine {
    pub fn new(
        alerts: AlertStore,
        queue: AlertQueue,
        leases: LeaseRegistry,
        resolver: AssignmentResolver,
        ack_signal_ttl: Duration,
    ) -> Self {
        Self {
            alerts,
            queue,
            leases,
            resolver,
            ack_signal_ttl,
        }
    }

    /// Create a new alert: durable insert first, then enqueue for
    /// dispatch. Assignment is best-effort and never fails the create.
    pub async fn create(&self, new: NewAlert) -> Result<Alert> {
        if new.title.trim().is_empty() {
            return Err(OncallError::Validation("title is required".to_string()));
        }

        let alert = Alert::new(new.title, new.description, new.severity, new.source);
        self.persist_and_enqueue(alert).await
    }

    async fn persist_and_enqueue(&self, mut alert: Alert) -> Result<Alert> {
        match self.resolver.current_on_call().await {
            Ok(Some(user)) => {
                alert.assigned_to = Some(user.id);
                alert.assigned_at = Some(Utc::now());
            }
            Ok(None) => {}
            Err(e) => warn!("On-call lookup failed, leaving alert unassigned: {}", e),
        }

        with_retries("alert insert", || {
            let alerts = self.alerts.clone();
            let alert = alert.clone();
            async move { alerts.insert(&alert).await }
        })
        .await?;

        // The row is durable from here on; a lost enqueue only delays
        // dispatch, so it must not fail the create.
        let enqueued = with_retries("alert enqueue", || {
            let queue = self.queue.clone();
            let alert = alert.clone();
            async move { queue.enqueue(&alert).await }
        })
        .await;
        if let Err(e) = enqueued {
            error!("Alert {} stored but not enqueued: {}", alert.id, e);
        }

        info!(
            "Alert created: {} [{}] {} (assigned_to={:?})",
            alert.id,
            alert.severity.as_str(),
            alert.title,
            alert.assigned_to
        );
        Ok(alert)
    }

    /// Fingerprint-keyed create (alert-manager firing). Repeats on a
    /// live alert are no-ops; a closed alert reopens and re-enters the
    /// dispatch pipeline.
    pub async fn ingest_firing(&self, alert: Alert) -> Result<Alert> {
        match self.alerts.get(&alert.id).await? {
            None => self.persist_and_enqueue(alert).await,
            Some(existing) if existing.status == AlertStatus::Closed => {
                let now = Utc::now();
                self.alerts.reopen(&alert.id, now).await?;
                info!("Alert {} reopened by firing event", alert.id);
                if let Err(e) = self.queue.enqueue(&Alert {
                    status: AlertStatus::New,
                    updated_at: now,
                    ..existing
                }).await {
                    error!("Reopened alert {} not enqueued: {}", alert.id, e);
                }
                self.fetch(&alert.id).await
            }
            Some(existing) => Ok(existing),
        }
    }

    /// Fingerprint-keyed resolve (alert-manager resolved). Unknown ids
    /// are recorded directly as closed; live alerts are closed.
    pub async fn ingest_resolved(&self, mut alert: Alert) -> Result<Alert> {
        match self.alerts.get(&alert.id).await? {
            None => {
                alert.status = AlertStatus::Closed;
                self.alerts.insert(&alert).await?;
                Ok(alert)
            }
            Some(existing) if existing.status == AlertStatus::Closed => Ok(existing),
            Some(_) => self.close(&alert.id).await,
        }
    }

    async fn fetch(&self, id: &str) -> Result<Alert> {
        self.alerts
            .get(id)
            .await?
            .ok_or_else(|| OncallError::NotFound(id.to_string()))
    }

    async fn current_status(&self, id: &str) -> Result<AlertStatus> {
        self.alerts
            .status(id)
            .await?
            .ok_or_else(|| OncallError::NotFound(id.to_string()))
    }

    /// new → acked. Idempotent: acking an acked alert is a no-op.
    /// Delivers the ack signal so a waiting dispatcher exits its poll
    /// loop promptly.
    pub async fn ack(&self, id: &str, user: &str) -> Result<Alert> {
        match self.current_status(id).await? {
            AlertStatus::New => {
                let now = Utc::now();
                with_retries("alert ack", || {
                    let alerts = self.alerts.clone();
                    let id = id.to_string();
                    let user = user.to_string();
                    async move {
                        alerts.mark_acked(&id, &user, now).await?;
                        Ok(())
                    }
                })
                .await?;

                if let Err(e) = self.leases.signal_ack(id, user, self.ack_signal_ttl).await {
                    warn!("Ack signal for alert {} not delivered: {}", id, e);
                }
                info!("Alert {} acked by {}", id, user);
                self.fetch(id).await
            }
            AlertStatus::Acked => self.fetch(id).await,
            status => Err(OncallError::InvalidTransition {
                from: status.as_str().to_string(),
                to: "acked".to_string(),
            }),
        }
    }

    /// acked → new, clearing the ack record.
    pub async fn unack(&self, id: &str) -> Result<Alert> {
        match self.current_status(id).await? {
            AlertStatus::Acked => {
                self.alerts.mark_unacked(id, Utc::now()).await?;
                if let Err(e) = self.leases.clear_ack(id).await {
                    warn!("Stale ack signal for alert {} not cleared: {}", id, e);
                }
                info!("Alert {} unacked", id);
                self.fetch(id).await
            }
            AlertStatus::New => self.fetch(id).await,
            status => Err(OncallError::InvalidTransition {
                from: status.as_str().to_string(),
                to: "new".to_string(),
            }),
        }
    }

    /// Terminal close from new/acked/escalated; closing a closed alert
    /// is a no-op. Drops every transient key for the alert.
    pub async fn close(&self, id: &str) -> Result<Alert> {
        match self.current_status(id).await? {
            AlertStatus::Closed => self.fetch(id).await,
            _ => {
                self.alerts.mark_closed(id, Utc::now()).await?;
                if let Err(e) = self.leases.clear(id).await {
                    warn!("Transient keys for alert {} not cleared: {}", id, e);
                }
                info!("Alert {} closed", id);
                self.fetch(id).await
            }
        }
    }

    /// new → escalated, driven by the dispatcher's timer. Returns false
    /// when the alert left `new` in the meantime (ack raced the timer).
    pub async fn escalate(&self, id: &str) -> Result<bool> {
        match self.current_status(id).await? {
            AlertStatus::New => {
                let escalated = self.alerts.mark_escalated(id, Utc::now()).await?;
                if escalated {
                    info!("Alert {} escalated", id);
                }
                Ok(escalated)
            }
            _ => Ok(false),
        }
    }
}
