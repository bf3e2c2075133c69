//! Dispatcher worker: consumes the alert queue and drives each alert
//! to ack or escalation
//!
//! At most one worker ever processes a given alert: pickup races are
//! settled by the atomic lease in the registry, and the lease TTL is
//! the backstop when a worker dies mid-flight. The escalation timer is
//! a TTL key plus a poll, which survives worker restarts without any
//! persistent timer state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::{Alert, AlertStatus};
use crate::engine::LifecycleEngine;
use crate::error::OncallError;
use crate::lease::LeaseRegistry;
use crate::notify::{Notifier, NOTIFY_TIMEOUT};
use crate::queue::AlertQueue;
use crate::store::{AlertStore, OnCallStore};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Identifies this worker in lease values
    pub worker_tag: String,
    /// Lease TTL, the crash backstop
    pub lease_ttl: Duration,
    /// Time an alert may stay unacked before escalation
    pub escalation_ttl: Duration,
    /// Poll cadence while waiting for ack or timer expiry
    pub poll_interval: Duration,
    /// Deadline on notifier calls
    pub notify_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_tag: "worker-1".to_string(),
            lease_ttl: Duration::from_secs(300),
            escalation_ttl: Duration::from_secs(300),
            poll_interval: Duration::from_secs(10),
            notify_timeout: NOTIFY_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    queue: AlertQueue,
    leases: LeaseRegistry,
    alerts: AlertStore,
    engine: LifecycleEngine,
    oncall: OnCallStore,
    notifier: Arc<dyn Notifier>,
    config: DispatcherConfig,
    /// Alert currently under lease, released on graceful shutdown
    current: Arc<Mutex<Option<String>>>,
}

/// What the wait loop decided for one alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Another worker held the lease; payload dropped
    Dropped,
    /// Alert was no longer actionable at pickup (duplicate delivery)
    Skipped,
    Acked,
    Escalated,
}

impl Dispatcher {
    pub fn new(
        queue: AlertQueue,
        leases: LeaseRegistry,
        alerts: AlertStore,
        engine: LifecycleEngine,
        oncall: OnCallStore,
        notifier: Arc<dyn Notifier>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            queue,
            leases,
            alerts,
            engine,
            oncall,
            notifier,
            config,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Worker loop: blocking pop, process, repeat. Queue errors back
    /// off one second and retry forever; the queue is a liveness
    /// dependency.
    pub async fn run(self) {
        info!("Dispatcher {} started, waiting for alerts", self.config.worker_tag);
        loop {
            match self.queue.dequeue(Duration::ZERO).await {
                Ok(Some(alert)) => {
                    if let Err(e) = self.process(alert).await {
                        error!("Dispatcher {}: {}", self.config.worker_tag, e);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Queue pop failed, retrying: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Handle one queued alert end to end.
    pub async fn process(&self, alert: Alert) -> Result<Outcome> {
        let acquired = self
            .leases
            .acquire_lease(&alert.id, &self.config.worker_tag, self.config.lease_ttl)
            .await?;
        if !acquired {
            debug!("Alert {} already leased by another worker", alert.id);
            return Ok(Outcome::Dropped);
        }

        *self.current.lock().await = Some(alert.id.clone());

        let outcome = self.run_lifecycle(&alert).await;

        // Lease always comes off, success or fault; the TTL covers the
        // case where even this fails.
        if let Err(e) = self.leases.release_lease(&alert.id).await {
            warn!("Lease for alert {} not released: {}", alert.id, e);
        }
        *self.current.lock().await = None;

        outcome
    }

    async fn run_lifecycle(&self, alert: &Alert) -> Result<Outcome> {
        // Re-delivered payloads for settled alerts are dropped here.
        match self.alerts.status(&alert.id).await? {
            Some(AlertStatus::New) => {}
            Some(status) => {
                debug!("Alert {} already {}, skipping", alert.id, status.as_str());
                return Ok(Outcome::Skipped);
            }
            None => {
                warn!("Queued alert {} has no stored row, skipping", alert.id);
                return Ok(Outcome::Skipped);
            }
        }

        self.notify_push(alert).await;

        self.leases
            .arm_escalation(&alert.id, self.config.escalation_ttl)
            .await?;
        debug!(
            "Escalation timer ({}s) armed for alert {}",
            self.config.escalation_ttl.as_secs(),
            alert.id
        );

        loop {
            // Ack is checked first so it wins a tie with timer expiry.
            if let Some(user) = self.leases.ack_signal(&alert.id).await? {
                match self.engine.ack(&alert.id, &user).await {
                    Ok(_) | Err(OncallError::InvalidTransition { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
                self.leases.clear_ack(&alert.id).await?;
                self.leases.disarm_escalation(&alert.id).await?;
                info!("Alert {} acknowledged by {}", alert.id, user);
                return Ok(Outcome::Acked);
            }

            if !self.leases.escalation_pending(&alert.id).await? {
                let escalated = self.engine.escalate(&alert.id).await?;
                if escalated {
                    self.notify_escalate(alert).await;
                    info!("Alert {} escalated, no ack in time", alert.id);
                } else {
                    debug!("Alert {} left new before escalation, nothing to do", alert.id);
                }
                return Ok(Outcome::Escalated);
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn notify_push(&self, alert: &Alert) {
        let assignee = match &alert.assigned_to {
            Some(user_id) => match self.oncall.get_user(user_id).await {
                Ok(user) => user,
                Err(e) => {
                    warn!("Assignee lookup for alert {} failed: {}", alert.id, e);
                    None
                }
            },
            None => None,
        };

        let push = self.notifier.push(alert, assignee.as_ref());
        match tokio::time::timeout(self.config.notify_timeout, push).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Push notification for alert {} failed: {}", alert.id, e),
            Err(_) => warn!("Push notification for alert {} timed out", alert.id),
        }
    }

    async fn notify_escalate(&self, alert: &Alert) {
        let escalate = self.notifier.escalate(alert);
        match tokio::time::timeout(self.config.notify_timeout, escalate).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Escalation notification for alert {} failed: {}", alert.id, e),
            Err(_) => warn!("Escalation notification for alert {} timed out", alert.id),
        }
    }

    /// Hand back any in-flight work on graceful shutdown by deleting
    /// the lease key.
    pub async fn release_current(&self) {
        if let Some(alert_id) = self.current.lock().await.take() {
            if let Err(e) = self.leases.release_lease(&alert_id).await {
                warn!("Shutdown lease release for alert {} failed: {}", alert_id, e);
            } else {
                info!("Released lease for alert {} on shutdown", alert_id);
            }
        }
    }
}
