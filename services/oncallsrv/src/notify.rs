//! Notification capability
//!
//! The actual transports (push, email, SMS) are external collaborators;
//! the core only needs something it can hand an alert to. Failures are
//! logged by callers and never abort a lifecycle transition.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::domain::Alert;
use crate::store::User;

/// Default deadline applied to notifier calls
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Initial notification to the assignee when a worker picks the
    /// alert up.
    async fn push(&self, alert: &Alert, assignee: Option<&User>) -> Result<()>;

    /// Escalation notification after the timeout expired unacked.
    async fn escalate(&self, alert: &Alert) -> Result<()>;
}

/// Logs the notification intent; stands in for real transports.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn push(&self, alert: &Alert, assignee: Option<&User>) -> Result<()> {
        match assignee {
            Some(user) => info!(
                "Notify {} <{}> about alert {} [{}] {}",
                user.name,
                user.email,
                alert.id,
                alert.severity.as_str(),
                alert.title
            ),
            None => info!(
                "No assignee for alert {} [{}] {}",
                alert.id,
                alert.severity.as_str(),
                alert.title
            ),
        }
        Ok(())
    }

    async fn escalate(&self, alert: &Alert) -> Result<()> {
        info!(
            "Escalation notification for alert {} [{}] {}",
            alert.id,
            alert.severity.as_str(),
            alert.title
        );
        Ok(())
    }
}
