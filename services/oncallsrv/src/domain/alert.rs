//! Alert entity and its lifecycle states
//!
//! Status transitions are applied by the lifecycle engine; this module
//! only defines the states, the wire representation and validity of
//! each transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Severity::Info),
            "warning" => Some(Severity::Warning),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

/// Alert lifecycle status
///
/// `new → acked → closed`, with `new → escalated` on timeout and
/// `acked → new` on unack. `closed` is terminal; `escalated` only
/// allows close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    New,
    Acked,
    Closed,
    Escalated,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::New => "new",
            AlertStatus::Acked => "acked",
            AlertStatus::Closed => "closed",
            AlertStatus::Escalated => "escalated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(AlertStatus::New),
            "acked" => Some(AlertStatus::Acked),
            "closed" => Some(AlertStatus::Closed),
            "escalated" => Some(AlertStatus::Escalated),
            _ => None,
        }
    }

    pub fn can_ack(&self) -> bool {
        matches!(self, AlertStatus::New)
    }

    pub fn can_unack(&self) -> bool {
        matches!(self, AlertStatus::Acked)
    }

    pub fn can_close(&self) -> bool {
        matches!(self, AlertStatus::New | AlertStatus::Acked | AlertStatus::Escalated)
    }

    pub fn can_escalate(&self) -> bool {
        matches!(self, AlertStatus::New)
    }
}

/// Alert record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: AlertStatus,
    pub severity: Severity,
    #[serde(default)]
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acked_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create a new alert in status `new` with a random id
    pub fn new(title: String, description: String, severity: Severity, source: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            status: AlertStatus::New,
            severity,
            source,
            created_at: now,
            updated_at: now,
            acked_by: None,
            acked_at: None,
            assigned_to: None,
            assigned_at: None,
        }
    }

    /// Create a new alert carrying a caller-supplied deterministic id
    /// (alert-manager fingerprints).
    pub fn with_id(
        id: String,
        title: String,
        description: String,
        severity: Severity,
        source: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            status: AlertStatus::New,
            severity,
            source,
            created_at,
            updated_at: Utc::now(),
            acked_by: None,
            acked_at: None,
            assigned_to: None,
            assigned_at: None,
        }
    }

    /// Active means a worker or an engineer still owes this alert a
    /// response.
    pub fn is_active(&self) -> bool {
        matches!(self.status, AlertStatus::New | AlertStatus::Acked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_alert_defaults() {
        let alert = Alert::new(
            "disk full".to_string(),
            "root volume at 98%".to_string(),
            Severity::High,
            "node1".to_string(),
        );

        assert_eq!(alert.status, AlertStatus::New);
        assert!(alert.is_active());
        assert!(alert.acked_at.is_none());
        assert!(alert.assigned_to.is_none());
        assert_eq!(alert.created_at, alert.updated_at);
    }

    #[test]
    fn test_transition_validity() {
        assert!(AlertStatus::New.can_ack());
        assert!(AlertStatus::New.can_escalate());
        assert!(!AlertStatus::Acked.can_ack());
        assert!(AlertStatus::Acked.can_unack());
        assert!(!AlertStatus::Closed.can_close());
        assert!(AlertStatus::Escalated.can_close());
        assert!(!AlertStatus::Escalated.can_ack());
        assert!(!AlertStatus::Escalated.can_escalate());
    }

    #[test]
    fn test_severity_round_trip() {
        for s in ["info", "warning", "high", "critical"] {
            assert_eq!(Severity::parse(s).unwrap().as_str(), s);
        }
        assert!(Severity::parse("medium").is_none());
    }

    #[test]
    fn test_queue_payload_round_trips_all_fields() {
        let mut alert = Alert::new(
            "api latency".to_string(),
            "p99 above budget".to_string(),
            Severity::Warning,
            "alertmanager".to_string(),
        );
        alert.assigned_to = Some("user-1".to_string());
        alert.assigned_at = Some(Utc::now());

        let encoded = serde_json::to_string(&alert).unwrap();
        let decoded: Alert = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.id, alert.id);
        assert_eq!(decoded.status, alert.status);
        assert_eq!(decoded.severity, alert.severity);
        assert_eq!(decoded.assigned_to, alert.assigned_to);
        assert_eq!(decoded.created_at, alert.created_at);
    }
}
