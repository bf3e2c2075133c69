//! Request and response DTOs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{Alert, ServiceKind};

/// Body of POST /alerts; severity arrives as a string so bad values
/// surface as a 400, not a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: String,
    #[serde(default)]
    pub source: String,
}

/// Body of ack requests; the acting user is optional and falls back to
/// the alert's assignee.
#[derive(Debug, Default, Deserialize)]
pub struct AckRequest {
    #[serde(default)]
    pub user: Option<String>,
}

/// API-key-authenticated webhook create
#[derive(Debug, Deserialize)]
pub struct WebhookAlertRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAlertResponse {
    pub alert_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub message: String,
}

/// Alert read model with assignee details joined in
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    #[serde(flatten)]
    pub alert: Alert,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_email: Option<String>,
}

/// Partial service update; absent fields keep their current value.
#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ServiceKind>,
    pub method: Option<String>,
    pub interval_seconds: Option<i64>,
    pub timeout_seconds: Option<i64>,
    pub is_enabled: Option<bool>,
    pub expected_status: Option<i64>,
    pub expected_body: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<i64>,
}
