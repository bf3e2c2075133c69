//! Uptime-monitoring entities: services, checks, stats and incidents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Probe type of a monitored service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Http,
    Https,
    Tcp,
    Ping,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Http => "http",
            ServiceKind::Https => "https",
            ServiceKind::Tcp => "tcp",
            ServiceKind::Ping => "ping",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "http" => Some(ServiceKind::Http),
            "https" => Some(ServiceKind::Https),
            "tcp" => Some(ServiceKind::Tcp),
            "ping" => Some(ServiceKind::Ping),
            _ => None,
        }
    }
}

/// Monitored service registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ServiceKind,
    pub method: String,
    pub interval_seconds: i64,
    pub timeout_seconds: i64,
    pub is_active: bool,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expected_status: i64,
    #[serde(default)]
    pub expected_body: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Fields a caller supplies when registering a service; everything else
/// is defaulted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: Option<ServiceKind>,
    pub method: Option<String>,
    pub interval_seconds: Option<i64>,
    pub timeout_seconds: Option<i64>,
    pub expected_status: Option<i64>,
    pub expected_body: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

impl Service {
    /// Apply registration defaults: http GET, 300s interval, 30s
    /// timeout, expected status 200.
    pub fn from_new(new: NewService) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            url: new.url,
            kind: new.kind.unwrap_or(ServiceKind::Http),
            method: new.method.unwrap_or_else(|| "GET".to_string()),
            interval_seconds: new.interval_seconds.unwrap_or(300),
            timeout_seconds: new.timeout_seconds.unwrap_or(30),
            is_active: true,
            is_enabled: true,
            created_at: now,
            updated_at: now,
            expected_status: new.expected_status.unwrap_or(200),
            expected_body: new.expected_body.unwrap_or_default(),
            headers: new.headers.unwrap_or_default(),
        }
    }
}

/// Outcome of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Up,
    Down,
    Timeout,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Up => "up",
            CheckStatus::Down => "down",
            CheckStatus::Timeout => "timeout",
            CheckStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(CheckStatus::Up),
            "down" => Some(CheckStatus::Down),
            "timeout" => Some(CheckStatus::Timeout),
            "error" => Some(CheckStatus::Error),
            _ => None,
        }
    }
}

/// One probe result, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCheck {
    pub id: String,
    pub service_id: String,
    pub status: CheckStatus,
    pub response_time_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_days_left: Option<i64>,
}

/// Roll-up periods for uptime statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    Hour,
    Day,
    Week,
    Month,
}

impl StatsPeriod {
    pub const ALL: [StatsPeriod; 4] = [
        StatsPeriod::Hour,
        StatsPeriod::Day,
        StatsPeriod::Week,
        StatsPeriod::Month,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::Hour => "1h",
            StatsPeriod::Day => "24h",
            StatsPeriod::Week => "7d",
            StatsPeriod::Month => "30d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1h" => Some(StatsPeriod::Hour),
            "24h" => Some(StatsPeriod::Day),
            "7d" => Some(StatsPeriod::Week),
            "30d" => Some(StatsPeriod::Month),
            _ => None,
        }
    }

    pub fn hours(&self) -> i64 {
        match self {
            StatsPeriod::Hour => 1,
            StatsPeriod::Day => 24,
            StatsPeriod::Week => 24 * 7,
            StatsPeriod::Month => 24 * 30,
        }
    }
}

/// Aggregated statistics per (service, period)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UptimeStats {
    pub service_id: String,
    pub period: String,
    pub uptime_percentage: f64,
    pub total_checks: i64,
    pub successful_checks: i64,
    pub failed_checks: i64,
    pub avg_response_time_ms: f64,
    pub min_response_time_ms: i64,
    pub max_response_time_ms: i64,
    pub last_updated: DateTime<Utc>,
}

/// Incident categories opened by the prober
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Downtime,
    SlowResponse,
    SslExpiry,
}

impl IncidentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::Downtime => "downtime",
            IncidentType::SlowResponse => "slow_response",
            IncidentType::SslExpiry => "ssl_expiry",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "downtime" => Some(IncidentType::Downtime),
            "slow_response" => Some(IncidentType::SlowResponse),
            "ssl_expiry" => Some(IncidentType::SslExpiry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Ongoing,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Ongoing => "ongoing",
            IncidentStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ongoing" => Some(IncidentStatus::Ongoing),
            "resolved" => Some(IncidentStatus::Resolved),
            _ => None,
        }
    }
}

/// A sustained condition on a service, at most one ongoing per
/// (service, type)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceIncident {
    pub id: String,
    pub service_id: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub status: IncidentStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
}

impl ServiceIncident {
    pub fn open(service_id: String, incident_type: IncidentType, description: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            service_id,
            incident_type,
            status: IncidentStatus::Ongoing,
            started_at: Utc::now(),
            resolved_at: None,
            duration_seconds: None,
            description,
            alert_id: None,
        }
    }
}
