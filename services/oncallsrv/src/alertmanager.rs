//! Alert-manager webhook adapter
//!
//! Maps the grouped webhook payload onto engine events. Identity is
//! the fingerprint when present, otherwise a deterministic encoding of
//! the label set, so repeated deliveries dedupe to one alert.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::domain::{Alert, Severity};
use crate::engine::LifecycleEngine;
use crate::error::Result;

/// Webhook payload from an external alert-manager
#[derive(Debug, Clone, Deserialize)]
pub struct AlertManagerWebhook {
    #[serde(default)]
    pub version: String,
    #[serde(default, rename = "groupKey")]
    pub group_key: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub alerts: Vec<AlertManagerAlert>,
}

/// Individual alert inside the webhook
#[derive(Debug, Clone, Deserialize)]
pub struct AlertManagerAlert {
    pub status: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(rename = "startsAt")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "endsAt")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fingerprint: String,
}

/// Alert id: the fingerprint, else a deterministic hex encoding of the
/// sorted label set.
fn alert_id(am: &AlertManagerAlert) -> String {
    if !am.fingerprint.is_empty() {
        return am.fingerprint.clone();
    }

    // BTreeMap iteration is already sorted, so equal label sets always
    // produce the same id.
    let joined = am
        .labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");
    let hex: String = joined.bytes().map(|b| format!("{:02x}", b)).collect();
    format!("am-{}", hex)
}

/// Severity from the `severity` label, defaulting to warning.
fn extract_severity(labels: &BTreeMap<String, String>) -> Severity {
    match labels.get("severity").map(|s| s.to_lowercase()) {
        Some(s) if s == "critical" => Severity::Critical,
        Some(s) if s == "info" => Severity::Info,
        _ => Severity::Warning,
    }
}

/// Description fallback chain: summary, description, "{alertname} on
/// {instance}", alertname alone.
fn build_description(
    annotations: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> String {
    if let Some(summary) = annotations.get("summary") {
        return summary.clone();
    }
    if let Some(description) = annotations.get("description") {
        return description.clone();
    }
    match (labels.get("alertname"), labels.get("instance")) {
        (Some(alertname), Some(instance)) => format!("{} on {}", alertname, instance),
        (Some(alertname), None) => alertname.clone(),
        _ => "Alert from alert-manager".to_string(),
    }
}

/// Convert one webhook alert into the internal record.
fn to_internal(am: &AlertManagerAlert) -> Alert {
    Alert::with_id(
        alert_id(am),
        am.labels
            .get("alertname")
            .cloned()
            .unwrap_or_else(|| "alert".to_string()),
        build_description(&am.annotations, &am.labels),
        extract_severity(&am.labels),
        "alertmanager".to_string(),
        am.starts_at.unwrap_or_else(Utc::now),
    )
}

/// Feed a webhook's alerts through the lifecycle engine. Returns how
/// many were applied.
pub async fn process_webhook(
    engine: &LifecycleEngine,
    webhook: &AlertManagerWebhook,
) -> Result<usize> {
    let mut processed = 0;

    for am_alert in &webhook.alerts {
        let alert = to_internal(am_alert);

        match am_alert.status.as_str() {
            "firing" => {
                engine.ingest_firing(alert).await?;
                processed += 1;
            }
            "resolved" => {
                engine.ingest_resolved(alert).await?;
                processed += 1;
            }
            other => {
                debug!("Skipping alert-manager status {:?}", other);
            }
        }
    }

    info!(
        "Alert-manager webhook processed: {}/{} alerts applied",
        processed,
        webhook.alerts.len()
    );
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn am_alert(labels: &[(&str, &str)], annotations: &[(&str, &str)]) -> AlertManagerAlert {
        AlertManagerAlert {
            status: "firing".to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            annotations: annotations
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            starts_at: None,
            ends_at: None,
            fingerprint: String::new(),
        }
    }

    #[test]
    fn test_fingerprint_wins_as_id() {
        let mut alert = am_alert(&[("alertname", "HighCPU")], &[]);
        alert.fingerprint = "abc".to_string();
        assert_eq!(alert_id(&alert), "abc");
    }

    #[test]
    fn test_label_hash_is_deterministic_and_order_insensitive() {
        let a = am_alert(&[("alertname", "HighCPU"), ("instance", "host-1")], &[]);
        let b = am_alert(&[("instance", "host-1"), ("alertname", "HighCPU")], &[]);
        assert_eq!(alert_id(&a), alert_id(&b));
        assert!(alert_id(&a).starts_with("am-"));

        let c = am_alert(&[("alertname", "HighCPU"), ("instance", "host-2")], &[]);
        assert_ne!(alert_id(&a), alert_id(&c));
    }

    #[test]
    fn test_severity_normalisation() {
        assert_eq!(
            extract_severity(&am_alert(&[("severity", "critical")], &[]).labels),
            Severity::Critical
        );
        assert_eq!(
            extract_severity(&am_alert(&[("severity", "INFO")], &[]).labels),
            Severity::Info
        );
        assert_eq!(
            extract_severity(&am_alert(&[("severity", "page")], &[]).labels),
            Severity::Warning
        );
        assert_eq!(
            extract_severity(&am_alert(&[], &[]).labels),
            Severity::Warning
        );
    }

    #[test]
    fn test_description_fallback_chain() {
        let with_summary = am_alert(
            &[("alertname", "HighCPU"), ("instance", "host-1")],
            &[("summary", "CPU > 90%"), ("description", "long text")],
        );
        assert_eq!(
            build_description(&with_summary.annotations, &with_summary.labels),
            "CPU > 90%"
        );

        let with_description = am_alert(
            &[("alertname", "HighCPU")],
            &[("description", "long text")],
        );
        assert_eq!(
            build_description(&with_description.annotations, &with_description.labels),
            "long text"
        );

        let labels_only = am_alert(&[("alertname", "HighCPU"), ("instance", "host-1")], &[]);
        assert_eq!(
            build_description(&labels_only.annotations, &labels_only.labels),
            "HighCPU on host-1"
        );

        let bare = am_alert(&[], &[]);
        assert_eq!(
            build_description(&bare.annotations, &bare.labels),
            "Alert from alert-manager"
        );
    }
}
