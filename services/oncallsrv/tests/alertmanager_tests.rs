//! Alert-manager webhook semantics: dedup, reopen, resolve

use chrono::{TimeZone, Utc};
use serde_json::json;

use oncallsrv::alertmanager::{process_webhook, AlertManagerWebhook};
use oncallsrv::domain::{AlertStatus, Severity};

mod common;
use common::harness;

fn firing_webhook(fingerprint: &str) -> AlertManagerWebhook {
    serde_json::from_value(json!({
        "version": "4",
        "status": "firing",
        "alerts": [{
            "status": "firing",
            "fingerprint": fingerprint,
            "labels": {
                "alertname": "High CPU",
                "severity": "critical",
                "instance": "host-1"
            },
            "annotations": { "summary": "CPU > 90%" },
            "startsAt": "2024-01-01T00:00:00Z"
        }]
    }))
    .unwrap()
}

fn resolved_webhook(fingerprint: &str) -> AlertManagerWebhook {
    serde_json::from_value(json!({
        "version": "4",
        "status": "resolved",
        "alerts": [{
            "status": "resolved",
            "fingerprint": fingerprint,
            "labels": { "alertname": "High CPU", "severity": "critical" },
            "annotations": { "summary": "CPU > 90%" },
            "startsAt": "2024-01-01T00:00:00Z",
            "endsAt": "2024-01-01T01:00:00Z"
        }]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_firing_creates_fingerprint_keyed_alert() {
    let h = harness().await;

    let processed = process_webhook(&h.engine, &firing_webhook("abc")).await.unwrap();
    assert_eq!(processed, 1);

    let alert = h.alerts.get("abc").await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::New);
    assert_eq!(alert.severity, Severity::Critical);
    assert_eq!(alert.title, "High CPU");
    assert_eq!(alert.description, "CPU > 90%");
    assert_eq!(alert.source, "alertmanager");
    assert_eq!(
        alert.created_at,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    );

    assert_eq!(h.queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_repeated_firing_is_a_noop() {
    let h = harness().await;

    for _ in 0..5 {
        process_webhook(&h.engine, &firing_webhook("abc")).await.unwrap();
    }

    let alerts = h.alerts.list(100).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status, AlertStatus::New);

    // Only the first delivery enqueued
    assert_eq!(h.queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_repeat_does_not_disturb_acked_alert() {
    let h = harness().await;

    process_webhook(&h.engine, &firing_webhook("abc")).await.unwrap();
    h.engine.ack("abc", "user-1").await.unwrap();

    process_webhook(&h.engine, &firing_webhook("abc")).await.unwrap();
    let alert = h.alerts.get("abc").await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Acked);
}

#[tokio::test]
async fn test_firing_reopens_closed_alert() {
    let h = harness().await;

    process_webhook(&h.engine, &firing_webhook("abc")).await.unwrap();
    h.engine.close("abc").await.unwrap();

    process_webhook(&h.engine, &firing_webhook("abc")).await.unwrap();
    let alert = h.alerts.get("abc").await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::New);

    // The reopened alert re-enters the dispatch pipeline
    assert_eq!(h.queue.len().await.unwrap(), 2);
}

#[tokio::test]
async fn test_resolved_closes_live_alert() {
    let h = harness().await;

    process_webhook(&h.engine, &firing_webhook("abc")).await.unwrap();
    process_webhook(&h.engine, &resolved_webhook("abc")).await.unwrap();

    let alert = h.alerts.get("abc").await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Closed);
}

#[tokio::test]
async fn test_resolved_for_unknown_alert_records_it_closed() {
    let h = harness().await;

    process_webhook(&h.engine, &resolved_webhook("never-seen")).await.unwrap();

    let alert = h.alerts.get("never-seen").await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Closed);
    // Nothing to dispatch for an already-resolved condition
    assert_eq!(h.queue.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_resolved_then_firing_again_reopens() {
    let h = harness().await;

    process_webhook(&h.engine, &firing_webhook("abc")).await.unwrap();
    process_webhook(&h.engine, &resolved_webhook("abc")).await.unwrap();
    process_webhook(&h.engine, &firing_webhook("abc")).await.unwrap();

    let alert = h.alerts.get("abc").await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::New);
}

#[tokio::test]
async fn test_unknown_status_is_skipped() {
    let h = harness().await;

    let webhook: AlertManagerWebhook = serde_json::from_value(json!({
        "alerts": [{
            "status": "silenced",
            "fingerprint": "xyz",
            "labels": { "alertname": "Noise" }
        }]
    }))
    .unwrap();

    let processed = process_webhook(&h.engine, &webhook).await.unwrap();
    assert_eq!(processed, 0);
    assert!(h.alerts.get("xyz").await.unwrap().is_none());
}

#[tokio::test]
async fn test_alert_without_fingerprint_dedupes_on_labels() {
    let h = harness().await;

    let webhook: AlertManagerWebhook = serde_json::from_value(json!({
        "alerts": [{
            "status": "firing",
            "labels": { "alertname": "NoFp", "instance": "host-2" },
            "annotations": {}
        }]
    }))
    .unwrap();

    process_webhook(&h.engine, &webhook).await.unwrap();
    process_webhook(&h.engine, &webhook).await.unwrap();

    let alerts = h.alerts.list(100).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].id.starts_with("am-"));
    assert_eq!(alerts[0].description, "NoFp on host-2");
}
