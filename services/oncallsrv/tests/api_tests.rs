//! API integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

mod common;
use common::{harness, TEST_API_KEY};

/// Helper to make JSON requests
async fn json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    json_request_with_key(app, method, uri, body, None).await
}

async fn json_request_with_key(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    api_key: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }

    let request = match body {
        Some(json) => builder
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body: Value = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, body)
}

#[tokio::test]
async fn test_health() {
    let h = harness().await;
    let app = h.router();

    let (status, body) = json_request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "oncallsrv");
}

#[tokio::test]
async fn test_create_and_get_alert() {
    let h = harness().await;
    let app = h.router();

    let (status, body) = json_request(
        &app,
        "POST",
        "/alerts",
        Some(json!({
            "title": "disk full",
            "description": "root volume at 98%",
            "severity": "high",
            "source": "node1"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "new");
    assert!(body["id"].is_string());

    // Queue grew by one
    assert_eq!(h.queue.len().await.unwrap(), 1);

    let id = body["id"].as_str().unwrap();
    let (status, body) = json_request(&app, "GET", &format!("/alerts/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "disk full");
    assert_eq!(body["severity"], "high");
}

#[tokio::test]
async fn test_create_alert_rejects_bad_severity() {
    let h = harness().await;
    let app = h.router();

    let (status, _) = json_request(
        &app,
        "POST",
        "/alerts",
        Some(json!({ "title": "x", "severity": "medium" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_alert_is_404() {
    let h = harness().await;
    let app = h.router();

    let (status, _) = json_request(&app, "GET", "/alerts/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = json_request(&app, "POST", "/alerts/nope/ack", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ack_unack_close_flow() {
    let h = harness().await;
    let app = h.router();

    let (_, created) = json_request(
        &app,
        "POST",
        "/alerts",
        Some(json!({ "title": "flow", "severity": "warning" })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = json_request(
        &app,
        "POST",
        &format!("/alerts/{}/ack", id),
        Some(json!({ "user": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "acked");

    let (status, body) = json_request(&app, "POST", &format!("/alerts/{}/unack", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "new");

    let (status, body) = json_request(&app, "POST", &format!("/alerts/{}/close", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "closed");

    // Ack after close conflicts
    let (status, _) = json_request(&app, "POST", &format!("/alerts/{}/ack", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_webhook_requires_api_key() {
    let h = harness().await;
    let app = h.router();

    let payload = json!({
        "title": "webhook alert",
        "description": "from an integration",
        "severity": "critical",
        "source": "ci"
    });

    let (status, _) = json_request(&app, "POST", "/alert/webhook", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        json_request_with_key(&app, "POST", "/alert/webhook", Some(payload.clone()), Some("wrong"))
            .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        json_request_with_key(&app, "POST", "/alert/webhook", Some(payload), Some(TEST_API_KEY))
            .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "new");
    assert!(body["alert_id"].is_string());
}

#[tokio::test]
async fn test_alertmanager_webhook_end_to_end() {
    let h = harness().await;
    let app = h.router();

    let payload = json!({
        "version": "4",
        "status": "firing",
        "alerts": [{
            "status": "firing",
            "fingerprint": "abc",
            "labels": { "alertname": "High CPU", "severity": "critical", "instance": "host-1" },
            "annotations": { "summary": "CPU > 90%" },
            "startsAt": "2024-01-01T00:00:00Z"
        }]
    });

    let (status, body) = json_request_with_key(
        &app,
        "POST",
        "/alertmanager/webhook",
        Some(payload),
        Some(TEST_API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 1);

    let (status, body) = json_request(&app, "GET", "/alerts/abc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["severity"], "critical");
    assert_eq!(body["description"], "CPU > 90%");
    assert_eq!(body["status"], "new");
}

#[tokio::test]
async fn test_service_crud_and_defaults() {
    let h = harness().await;
    let app = h.router();

    let (status, body) = json_request(
        &app,
        "POST",
        "/uptime/services",
        Some(json!({ "name": "example", "url": "https://example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "http");
    assert_eq!(body["method"], "GET");
    assert_eq!(body["interval_seconds"], 300);
    assert_eq!(body["timeout_seconds"], 30);
    assert_eq!(body["expected_status"], 200);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = json_request(&app, "GET", "/uptime/services", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = json_request(
        &app,
        "PUT",
        &format!("/uptime/services/{}", id),
        Some(json!({ "name": "renamed", "is_enabled": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "renamed");
    assert_eq!(body["is_enabled"], false);

    let (status, _) =
        json_request(&app, "DELETE", &format!("/uptime/services/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    // Soft-deleted services leave the listing
    let (_, body) = json_request(&app, "GET", "/uptime/services", None).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_service_validation() {
    let h = harness().await;
    let app = h.router();

    let (status, _) = json_request(
        &app,
        "POST",
        "/uptime/services",
        Some(json!({ "name": "", "url": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // timeout must fit inside the probe interval
    let (status, _) = json_request(
        &app,
        "POST",
        "/uptime/services",
        Some(json!({
            "name": "bad",
            "url": "https://example.com",
            "interval_seconds": 30,
            "timeout_seconds": 60
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_service_stats_endpoint() {
    let h = harness().await;
    let app = h.router();

    let (_, created) = json_request(
        &app,
        "POST",
        "/uptime/services",
        Some(json!({ "name": "example", "url": "https://example.com" })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = json_request(
        &app,
        "GET",
        &format!("/uptime/services/{}/stats?period=24h", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_checks"], 0);
    assert_eq!(body["uptime_percentage"], 100.0);

    let (status, _) = json_request(
        &app,
        "GET",
        &format!("/uptime/services/{}/stats?period=12h", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_uptime_dashboard_shape() {
    let h = harness().await;
    let app = h.router();

    json_request(
        &app,
        "POST",
        "/uptime/services",
        Some(json!({ "name": "example", "url": "https://example.com" })),
    )
    .await;

    let (status, body) = json_request(&app, "GET", "/uptime", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total_services"], 1);

    let services = body["services"].as_array().unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0]["current_status"], "unknown");
    assert_eq!(services[0]["monitoring_enabled"], true);
    assert!(services[0]["stats_24h"]["uptime_percentage"].is_number());
}

#[tokio::test]
async fn test_users_schedules_and_assignment() {
    let h = harness().await;
    let app = h.router();

    let (status, user) = json_request(
        &app,
        "POST",
        "/users",
        Some(json!({ "name": "Alice", "email": "alice@example.com", "team": "platform" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["id"].as_str().unwrap();

    let now = chrono::Utc::now();
    let (status, _) = json_request(
        &app,
        "POST",
        "/oncall/schedules",
        Some(json!({
            "user_id": user_id,
            "start_time": (now - chrono::Duration::hours(1)).to_rfc3339(),
            "end_time": (now + chrono::Duration::hours(8)).to_rfc3339()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = json_request(&app, "GET", "/oncall/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id);

    // New alerts get assigned to the on-call user, and reads enrich
    // the assignee details
    let (_, alert) = json_request(
        &app,
        "POST",
        "/alerts",
        Some(json!({ "title": "assigned", "severity": "info" })),
    )
    .await;
    assert_eq!(alert["assigned_to"], user_id);

    let (_, fetched) = json_request(
        &app,
        "GET",
        &format!("/alerts/{}", alert["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(fetched["assigned_to_name"], "Alice");
    assert_eq!(fetched["assigned_to_email"], "alice@example.com");
}

#[tokio::test]
async fn test_schedule_validation() {
    let h = harness().await;
    let app = h.router();

    let now = chrono::Utc::now();
    // Unknown user
    let (status, _) = json_request(
        &app,
        "POST",
        "/oncall/schedules",
        Some(json!({
            "user_id": "ghost",
            "start_time": now.to_rfc3339(),
            "end_time": (now + chrono::Duration::hours(1)).to_rfc3339()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
