//! HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::models::{
    AckRequest, AlertResponse, CreateAlertRequest, HistoryQuery, StatsQuery,
    UpdateServiceRequest, WebhookAlertRequest, WebhookAlertResponse,
};
use crate::alertmanager::AlertManagerWebhook;
use crate::domain::{NewService, Service, Severity, StatsPeriod};
use crate::engine::NewAlert;
use crate::error::{invalid_input, not_found, OncallError, Result};
use crate::prober::probe_and_record;
use crate::store::{NewSchedule, NewUser};
use crate::AppState;

/// Show only a key prefix in auth failure logs.
fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{}***", prefix)
}

/// API-key check for the webhook endpoints. Failures are logged with
/// the key masked.
fn require_api_key(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let provided = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if provided.is_empty() {
        warn!("Webhook request without API key rejected");
        return Err(OncallError::Unauthorized("missing API key".to_string()));
    }

    if state.config.auth.webhook_keys.iter().any(|k| k == provided) {
        Ok(())
    } else {
        warn!("Webhook auth failed for key {}", mask_key(provided));
        Err(OncallError::Unauthorized("unknown API key".to_string()))
    }
}

// ==================== Health ====================

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>> {
    state
        .db
        .ping()
        .await
        .map_err(|e| OncallError::Internal(format!("database unreachable: {}", e)))?;

    // Queue depth is informational; a Redis hiccup must not fail the
    // health check on its own.
    let queue_depth = state.queue.len().await.ok();

    Ok(Json(json!({
        "status": "healthy",
        "service": crate::SERVICE_NAME,
        "version": crate::VERSION,
        "queue_depth": queue_depth,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

// ==================== Alerts ====================

async fn enrich(state: &AppState, alert: crate::domain::Alert) -> Result<AlertResponse> {
    let assignee = match &alert.assigned_to {
        Some(user_id) => state.oncall.get_user(user_id).await?,
        None => None,
    };
    Ok(AlertResponse {
        alert,
        assigned_to_name: assignee.as_ref().map(|u| u.name.clone()),
        assigned_to_email: assignee.map(|u| u.email),
    })
}

pub async fn list_alerts(State(state): State<AppState>) -> Result<Json<Value>> {
    let alerts = state.alerts.list(100).await?;
    Ok(Json(json!(alerts)))
}

pub async fn create_alert(
    State(state): State<AppState>,
    Json(request): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let severity = Severity::parse(&request.severity)
        .ok_or_else(|| invalid_input(&format!("unknown severity: {}", request.severity)))?;

    let alert = state
        .engine
        .create(NewAlert {
            title: request.title,
            description: request.description,
            severity,
            source: request.source,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(json!(alert))))
}

pub async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AlertResponse>> {
    let alert = state.alerts.get(&id).await?.ok_or_else(|| not_found(&id))?;
    Ok(Json(enrich(&state, alert).await?))
}

pub async fn ack_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<AckRequest>>,
) -> Result<Json<Value>> {
    let requested_user = body.and_then(|Json(request)| request.user);
    let user = match requested_user {
        Some(user) => user,
        None => state
            .alerts
            .get(&id)
            .await?
            .ok_or_else(|| not_found(&id))?
            .assigned_to
            .unwrap_or_else(|| "unknown".to_string()),
    };

    let alert = state.engine.ack(&id, &user).await?;
    Ok(Json(json!({ "id": alert.id, "status": alert.status })))
}

pub async fn unack_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let alert = state.engine.unack(&id).await?;
    Ok(Json(json!({ "id": alert.id, "status": alert.status })))
}

pub async fn close_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let alert = state.engine.close(&id).await?;
    Ok(Json(json!({ "id": alert.id, "status": alert.status })))
}

// ==================== Webhooks ====================

pub async fn webhook_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<WebhookAlertRequest>,
) -> Result<(StatusCode, Json<WebhookAlertResponse>)> {
    require_api_key(&state, &headers)?;

    let severity = Severity::parse(&request.severity)
        .ok_or_else(|| invalid_input(&format!("unknown severity: {}", request.severity)))?;

    if let Some(metadata) = &request.metadata {
        debug!("Webhook alert metadata: {}", metadata);
    }

    let alert = state
        .engine
        .create(NewAlert {
            title: request.title,
            description: request.description,
            severity,
            source: request.source,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(WebhookAlertResponse {
            alert_id: alert.id,
            status: alert.status.as_str().to_string(),
            assigned_to: alert.assigned_to,
            message: "Alert created".to_string(),
        }),
    ))
}

pub async fn alertmanager_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(webhook): Json<AlertManagerWebhook>,
) -> Result<Json<Value>> {
    require_api_key(&state, &headers)?;

    let processed = crate::alertmanager::process_webhook(&state.engine, &webhook).await?;
    Ok(Json(json!({
        "received": webhook.alerts.len(),
        "processed": processed
    })))
}

// ==================== Uptime ====================

pub async fn uptime_dashboard(State(state): State<AppState>) -> Result<Json<Value>> {
    let services = state.uptime.list_services().await?;
    let total_services = services.len();

    let mut dashboard = Vec::with_capacity(total_services);
    for service in services {
        let stats_24h = state.uptime.get_stats(&service.id, StatsPeriod::Day).await?;
        let stats_30d = state.uptime.get_stats(&service.id, StatsPeriod::Month).await?;
        let latest = state.uptime.latest_check(&service.id).await?;

        let (current_status, last_response_time, ssl_info) = match &latest {
            Some(check) => (
                check.status.as_str(),
                check.response_time_ms,
                match check.ssl_expiry {
                    Some(expiry) => json!({
                        "expiry": expiry,
                        "issuer": check.ssl_issuer,
                        "days_left": check.ssl_days_left,
                    }),
                    None => json!({}),
                },
            ),
            None => ("unknown", 0, json!({})),
        };

        let monitoring_enabled = service.is_enabled;
        dashboard.push(json!({
            "service": service,
            "current_status": current_status,
            "last_response_time": last_response_time,
            "stats_24h": stats_24h,
            "stats_30d": stats_30d,
            "ssl_info": ssl_info,
            "monitoring_enabled": monitoring_enabled,
        }));
    }

    Ok(Json(json!({
        "services": dashboard,
        "summary": {
            "total_services": total_services,
            "active_services": dashboard.len(),
        }
    })))
}

pub async fn list_services(State(state): State<AppState>) -> Result<Json<Value>> {
    let services = state.uptime.list_services().await?;
    Ok(Json(json!(services)))
}

pub async fn create_service(
    State(state): State<AppState>,
    Json(request): Json<NewService>,
) -> Result<(StatusCode, Json<Value>)> {
    if request.name.trim().is_empty() || request.url.trim().is_empty() {
        return Err(invalid_input("name and url are required"));
    }
    if matches!(request.interval_seconds, Some(interval) if interval <= 0) {
        return Err(invalid_input("interval_seconds must be positive"));
    }
    if matches!(request.timeout_seconds, Some(timeout) if timeout <= 0) {
        return Err(invalid_input("timeout_seconds must be positive"));
    }

    let service = Service::from_new(request);
    if service.timeout_seconds > service.interval_seconds {
        return Err(invalid_input("timeout_seconds must not exceed interval_seconds"));
    }

    state.uptime.create_service(&service).await?;
    info!("Service registered: {} ({})", service.name, service.url);
    Ok((StatusCode::CREATED, Json(json!(service))))
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let service = state
        .uptime
        .get_service(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(json!(service)))
}

pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<Value>> {
    let mut service = state
        .uptime
        .get_service(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;

    if let Some(name) = request.name {
        service.name = name;
    }
    if let Some(url) = request.url {
        service.url = url;
    }
    if let Some(kind) = request.kind {
        service.kind = kind;
    }
    if let Some(method) = request.method {
        service.method = method;
    }
    if let Some(interval) = request.interval_seconds {
        if interval <= 0 {
            return Err(invalid_input("interval_seconds must be positive"));
        }
        service.interval_seconds = interval;
    }
    if let Some(timeout) = request.timeout_seconds {
        if timeout <= 0 {
            return Err(invalid_input("timeout_seconds must be positive"));
        }
        service.timeout_seconds = timeout;
    }
    if let Some(is_enabled) = request.is_enabled {
        service.is_enabled = is_enabled;
    }
    if let Some(expected_status) = request.expected_status {
        service.expected_status = expected_status;
    }
    if let Some(expected_body) = request.expected_body {
        service.expected_body = expected_body;
    }
    if let Some(headers) = request.headers {
        service.headers = headers;
    }
    if service.timeout_seconds > service.interval_seconds {
        return Err(invalid_input("timeout_seconds must not exceed interval_seconds"));
    }

    let updated = state.uptime.update_service(&service).await?;
    if !updated {
        return Err(not_found(&id));
    }
    Ok(Json(json!(service)))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let deleted = state.uptime.delete_service(&id).await?;
    if !deleted {
        return Err(not_found(&id));
    }
    Ok(Json(json!({ "id": id, "deleted": true })))
}

/// Run one probe immediately, outside the regular tick.
pub async fn check_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let service = state
        .uptime
        .get_service(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;

    let check = probe_and_record(&state.uptime, &state.correlator, &state.http, &service).await?;
    Ok(Json(json!(check)))
}

pub async fn service_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>> {
    let period_str = query.period.unwrap_or_else(|| "24h".to_string());
    let period = StatsPeriod::parse(&period_str)
        .ok_or_else(|| invalid_input(&format!("unknown period: {}", period_str)))?;

    let stats = state
        .uptime
        .get_stats(&id, period)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(json!(stats)))
}

pub async fn service_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>> {
    let hours = query.hours.unwrap_or(24).clamp(1, 24 * 30);
    let history = state.uptime.history(&id, hours).await?;
    Ok(Json(json!(history)))
}

// ==================== Users & on-call ====================

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Value>> {
    let users = state.oncall.list_users().await?;
    Ok(Json(json!(users)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<Value>)> {
    if request.name.trim().is_empty() || request.email.trim().is_empty() {
        return Err(invalid_input("name and email are required"));
    }
    let user = state.oncall.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(json!(user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let user = state
        .oncall
        .get_user(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(json!(user)))
}

pub async fn current_oncall(State(state): State<AppState>) -> Result<Json<Value>> {
    let user = state.oncall.current_on_call(chrono::Utc::now()).await?;
    match user {
        Some(user) => Ok(Json(json!(user))),
        None => Err(OncallError::NotFound("no one is on call".to_string())),
    }
}

pub async fn list_schedules(State(state): State<AppState>) -> Result<Json<Value>> {
    let schedules = state.oncall.list_schedules().await?;
    Ok(Json(json!(schedules)))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(request): Json<NewSchedule>,
) -> Result<(StatusCode, Json<Value>)> {
    if request.end_time <= request.start_time {
        return Err(invalid_input("end_time must be after start_time"));
    }
    if state.oncall.get_user(&request.user_id).await?.is_none() {
        return Err(not_found(&request.user_id));
    }
    let schedule = state.oncall.create_schedule(request).await?;
    Ok((StatusCode::CREATED, Json(json!(schedule))))
}
