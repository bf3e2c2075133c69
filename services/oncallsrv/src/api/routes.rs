//! Router assembly

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::api::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Alert lifecycle
        .route("/alerts", get(handlers::list_alerts).post(handlers::create_alert))
        .route("/alerts/:id", get(handlers::get_alert))
        .route("/alerts/:id/ack", post(handlers::ack_alert))
        .route("/alerts/:id/unack", post(handlers::unack_alert))
        .route("/alerts/:id/close", post(handlers::close_alert))
        // Authenticated intake
        .route("/alert/webhook", post(handlers::webhook_alert))
        .route("/alertmanager/webhook", post(handlers::alertmanager_webhook))
        // Uptime monitoring
        .route("/uptime", get(handlers::uptime_dashboard))
        .route(
            "/uptime/services",
            get(handlers::list_services).post(handlers::create_service),
        )
        .route(
            "/uptime/services/:id",
            put(handlers::update_service)
                .get(handlers::get_service)
                .delete(handlers::delete_service),
        )
        .route("/uptime/services/:id/check", post(handlers::check_service))
        .route("/uptime/services/:id/stats", get(handlers::service_stats))
        .route("/uptime/services/:id/history", get(handlers::service_history))
        // Users and schedules
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route("/users/:id", get(handlers::get_user))
        .route("/oncall/current", get(handlers::current_oncall))
        .route(
            "/oncall/schedules",
            get(handlers::list_schedules).post(handlers::create_schedule),
        )
        .layer(middleware::from_fn(oncall_common::logging::http_request_logger))
        .with_state(state)
}
