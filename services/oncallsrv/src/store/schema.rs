//! Database schema, applied idempotently at startup

use anyhow::Result;
use sqlx::SqlitePool;

const DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS alerts (
        id          TEXT PRIMARY KEY,
        title       TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        status      TEXT NOT NULL,
        severity    TEXT NOT NULL,
        source      TEXT NOT NULL DEFAULT '',
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL,
        acked_by    TEXT,
        acked_at    TEXT,
        assigned_to TEXT,
        assigned_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_alerts_created_at ON alerts (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_assigned_to ON alerts (assigned_to)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts (status)",
    "CREATE TABLE IF NOT EXISTS users (
        id         TEXT PRIMARY KEY,
        name       TEXT NOT NULL,
        email      TEXT NOT NULL,
        phone      TEXT NOT NULL DEFAULT '',
        role       TEXT NOT NULL DEFAULT 'engineer',
        team       TEXT NOT NULL DEFAULT '',
        is_active  INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS on_call_schedules (
        id         TEXT PRIMARY KEY,
        user_id    TEXT NOT NULL REFERENCES users (id),
        start_time TEXT NOT NULL,
        end_time   TEXT NOT NULL,
        is_active  INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_schedules_window ON on_call_schedules (start_time, end_time)",
    "CREATE TABLE IF NOT EXISTS services (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        url              TEXT NOT NULL,
        type             TEXT NOT NULL DEFAULT 'http',
        method           TEXT NOT NULL DEFAULT 'GET',
        interval_seconds INTEGER NOT NULL DEFAULT 300,
        timeout_seconds  INTEGER NOT NULL DEFAULT 30,
        is_active        INTEGER NOT NULL DEFAULT 1,
        is_enabled       INTEGER NOT NULL DEFAULT 1,
        created_at       TEXT NOT NULL,
        updated_at       TEXT NOT NULL,
        expected_status  INTEGER NOT NULL DEFAULT 200,
        expected_body    TEXT NOT NULL DEFAULT '',
        headers          TEXT NOT NULL DEFAULT '{}'
    )",
    "CREATE TABLE IF NOT EXISTS service_checks (
        id               TEXT PRIMARY KEY,
        service_id       TEXT NOT NULL REFERENCES services (id),
        status           TEXT NOT NULL,
        response_time_ms INTEGER NOT NULL DEFAULT 0,
        status_code      INTEGER,
        error_message    TEXT,
        checked_at       TEXT NOT NULL,
        ssl_expiry       TEXT,
        ssl_issuer       TEXT,
        ssl_days_left    INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_service_checks_service_time
        ON service_checks (service_id, checked_at DESC)",
    "CREATE TABLE IF NOT EXISTS uptime_stats (
        service_id           TEXT NOT NULL REFERENCES services (id),
        period               TEXT NOT NULL,
        uptime_percentage    REAL NOT NULL DEFAULT 100.0,
        total_checks         INTEGER NOT NULL DEFAULT 0,
        successful_checks    INTEGER NOT NULL DEFAULT 0,
        failed_checks        INTEGER NOT NULL DEFAULT 0,
        avg_response_time_ms REAL NOT NULL DEFAULT 0,
        min_response_time_ms INTEGER NOT NULL DEFAULT 0,
        max_response_time_ms INTEGER NOT NULL DEFAULT 0,
        last_updated         TEXT NOT NULL,
        PRIMARY KEY (service_id, period)
    )",
    "CREATE TABLE IF NOT EXISTS service_incidents (
        id               TEXT PRIMARY KEY,
        service_id       TEXT NOT NULL REFERENCES services (id),
        type             TEXT NOT NULL,
        status           TEXT NOT NULL,
        started_at       TEXT NOT NULL,
        resolved_at      TEXT,
        duration_seconds INTEGER,
        description      TEXT NOT NULL DEFAULT '',
        alert_id         TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_service_incidents_lookup
        ON service_incidents (service_id, type, status)",
];

/// Create all tables and indexes. Safe to run on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    for statement in DDL {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
