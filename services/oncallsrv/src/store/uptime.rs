//! Service registry, check history, uptime stats and incidents

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::HashMap;

use crate::domain::{
    CheckStatus, IncidentStatus, IncidentType, Service, ServiceCheck, ServiceIncident, ServiceKind,
    StatsPeriod, UptimeStats,
};

#[derive(Clone)]
pub struct UptimeStore {
    pool: SqlitePool,
}

fn row_to_service(row: &SqliteRow) -> Result<Service> {
    let kind: String = row.try_get("type")?;
    let headers_json: String = row.try_get("headers")?;
    let headers: HashMap<String, String> =
        serde_json::from_str(&headers_json).unwrap_or_default();

    Ok(Service {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        url: row.try_get("url")?,
        kind: ServiceKind::parse(&kind)
            .ok_or_else(|| anyhow!("invalid service type in row: {}", kind))?,
        method: row.try_get("method")?,
        interval_seconds: row.try_get("interval_seconds")?,
        timeout_seconds: row.try_get("timeout_seconds")?,
        is_active: row.try_get("is_active")?,
        is_enabled: row.try_get("is_enabled")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        expected_status: row.try_get("expected_status")?,
        expected_body: row.try_get("expected_body")?,
        headers,
    })
}

fn row_to_check(row: &SqliteRow) -> Result<ServiceCheck> {
    let status: String = row.try_get("status")?;
    Ok(ServiceCheck {
        id: row.try_get("id")?,
        service_id: row.try_get("service_id")?,
        status: CheckStatus::parse(&status)
            .ok_or_else(|| anyhow!("invalid check status in row: {}", status))?,
        response_time_ms: row.try_get("response_time_ms")?,
        status_code: row.try_get("status_code")?,
        error_message: row.try_get("error_message")?,
        checked_at: row.try_get("checked_at")?,
        ssl_expiry: row.try_get("ssl_expiry")?,
        ssl_issuer: row.try_get("ssl_issuer")?,
        ssl_days_left: row.try_get("ssl_days_left")?,
    })
}

fn row_to_stats(row: &SqliteRow) -> Result<UptimeStats> {
    Ok(UptimeStats {
        service_id: row.try_get("service_id")?,
        period: row.try_get("period")?,
        uptime_percentage: row.try_get("uptime_percentage")?,
        total_checks: row.try_get("total_checks")?,
        successful_checks: row.try_get("successful_checks")?,
        failed_checks: row.try_get("failed_checks")?,
        avg_response_time_ms: row.try_get("avg_response_time_ms")?,
        min_response_time_ms: row.try_get("min_response_time_ms")?,
        max_response_time_ms: row.try_get("max_response_time_ms")?,
        last_updated: row.try_get("last_updated")?,
    })
}

fn row_to_incident(row: &SqliteRow) -> Result<ServiceIncident> {
    let incident_type: String = row.try_get("type")?;
    let status: String = row.try_get("status")?;
    Ok(ServiceIncident {
        id: row.try_get("id")?,
        service_id: row.try_get("service_id")?,
        incident_type: IncidentType::parse(&incident_type)
            .ok_or_else(|| anyhow!("invalid incident type in row: {}", incident_type))?,
        status: IncidentStatus::parse(&status)
            .ok_or_else(|| anyhow!("invalid incident status in row: {}", status))?,
        started_at: row.try_get("started_at")?,
        resolved_at: row.try_get("resolved_at")?,
        duration_seconds: row.try_get("duration_seconds")?,
        description: row.try_get("description")?,
        alert_id: row.try_get("alert_id")?,
    })
}

impl UptimeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== Services ====================

    /// Insert a service and initialise its stats rows.
    pub async fn create_service(&self, service: &Service) -> Result<()> {
        let headers_json = serde_json::to_string(&service.headers)?;

        sqlx::query(
            "INSERT INTO services (id, name, url, type, method, interval_seconds,
                                   timeout_seconds, is_active, is_enabled, created_at,
                                   updated_at, expected_status, expected_body, headers)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&service.id)
        .bind(&service.name)
        .bind(&service.url)
        .bind(service.kind.as_str())
        .bind(&service.method)
        .bind(service.interval_seconds)
        .bind(service.timeout_seconds)
        .bind(service.is_active)
        .bind(service.is_enabled)
        .bind(service.created_at)
        .bind(service.updated_at)
        .bind(service.expected_status)
        .bind(&service.expected_body)
        .bind(headers_json)
        .execute(&self.pool)
        .await?;

        self.init_stats(&service.id).await?;
        Ok(())
    }

    pub async fn get_service(&self, id: &str) -> Result<Option<Service>> {
        let row = sqlx::query("SELECT * FROM services WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_service).transpose()
    }

    pub async fn list_services(&self) -> Result<Vec<Service>> {
        let rows = sqlx::query(
            "SELECT * FROM services WHERE is_active = 1 ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_service).collect()
    }

    /// Services the prober should visit this tick.
    pub async fn active_services(&self) -> Result<Vec<Service>> {
        let rows = sqlx::query("SELECT * FROM services WHERE is_active = 1 AND is_enabled = 1")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_service).collect()
    }

    pub async fn update_service(&self, service: &Service) -> Result<bool> {
        let headers_json = serde_json::to_string(&service.headers)?;
        let result = sqlx::query(
            "UPDATE services
             SET name = ?, url = ?, type = ?, method = ?, interval_seconds = ?,
                 timeout_seconds = ?, is_enabled = ?, expected_status = ?,
                 expected_body = ?, headers = ?, updated_at = ?
             WHERE id = ? AND is_active = 1",
        )
        .bind(&service.name)
        .bind(&service.url)
        .bind(service.kind.as_str())
        .bind(&service.method)
        .bind(service.interval_seconds)
        .bind(service.timeout_seconds)
        .bind(service.is_enabled)
        .bind(service.expected_status)
        .bind(&service.expected_body)
        .bind(headers_json)
        .bind(Utc::now())
        .bind(&service.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft delete: clears is_active, history stays queryable.
    pub async fn delete_service(&self, id: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE services SET is_active = 0, updated_at = ? WHERE id = ?")
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Checks ====================

    pub async fn insert_check(&self, check: &ServiceCheck) -> Result<()> {
        sqlx::query(
            "INSERT INTO service_checks (id, service_id, status, response_time_ms,
                                         status_code, error_message, checked_at,
                                         ssl_expiry, ssl_issuer, ssl_days_left)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&check.id)
        .bind(&check.service_id)
        .bind(check.status.as_str())
        .bind(check.response_time_ms)
        .bind(check.status_code)
        .bind(&check.error_message)
        .bind(check.checked_at)
        .bind(check.ssl_expiry)
        .bind(&check.ssl_issuer)
        .bind(check.ssl_days_left)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Check history for the trailing `hours`, newest first, capped at 100.
    pub async fn history(&self, service_id: &str, hours: i64) -> Result<Vec<ServiceCheck>> {
        let cutoff = Utc::now() - ChronoDuration::hours(hours);
        let rows = sqlx::query(
            "SELECT * FROM service_checks
             WHERE service_id = ? AND checked_at > ?
             ORDER BY checked_at DESC
             LIMIT 100",
        )
        .bind(service_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_check).collect()
    }

    pub async fn latest_check(&self, service_id: &str) -> Result<Option<ServiceCheck>> {
        let row = sqlx::query(
            "SELECT * FROM service_checks
             WHERE service_id = ?
             ORDER BY checked_at DESC
             LIMIT 1",
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_check).transpose()
    }

    // ==================== Stats ====================

    /// Seed one row per period at 100% so dashboards have data before
    /// the first probe.
    pub async fn init_stats(&self, service_id: &str) -> Result<()> {
        let now = Utc::now();
        for period in StatsPeriod::ALL {
            sqlx::query(
                "INSERT INTO uptime_stats (service_id, period, uptime_percentage,
                                           total_checks, successful_checks, failed_checks,
                                           avg_response_time_ms, min_response_time_ms,
                                           max_response_time_ms, last_updated)
                 VALUES (?, ?, 100.0, 0, 0, 0, 0, 0, 0, ?)
                 ON CONFLICT (service_id, period) DO NOTHING",
            )
            .bind(service_id)
            .bind(period.as_str())
            .bind(now)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Recompute every period's stats from the check history and upsert
    /// by natural key.
    pub async fn recompute_stats(&self, service_id: &str, now: DateTime<Utc>) -> Result<()> {
        for period in StatsPeriod::ALL {
            let cutoff = now - ChronoDuration::hours(period.hours());

            let row = sqlx::query(
                "SELECT COUNT(*) AS total,
                        COUNT(CASE WHEN status = 'up' THEN 1 END) AS successful,
                        COUNT(CASE WHEN status != 'up' THEN 1 END) AS failed,
                        COALESCE(AVG(response_time_ms), 0) AS avg_rt,
                        COALESCE(MIN(response_time_ms), 0) AS min_rt,
                        COALESCE(MAX(response_time_ms), 0) AS max_rt
                 FROM service_checks
                 WHERE service_id = ? AND checked_at > ?",
            )
            .bind(service_id)
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;

            let total: i64 = row.try_get("total")?;
            let successful: i64 = row.try_get("successful")?;
            let failed: i64 = row.try_get("failed")?;
            let avg_rt: f64 = row.try_get("avg_rt")?;
            let min_rt: i64 = row.try_get("min_rt")?;
            let max_rt: i64 = row.try_get("max_rt")?;

            let uptime_percentage = if total > 0 {
                (successful as f64 / total as f64) * 100.0
            } else {
                100.0
            };

            sqlx::query(
                "INSERT INTO uptime_stats (service_id, period, uptime_percentage,
                                           total_checks, successful_checks, failed_checks,
                                           avg_response_time_ms, min_response_time_ms,
                                           max_response_time_ms, last_updated)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT (service_id, period) DO UPDATE SET
                     uptime_percentage = excluded.uptime_percentage,
                     total_checks = excluded.total_checks,
                     successful_checks = excluded.successful_checks,
                     failed_checks = excluded.failed_checks,
                     avg_response_time_ms = excluded.avg_response_time_ms,
                     min_response_time_ms = excluded.min_response_time_ms,
                     max_response_time_ms = excluded.max_response_time_ms,
                     last_updated = excluded.last_updated",
            )
            .bind(service_id)
            .bind(period.as_str())
            .bind(uptime_percentage)
            .bind(total)
            .bind(successful)
            .bind(failed)
            .bind(avg_rt)
            .bind(min_rt)
            .bind(max_rt)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn get_stats(
        &self,
        service_id: &str,
        period: StatsPeriod,
    ) -> Result<Option<UptimeStats>> {
        let row = sqlx::query("SELECT * FROM uptime_stats WHERE service_id = ? AND period = ?")
            .bind(service_id)
            .bind(period.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_stats).transpose()
    }

    // ==================== Incidents ====================

    pub async fn ongoing_incident(
        &self,
        service_id: &str,
        incident_type: IncidentType,
    ) -> Result<Option<ServiceIncident>> {
        let row = sqlx::query(
            "SELECT * FROM service_incidents
             WHERE service_id = ? AND type = ? AND status = 'ongoing'
             ORDER BY started_at DESC
             LIMIT 1",
        )
        .bind(service_id)
        .bind(incident_type.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_incident).transpose()
    }

    pub async fn open_incident(&self, incident: &ServiceIncident) -> Result<()> {
        sqlx::query(
            "INSERT INTO service_incidents (id, service_id, type, status, started_at,
                                            resolved_at, duration_seconds, description,
                                            alert_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&incident.id)
        .bind(&incident.service_id)
        .bind(incident.incident_type.as_str())
        .bind(incident.status.as_str())
        .bind(incident.started_at)
        .bind(incident.resolved_at)
        .bind(incident.duration_seconds)
        .bind(&incident.description)
        .bind(&incident.alert_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Resolve every ongoing incident of the given type; returns how
    /// many were resolved.
    pub async fn resolve_incidents(
        &self,
        service_id: &str,
        incident_type: IncidentType,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE service_incidents
             SET status = 'resolved',
                 resolved_at = ?,
                 duration_seconds = CAST((julianday(?) - julianday(started_at)) * 86400 AS INTEGER)
             WHERE service_id = ? AND type = ? AND status = 'ongoing'",
        )
        .bind(now)
        .bind(now)
        .bind(service_id)
        .bind(incident_type.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_incident_alert(&self, incident_id: &str, alert_id: &str) -> Result<()> {
        sqlx::query("UPDATE service_incidents SET alert_id = ? WHERE id = ?")
            .bind(alert_id)
            .bind(incident_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_incidents(&self, service_id: &str) -> Result<Vec<ServiceIncident>> {
        let rows = sqlx::query(
            "SELECT * FROM service_incidents
             WHERE service_id = ?
             ORDER BY started_at DESC
             LIMIT 100",
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_incident).collect()
    }
}
