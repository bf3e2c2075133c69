//! Durable alert storage
//!
//! All status updates are single statements guarded by the expected
//! current status, so concurrent writers cannot produce an invalid
//! transition and re-delivered events degrade to no-ops.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::domain::{Alert, AlertStatus, Severity};

#[derive(Clone)]
pub struct AlertStore {
    pool: SqlitePool,
}

fn row_to_alert(row: &SqliteRow) -> Result<Alert> {
    let status: String = row.try_get("status")?;
    let severity: String = row.try_get("severity")?;
    Ok(Alert {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: AlertStatus::parse(&status)
            .ok_or_else(|| anyhow!("invalid alert status in row: {}", status))?,
        severity: Severity::parse(&severity)
            .ok_or_else(|| anyhow!("invalid alert severity in row: {}", severity))?,
        source: row.try_get("source")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        acked_by: row.try_get("acked_by")?,
        acked_at: row.try_get("acked_at")?,
        assigned_to: row.try_get("assigned_to")?,
        assigned_at: row.try_get("assigned_at")?,
    })
}

impl AlertStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, alert: &Alert) -> Result<()> {
        sqlx::query(
            "INSERT INTO alerts (id, title, description, status, severity, source,
                                 created_at, updated_at, acked_by, acked_at,
                                 assigned_to, assigned_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&alert.id)
        .bind(&alert.title)
        .bind(&alert.description)
        .bind(alert.status.as_str())
        .bind(alert.severity.as_str())
        .bind(&alert.source)
        .bind(alert.created_at)
        .bind(alert.updated_at)
        .bind(&alert.acked_by)
        .bind(alert.acked_at)
        .bind(&alert.assigned_to)
        .bind(alert.assigned_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Alert>> {
        let row = sqlx::query("SELECT * FROM alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_alert).transpose()
    }

    /// Most recent alerts first.
    pub async fn list(&self, limit: i64) -> Result<Vec<Alert>> {
        let rows = sqlx::query("SELECT * FROM alerts ORDER BY created_at DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_alert).collect()
    }

    pub async fn status(&self, id: &str) -> Result<Option<AlertStatus>> {
        let row = sqlx::query("SELECT status FROM alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let status: String = row.try_get("status")?;
                Ok(Some(AlertStatus::parse(&status).ok_or_else(|| {
                    anyhow!("invalid alert status in row: {}", status)
                })?))
            }
            None => Ok(None),
        }
    }

    /// new → acked. Returns false when the alert was not in `new`.
    pub async fn mark_acked(&self, id: &str, user: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'acked', acked_by = ?, acked_at = ?, updated_at = ?
             WHERE id = ? AND status = 'new'",
        )
        .bind(user)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// acked → new, clearing the ack record.
    pub async fn mark_unacked(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'new', acked_by = NULL, acked_at = NULL, updated_at = ?
             WHERE id = ? AND status = 'acked'",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// new/acked/escalated → closed.
    pub async fn mark_closed(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'closed', updated_at = ?
             WHERE id = ? AND status IN ('new', 'acked', 'escalated')",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// new → escalated, the timeout branch.
    pub async fn mark_escalated(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'escalated', updated_at = ?
             WHERE id = ? AND status = 'new'",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// closed → new, used when a fingerprinted alert fires again.
    pub async fn reopen(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'new', updated_at = ?
             WHERE id = ? AND status = 'closed'",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
