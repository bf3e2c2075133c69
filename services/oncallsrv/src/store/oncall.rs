//! Users and on-call schedules
//!
//! The schedule is a flat table of (user, window) rows; whoever's
//! window covers "now" is on call, latest window start winning ties.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: String,
    #[serde(default)]
    pub team: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: Option<String>,
    #[serde(default)]
    pub team: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnCallSchedule {
    pub id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSchedule {
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        role: row.try_get("role")?,
        team: row.try_get("team")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_schedule(row: &SqliteRow) -> Result<OnCallSchedule> {
    Ok(OnCallSchedule {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Clone)]
pub struct OnCallStore {
    pool: SqlitePool,
}

impl OnCallStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            role: new.role.unwrap_or_else(|| "engineer".to_string()),
            team: new.team,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO users (id, name, email, phone, role, team, is_active,
                                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.role)
        .bind(&user.team)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users WHERE is_active = 1 ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_user).collect()
    }

    pub async fn create_schedule(&self, new: NewSchedule) -> Result<OnCallSchedule> {
        let schedule = OnCallSchedule {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            start_time: new.start_time,
            end_time: new.end_time,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO on_call_schedules (id, user_id, start_time, end_time,
                                            is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&schedule.id)
        .bind(&schedule.user_id)
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.is_active)
        .bind(schedule.created_at)
        .execute(&self.pool)
        .await?;

        Ok(schedule)
    }

    pub async fn list_schedules(&self) -> Result<Vec<OnCallSchedule>> {
        let rows = sqlx::query(
            "SELECT * FROM on_call_schedules WHERE is_active = 1 ORDER BY start_time DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_schedule).collect()
    }

    /// The user on call at `now`, if any.
    pub async fn current_on_call(&self, now: DateTime<Utc>) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT u.* FROM users u
             JOIN on_call_schedules ocs ON u.id = ocs.user_id
             WHERE ocs.start_time <= ? AND ocs.end_time >= ?
               AND ocs.is_active = 1 AND u.is_active = 1
             ORDER BY ocs.start_time DESC
             LIMIT 1",
        )
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_user).transpose()
    }
}
