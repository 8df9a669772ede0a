use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A logged chunk of work on a task, in minutes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub spent_time: i64,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

const TIME_ENTRY_COLUMNS: &str = "id, task_id, user_id, spent_time, created_at";

impl TimeEntry {
    pub async fn create(
        pool: &SqlitePool,
        task_id: Uuid,
        user_id: Uuid,
        spent_time: i64,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            "INSERT INTO time_entries (id, task_id, user_id, spent_time, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {TIME_ENTRY_COLUMNS}"
        ))
        .bind(id)
        .bind(task_id)
        .bind(user_id)
        .bind(spent_time)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn update_spent_time(
        pool: &SqlitePool,
        id: Uuid,
        spent_time: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            "UPDATE time_entries SET spent_time = $1 WHERE id = $2 RETURNING {TIME_ENTRY_COLUMNS}"
        ))
        .bind(spent_time)
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            "SELECT {TIME_ENTRY_COLUMNS} FROM time_entries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_task_id(pool: &SqlitePool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            "SELECT {TIME_ENTRY_COLUMNS} FROM time_entries WHERE task_id = $1 ORDER BY created_at ASC"
        ))
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Total minutes logged against a task.
    pub async fn total_for_task(pool: &SqlitePool, task_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(spent_time), 0) FROM time_entries WHERE task_id = $1",
        )
        .bind(task_id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM time_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
