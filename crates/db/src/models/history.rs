use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// Immutable record of one accepted task mutation batch. The three arrays
/// are parallel: index `i` names a field, its new value and its old value.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    #[ts(type = "Array<string>")]
    pub updated_fields: Json<Vec<String>>,
    #[ts(type = "Array<string>")]
    pub fields_values: Json<Vec<String>>,
    #[ts(type = "Array<string>")]
    pub previous_values: Json<Vec<String>>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateHistory {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub updated_fields: Vec<String>,
    pub fields_values: Vec<String>,
    pub previous_values: Vec<String>,
}

const HISTORY_COLUMNS: &str =
    "id, task_id, user_id, updated_fields, fields_values, previous_values, created_at";

impl History {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateHistory,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, History>(&format!(
            "INSERT INTO histories (id, task_id, user_id, updated_fields, fields_values, \
             previous_values, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {HISTORY_COLUMNS}"
        ))
        .bind(id)
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(Json(&data.updated_fields))
        .bind(Json(&data.fields_values))
        .bind(Json(&data.previous_values))
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, History>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM histories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_task_id(pool: &SqlitePool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, History>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM histories WHERE task_id = $1 ORDER BY created_at ASC"
        ))
        .bind(task_id)
        .fetch_all(pool)
        .await
    }
}
