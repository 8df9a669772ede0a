use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub desk_id: Uuid,
    pub row_id: Uuid,
    pub column_id: Uuid,
    pub task_type_id: Uuid,
    pub initial_assessment: i64,
    pub performer_id: Option<Uuid>,
    pub author_id: Uuid,
    pub updater_id: Option<Uuid>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

/// Full task snapshot as served to clients: base row plus tag ids, attached
/// file ids and the summed spent time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TaskWithDetails {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub desk_id: Uuid,
    pub row_id: Uuid,
    pub column_id: Uuid,
    pub task_type_id: Uuid,
    pub initial_assessment: i64,
    pub performer_id: Option<Uuid>,
    pub author_id: Uuid,
    pub updater_id: Option<Uuid>,
    pub spent_time: i64,
    pub tags: Vec<Uuid>,
    pub files: Vec<Uuid>,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

impl TaskWithDetails {
    pub fn from_parts(task: Task, spent_time: i64, tags: Vec<Uuid>, files: Vec<Uuid>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            desk_id: task.desk_id,
            row_id: task.row_id,
            column_id: task.column_id,
            task_type_id: task.task_type_id,
            initial_assessment: task.initial_assessment,
            performer_id: task.performer_id,
            author_id: task.author_id,
            updater_id: task.updater_id,
            spent_time,
            tags,
            files,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// The updatable subset of a task, compared against incoming update payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdatable {
    pub title: String,
    pub description: Option<String>,
    pub desk_id: Uuid,
    pub row_id: Uuid,
    pub column_id: Uuid,
    pub task_type_id: Uuid,
    pub initial_assessment: i64,
    pub performer_id: Option<Uuid>,
    pub tags: Vec<Uuid>,
    pub files: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub desk_id: Uuid,
    pub row_id: Uuid,
    pub column_id: Uuid,
    pub task_type_id: Uuid,
    #[serde(default)]
    pub initial_assessment: Option<i64>,
    pub performer_id: Option<Uuid>,
    pub author_id: Uuid,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub files: Vec<Uuid>,
}

const TASK_COLUMNS: &str = "id, title, description, desk_id, row_id, column_id, task_type_id, \
     initial_assessment, performer_id, author_id, updater_id, created_at, updated_at";

impl Task {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_desk_id(pool: &SqlitePool, desk_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE desk_id = $1 ORDER BY created_at ASC"
        ))
        .bind(desk_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateTask, id: Uuid) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let now = Utc::now();
        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, title, description, desk_id, row_id, column_id, task_type_id, \
             initial_assessment, performer_id, author_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.desk_id)
        .bind(data.row_id)
        .bind(data.column_id)
        .bind(data.task_type_id)
        .bind(data.initial_assessment.unwrap_or(0))
        .bind(data.performer_id)
        .bind(data.author_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for tag_id in &data.tags {
            sqlx::query("INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2)")
                .bind(id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }
        for (position, file_id) in data.files.iter().enumerate() {
            sqlx::query("INSERT INTO task_files (task_id, file_id, position) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(file_id)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(task)
    }

    /// Base mutation write: stamp the acting user and the update time. Issued
    /// before any targeted field write so a concurrent reader never sees new
    /// field values under a stale updater.
    pub async fn touch(pool: &SqlitePool, id: Uuid, updater_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET updater_id = $1, updated_at = $2 WHERE id = $3")
            .bind(updater_id)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_title(pool: &SqlitePool, id: Uuid, title: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET title = $1 WHERE id = $2")
            .bind(title)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_description(
        pool: &SqlitePool,
        id: Uuid,
        description: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET description = $1 WHERE id = $2")
            .bind(description)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_initial_assessment(
        pool: &SqlitePool,
        id: Uuid,
        initial_assessment: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET initial_assessment = $1 WHERE id = $2")
            .bind(initial_assessment)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_performer_id(
        pool: &SqlitePool,
        id: Uuid,
        performer_id: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET performer_id = $1 WHERE id = $2")
            .bind(performer_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_row_id(pool: &SqlitePool, id: Uuid, row_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET row_id = $1 WHERE id = $2")
            .bind(row_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_column_id(
        pool: &SqlitePool,
        id: Uuid,
        column_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET column_id = $1 WHERE id = $2")
            .bind(column_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_task_type_id(
        pool: &SqlitePool,
        id: Uuid,
        task_type_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET task_type_id = $1 WHERE id = $2")
            .bind(task_type_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_desk_id(pool: &SqlitePool, id: Uuid, desk_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET desk_id = $1 WHERE id = $2")
            .bind(desk_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Replace the task's tag set; an empty slice clears all tags.
    pub async fn replace_tags(pool: &SqlitePool, id: Uuid, tags: &[Uuid]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM task_tags WHERE task_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for tag_id in tags {
            sqlx::query("INSERT INTO task_tags (task_id, tag_id) VALUES ($1, $2)")
                .bind(id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Replace the task's attachments; previously attached files missing from
    /// `files` are dropped.
    pub async fn replace_files(pool: &SqlitePool, id: Uuid, files: &[Uuid]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM task_files WHERE task_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for (position, file_id) in files.iter().enumerate() {
            sqlx::query("INSERT INTO task_files (task_id, file_id, position) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(file_id)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn tag_ids(pool: &SqlitePool, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT tag_id FROM task_tags WHERE task_id = $1 ORDER BY tag_id",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }

    pub async fn file_ids(pool: &SqlitePool, id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT file_id FROM task_files WHERE task_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_updatable(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<TaskUpdatable>, sqlx::Error> {
        let Some(task) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let (tags, files) = tokio::try_join!(Self::tag_ids(pool, id), Self::file_ids(pool, id))?;
        Ok(Some(TaskUpdatable {
            title: task.title,
            description: task.description,
            desk_id: task.desk_id,
            row_id: task.row_id,
            column_id: task.column_id,
            task_type_id: task.task_type_id,
            initial_assessment: task.initial_assessment,
            performer_id: task.performer_id,
            tags,
            files,
        }))
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
