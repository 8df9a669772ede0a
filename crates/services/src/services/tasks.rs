use std::sync::Arc;

use db::{
    DBService,
    models::{
        comment::Comment,
        history::History,
        task::{CreateTask, Task, TaskWithDetails},
        time_entry::TimeEntry,
    },
};
use futures::future;
use serde_json::{Map, Value, json};
use thiserror::Error;
use uuid::Uuid;

use super::{
    diff::{DiffError, diff_task},
    events::{ChangeAction, ChangeEvent, ChangeNotifier},
    history::HistoryService,
    wall::{WallItem, merge_wall},
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task not found")]
    NotFound,
    #[error("field `{0}` is not updatable")]
    InvalidField(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<DiffError> for TaskError {
    fn from(err: DiffError) -> Self {
        match err {
            DiffError::InvalidField(field) => TaskError::InvalidField(field),
            DiffError::Validation(message) => TaskError::Validation(message),
        }
    }
}

/// Orchestrates task mutations: validation, diffing, persistence of each
/// changed field, history recording and change broadcasts.
#[derive(Clone)]
pub struct TaskService {
    db: DBService,
    notifier: Arc<dyn ChangeNotifier>,
    history: HistoryService,
}

impl TaskService {
    pub fn new(db: DBService, notifier: Arc<dyn ChangeNotifier>) -> Self {
        let history = HistoryService::new(db.clone(), notifier.clone());
        Self {
            db,
            notifier,
            history,
        }
    }

    pub fn history(&self) -> &HistoryService {
        &self.history
    }

    pub async fn create(&self, data: &CreateTask) -> Result<TaskWithDetails, TaskError> {
        if data.title.trim().is_empty() {
            return Err(TaskError::Validation("title cannot be empty".to_string()));
        }
        if data.initial_assessment.is_some_and(|v| v < 0) {
            return Err(TaskError::Validation(
                "initial assessment must be a non-negative number".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let task = Task::create(&self.db.pool, data, id).await?;
        tracing::debug!("created task {} on desk {}", id, task.desk_id);

        self.send_tasks_change(task.desk_id, id, ChangeAction::Create)
            .await?;
        self.get(id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<TaskWithDetails, TaskError> {
        self.details(id).await?.ok_or(TaskError::NotFound)
    }

    pub async fn list_desk_tasks(&self, desk_id: Uuid) -> Result<Vec<TaskWithDetails>, TaskError> {
        let tasks = Task::find_by_desk_id(&self.db.pool, desk_id).await?;
        let mut out = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = task.id;
            let (spent_time, tags, files) = tokio::try_join!(
                TimeEntry::total_for_task(&self.db.pool, id),
                Task::tag_ids(&self.db.pool, id),
                Task::file_ids(&self.db.pool, id),
            )?;
            out.push(TaskWithDetails::from_parts(task, spent_time, tags, files));
        }
        Ok(out)
    }

    /// Apply a partial update to a task.
    ///
    /// Diffs the proposal against the stored snapshot, stamps the acting
    /// user, issues the targeted writes for every changed field, records one
    /// history entry and broadcasts the fresh snapshot to the desk and task
    /// channels. An empty diff is a successful no-op: no writes, no history,
    /// no broadcast.
    ///
    /// Writes are not transactional: a failure mid-way leaves the already
    /// issued field writes committed, and a history failure leaves the
    /// mutation committed without its record.
    pub async fn apply_update(
        &self,
        task_id: Uuid,
        acting_user_id: Uuid,
        proposed: &Map<String, Value>,
        tags: Option<&[Uuid]>,
        files: Option<&[Uuid]>,
    ) -> Result<(), TaskError> {
        let snapshot = Task::find_updatable(&self.db.pool, task_id)
            .await?
            .ok_or(TaskError::NotFound)?;

        let Some(diff) = diff_task(&snapshot, proposed, tags, files)? else {
            return Ok(());
        };
        tracing::debug!(
            "updating task {}: fields {:?}",
            task_id,
            diff.updated_fields()
        );

        // The base write lands before the targeted writes so a concurrent
        // reader never sees new field values under a stale updater.
        Task::touch(&self.db.pool, task_id, acting_user_id).await?;
        future::try_join_all(
            diff.entries
                .iter()
                .map(|entry| entry.write.apply(&self.db.pool, task_id)),
        )
        .await?;

        self.history
            .record(
                task_id,
                acting_user_id,
                diff.updated_fields(),
                diff.new_values(),
                diff.previous_values(),
            )
            .await?;

        let desk_id = diff.new_desk_id().unwrap_or(snapshot.desk_id);
        self.send_tasks_change(desk_id, task_id, ChangeAction::Update)
            .await?;
        self.send_task_change(task_id, ChangeAction::Update).await?;
        Ok(())
    }

    /// The task's merged feed of history, comments and time entries,
    /// ascending by creation time.
    pub async fn wall(&self, task_id: Uuid) -> Result<Vec<WallItem>, TaskError> {
        let (histories, comments, time_entries) = tokio::try_join!(
            History::find_by_task_id(&self.db.pool, task_id),
            Comment::find_by_task_id(&self.db.pool, task_id),
            TimeEntry::find_by_task_id(&self.db.pool, task_id),
        )?;
        Ok(merge_wall(histories, comments, time_entries))
    }

    /// Delete a task. Comments, time entries and history records go with it.
    pub async fn delete(&self, task_id: Uuid) -> Result<(), TaskError> {
        let task = Task::find_by_id(&self.db.pool, task_id)
            .await?
            .ok_or(TaskError::NotFound)?;
        Task::delete(&self.db.pool, task_id).await?;

        self.send_tasks_change(task.desk_id, task_id, ChangeAction::Delete)
            .await?;
        self.send_task_change(task_id, ChangeAction::Delete).await?;
        Ok(())
    }

    async fn details(&self, id: Uuid) -> Result<Option<TaskWithDetails>, sqlx::Error> {
        let Some(task) = Task::find_by_id(&self.db.pool, id).await? else {
            return Ok(None);
        };
        let (spent_time, tags, files) = tokio::try_join!(
            TimeEntry::total_for_task(&self.db.pool, id),
            Task::tag_ids(&self.db.pool, id),
            Task::file_ids(&self.db.pool, id),
        )?;
        Ok(Some(TaskWithDetails::from_parts(task, spent_time, tags, files)))
    }

    async fn send_tasks_change(
        &self,
        desk_id: Uuid,
        task_id: Uuid,
        action: ChangeAction,
    ) -> Result<(), TaskError> {
        if let Some(payload) = self.change_payload(task_id, action).await? {
            self.notifier
                .publish(ChangeEvent::tasks(desk_id, action, payload))
                .await;
        }
        Ok(())
    }

    async fn send_task_change(&self, task_id: Uuid, action: ChangeAction) -> Result<(), TaskError> {
        if let Some(payload) = self.change_payload(task_id, action).await? {
            self.notifier
                .publish(ChangeEvent::task(task_id, action, payload))
                .await;
        }
        Ok(())
    }

    /// Deletions carry just the id; everything else re-reads the canonical
    /// snapshot so subscribers see exactly what is persisted.
    async fn change_payload(
        &self,
        task_id: Uuid,
        action: ChangeAction,
    ) -> Result<Option<Value>, TaskError> {
        if action == ChangeAction::Delete {
            return Ok(Some(json!({ "id": task_id })));
        }
        match self.details(task_id).await? {
            Some(details) => Ok(Some(
                serde_json::to_value(&details).expect("task snapshot serializes"),
            )),
            None => {
                tracing::warn!("task {} vanished before broadcast", task_id);
                Ok(None)
            }
        }
    }
}
