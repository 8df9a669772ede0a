use std::sync::Arc;

use db::{
    DBService,
    models::{task::Task, time_entry::TimeEntry},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use super::{
    events::{ChangeAction, ChangeEvent, ChangeNotifier},
    wall::WallItem,
};

#[derive(Debug, Error)]
pub enum TimeEntryError {
    #[error("time entry not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct TimeEntryService {
    db: DBService,
    notifier: Arc<dyn ChangeNotifier>,
}

impl TimeEntryService {
    pub fn new(db: DBService, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { db, notifier }
    }

    pub async fn create(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        spent_time: i64,
    ) -> Result<TimeEntry, TimeEntryError> {
        Self::validate(spent_time)?;
        Task::find_by_id(&self.db.pool, task_id)
            .await?
            .ok_or(TimeEntryError::NotFound)?;
        let entry =
            TimeEntry::create(&self.db.pool, task_id, user_id, spent_time, Uuid::new_v4()).await?;
        self.send_wall_item(&entry, ChangeAction::Create).await;
        Ok(entry)
    }

    pub async fn update(
        &self,
        task_id: Uuid,
        entry_id: Uuid,
        spent_time: i64,
    ) -> Result<TimeEntry, TimeEntryError> {
        Self::validate(spent_time)?;
        self.owned_by_task(task_id, entry_id).await?;
        let entry = TimeEntry::update_spent_time(&self.db.pool, entry_id, spent_time)
            .await?
            .ok_or(TimeEntryError::NotFound)?;
        self.send_wall_item(&entry, ChangeAction::Update).await;
        Ok(entry)
    }

    pub async fn delete(&self, task_id: Uuid, entry_id: Uuid) -> Result<(), TimeEntryError> {
        self.owned_by_task(task_id, entry_id).await?;
        TimeEntry::delete(&self.db.pool, entry_id).await?;
        self.notifier
            .publish(ChangeEvent::task_wall(
                task_id,
                ChangeAction::Delete,
                json!({ "id": entry_id }),
            ))
            .await;
        Ok(())
    }

    pub async fn list_for_task(&self, task_id: Uuid) -> Result<Vec<TimeEntry>, TimeEntryError> {
        Task::find_by_id(&self.db.pool, task_id)
            .await?
            .ok_or(TimeEntryError::NotFound)?;
        Ok(TimeEntry::find_by_task_id(&self.db.pool, task_id).await?)
    }

    fn validate(spent_time: i64) -> Result<(), TimeEntryError> {
        if spent_time <= 0 {
            return Err(TimeEntryError::Validation(
                "spent time must be a positive number of minutes".to_string(),
            ));
        }
        Ok(())
    }

    async fn owned_by_task(&self, task_id: Uuid, entry_id: Uuid) -> Result<(), TimeEntryError> {
        match TimeEntry::find_by_id(&self.db.pool, entry_id).await? {
            Some(entry) if entry.task_id == task_id => Ok(()),
            _ => Err(TimeEntryError::NotFound),
        }
    }

    async fn send_wall_item(&self, entry: &TimeEntry, action: ChangeAction) {
        let payload = serde_json::to_value(WallItem::SpentTime(entry.clone()))
            .expect("wall item serializes");
        self.notifier
            .publish(ChangeEvent::task_wall(entry.task_id, action, payload))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use crate::services::{
        events::EventName,
        test_support::{RecordingNotifier, create_task_data, seed_board, test_db},
    };

    use super::*;

    #[tokio::test]
    async fn logged_time_accumulates_and_broadcasts() {
        let db = test_db().await;
        let board = seed_board(&db.pool).await;
        let notifier = RecordingNotifier::new();
        let service = TimeEntryService::new(db.clone(), notifier.clone());

        let task_id = Uuid::new_v4();
        Task::create(&db.pool, &create_task_data(&board), task_id)
            .await
            .unwrap();

        service.create(task_id, board.user_id, 30).await.unwrap();
        let entry = service.create(task_id, board.user_id, 45).await.unwrap();

        assert_eq!(
            TimeEntry::total_for_task(&db.pool, task_id).await.unwrap(),
            75
        );

        service.update(task_id, entry.id, 60).await.unwrap();
        assert_eq!(
            TimeEntry::total_for_task(&db.pool, task_id).await.unwrap(),
            90
        );

        let events = notifier.events().await;
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.event == EventName::UpdateTaskWall));
        assert_eq!(events[2].action, ChangeAction::Update);
        assert_eq!(events[2].payload["type"], "spentTime");
        assert_eq!(events[2].payload["spentTime"], 60);
    }

    #[tokio::test]
    async fn non_positive_spent_time_is_rejected() {
        let db = test_db().await;
        let board = seed_board(&db.pool).await;
        let notifier = RecordingNotifier::new();
        let service = TimeEntryService::new(db.clone(), notifier.clone());

        let task_id = Uuid::new_v4();
        Task::create(&db.pool, &create_task_data(&board), task_id)
            .await
            .unwrap();

        for minutes in [0, -15] {
            let err = service
                .create(task_id, board.user_id, minutes)
                .await
                .unwrap_err();
            assert!(matches!(err, TimeEntryError::Validation(_)));
        }
        assert!(notifier.events().await.is_empty());
    }

    #[tokio::test]
    async fn listing_for_a_missing_task_is_not_found() {
        let db = test_db().await;
        seed_board(&db.pool).await;
        let notifier = RecordingNotifier::new();
        let service = TimeEntryService::new(db.clone(), notifier.clone());

        let err = service.list_for_task(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, TimeEntryError::NotFound));
    }
}
