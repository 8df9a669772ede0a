use std::sync::Arc;

use db::{
    DBService,
    models::history::{CreateHistory, History},
};
use uuid::Uuid;

use super::{
    events::{ChangeAction, ChangeEvent, ChangeNotifier},
    wall::WallItem,
};

/// Persists immutable field-change records and announces them on the task's
/// wall channel.
#[derive(Clone)]
pub struct HistoryService {
    db: DBService,
    notifier: Arc<dyn ChangeNotifier>,
}

impl HistoryService {
    pub fn new(db: DBService, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { db, notifier }
    }

    /// Record one accepted mutation batch. The three sequences are parallel
    /// and equal in length; the diff engine guarantees this.
    pub async fn record(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        updated_fields: Vec<String>,
        fields_values: Vec<String>,
        previous_values: Vec<String>,
    ) -> Result<History, sqlx::Error> {
        debug_assert_eq!(updated_fields.len(), fields_values.len());
        debug_assert_eq!(updated_fields.len(), previous_values.len());

        let history = History::create(
            &self.db.pool,
            &CreateHistory {
                task_id,
                user_id,
                updated_fields,
                fields_values,
                previous_values,
            },
            Uuid::new_v4(),
        )
        .await?;

        let payload = serde_json::to_value(WallItem::History(history.clone()))
            .expect("wall item serializes");
        self.notifier
            .publish(ChangeEvent::task_wall(task_id, ChangeAction::Create, payload))
            .await;

        Ok(history)
    }

    pub async fn list_for_task(&self, task_id: Uuid) -> Result<Vec<History>, sqlx::Error> {
        History::find_by_task_id(&self.db.pool, task_id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<History>, sqlx::Error> {
        History::find_by_id(&self.db.pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::services::{
        events::EventName,
        test_support::{RecordingNotifier, create_task_data, seed_board, test_db},
    };
    use db::models::task::Task;

    use super::*;

    #[tokio::test]
    async fn record_persists_and_broadcasts_a_wall_item() {
        let db = test_db().await;
        let board = seed_board(&db.pool).await;
        let notifier = RecordingNotifier::new();
        let service = HistoryService::new(db.clone(), notifier.clone());

        let task_id = Uuid::new_v4();
        Task::create(&db.pool, &create_task_data(&board), task_id)
            .await
            .unwrap();

        let history = service
            .record(
                task_id,
                board.user_id,
                vec!["title".to_string()],
                vec!["B".to_string()],
                vec!["A".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(history.updated_fields.0, vec!["title"]);
        assert_eq!(history.fields_values.0, vec!["B"]);
        assert_eq!(history.previous_values.0, vec!["A"]);

        let stored = service.list_for_task(task_id).await.unwrap();
        assert_eq!(stored.len(), 1);

        let events = notifier.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, EventName::UpdateTaskWall);
        assert_eq!(events[0].action, ChangeAction::Create);
        assert_eq!(events[0].channel, task_id.to_string());
        assert_eq!(events[0].payload["type"], "history");
    }
}
