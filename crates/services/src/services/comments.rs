use std::sync::Arc;

use db::{
    DBService,
    models::{comment::Comment, task::Task},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use super::{
    events::{ChangeAction, ChangeEvent, ChangeNotifier},
    wall::WallItem,
};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct CommentService {
    db: DBService,
    notifier: Arc<dyn ChangeNotifier>,
}

impl CommentService {
    pub fn new(db: DBService, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { db, notifier }
    }

    pub async fn create(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<Comment, CommentError> {
        Task::find_by_id(&self.db.pool, task_id)
            .await?
            .ok_or(CommentError::NotFound)?;
        let comment =
            Comment::create(&self.db.pool, task_id, user_id, text, Uuid::new_v4()).await?;
        self.send_wall_item(&comment, ChangeAction::Create).await;
        Ok(comment)
    }

    pub async fn update(
        &self,
        task_id: Uuid,
        comment_id: Uuid,
        text: &str,
    ) -> Result<Comment, CommentError> {
        self.owned_by_task(task_id, comment_id).await?;
        let comment = Comment::update_text(&self.db.pool, comment_id, text)
            .await?
            .ok_or(CommentError::NotFound)?;
        self.send_wall_item(&comment, ChangeAction::Update).await;
        Ok(comment)
    }

    pub async fn delete(&self, task_id: Uuid, comment_id: Uuid) -> Result<(), CommentError> {
        self.owned_by_task(task_id, comment_id).await?;
        Comment::delete(&self.db.pool, comment_id).await?;
        self.notifier
            .publish(ChangeEvent::task_wall(
                task_id,
                ChangeAction::Delete,
                json!({ "id": comment_id }),
            ))
            .await;
        Ok(())
    }

    pub async fn list_for_task(&self, task_id: Uuid) -> Result<Vec<Comment>, CommentError> {
        Task::find_by_id(&self.db.pool, task_id)
            .await?
            .ok_or(CommentError::NotFound)?;
        Ok(Comment::find_by_task_id(&self.db.pool, task_id).await?)
    }

    async fn owned_by_task(&self, task_id: Uuid, comment_id: Uuid) -> Result<(), CommentError> {
        match Comment::find_by_id(&self.db.pool, comment_id).await? {
            Some(comment) if comment.task_id == task_id => Ok(()),
            _ => Err(CommentError::NotFound),
        }
    }

    async fn send_wall_item(&self, comment: &Comment, action: ChangeAction) {
        let payload = serde_json::to_value(WallItem::Comment(comment.clone()))
            .expect("wall item serializes");
        self.notifier
            .publish(ChangeEvent::task_wall(comment.task_id, action, payload))
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
    async fn comment_lifecycle_broadcasts_wall_events() {
        let db = test_db().await;
        let board = seed_board(&db.pool).await;
        let notifier = RecordingNotifier::new();
        let service = CommentService::new(db.clone(), notifier.clone());

        let task_id = Uuid::new_v4();
        Task::create(&db.pool, &create_task_data(&board), task_id)
            .await
            .unwrap();

        let comment = service
            .create(task_id, board.user_id, "first draft")
            .await
            .unwrap();
        let updated = service
            .update(task_id, comment.id, "second draft")
            .await
            .unwrap();
        assert_eq!(updated.text, "second draft");
        service.delete(task_id, comment.id).await.unwrap();

        assert!(service.list_for_task(task_id).await.unwrap().is_empty());

        let events = notifier.events().await;
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.event == EventName::UpdateTaskWall
            && e.channel == task_id.to_string()));
        assert_eq!(events[0].action, ChangeAction::Create);
        assert_eq!(events[0].payload["type"], "comment");
        assert_eq!(events[1].action, ChangeAction::Update);
        assert_eq!(events[1].payload["text"], "second draft");
        assert_eq!(events[2].action, ChangeAction::Delete);
        assert_eq!(events[2].payload, json!({ "id": comment.id }));
    }

    #[tokio::test]
    async fn comment_on_missing_task_is_not_found() {
        let db = test_db().await;
        seed_board(&db.pool).await;
        let notifier = RecordingNotifier::new();
        let service = CommentService::new(db.clone(), notifier.clone());

        let missing = Uuid::new_v4();
        let err = service
            .create(missing, Uuid::new_v4(), "orphan")
            .await
            .unwrap_err();
        assert!(matches!(err, CommentError::NotFound));

        let err = service.list_for_task(missing).await.unwrap_err();
        assert!(matches!(err, CommentError::NotFound));
        assert!(notifier.events().await.is_empty());
    }

    #[tokio::test]
    async fn comment_of_another_task_is_not_found() {
        let db = test_db().await;
        let board = seed_board(&db.pool).await;
        let notifier = RecordingNotifier::new();
        let service = CommentService::new(db.clone(), notifier.clone());

        let task_a = Uuid::new_v4();
        let task_b = Uuid::new_v4();
        Task::create(&db.pool, &create_task_data(&board), task_a)
            .await
            .unwrap();
        Task::create(&db.pool, &create_task_data(&board), task_b)
            .await
            .unwrap();
        let comment = service.create(task_a, board.user_id, "on a").await.unwrap();

        let err = service.update(task_b, comment.id, "hijack").await.unwrap_err();
        assert!(matches!(err, CommentError::NotFound));
    }
}
