//! Shared fixtures for service tests: an in-memory database, a seeded board
//! and a notifier that records every published event.

use std::sync::Arc;

use async_trait::async_trait;
use db::{DBService, models::task::CreateTask};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::events::{ChangeEvent, ChangeNotifier};

pub struct RecordingNotifier {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub async fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().await.clone()
    }

    /// Drain recorded events, so a test can ignore setup traffic.
    pub async fn take(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.events.lock().await)
    }
}

#[async_trait]
impl ChangeNotifier for RecordingNotifier {
    async fn publish(&self, event: ChangeEvent) {
        self.events.lock().await.push(event);
    }
}

/// Ids of a minimal seeded board: one workspace, one user, two desks, a row,
/// two columns, a task type, two tags and two files.
pub struct Board {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub desk_id: Uuid,
    pub other_desk_id: Uuid,
    pub row_id: Uuid,
    pub column_id: Uuid,
    pub other_column_id: Uuid,
    pub task_type_id: Uuid,
    pub tag_a: Uuid,
    pub tag_b: Uuid,
    pub file_a: Uuid,
    pub file_b: Uuid,
}

pub async fn test_db() -> DBService {
    DBService::new_in_memory()
        .await
        .expect("in-memory database")
}

pub async fn seed_board(pool: &SqlitePool) -> Board {
    let board = Board {
        workspace_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        desk_id: Uuid::new_v4(),
        other_desk_id: Uuid::new_v4(),
        row_id: Uuid::new_v4(),
        column_id: Uuid::new_v4(),
        other_column_id: Uuid::new_v4(),
        task_type_id: Uuid::new_v4(),
        tag_a: Uuid::new_v4(),
        tag_b: Uuid::new_v4(),
        file_a: Uuid::new_v4(),
        file_b: Uuid::new_v4(),
    };

    sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2)")
        .bind(board.user_id)
        .bind("tester")
        .execute(pool)
        .await
        .expect("seed user");
    sqlx::query("INSERT INTO workspaces (id, title) VALUES ($1, $2)")
        .bind(board.workspace_id)
        .bind("Workspace")
        .execute(pool)
        .await
        .expect("seed workspace");

    for (desk_id, title) in [(board.desk_id, "Backlog"), (board.other_desk_id, "Sprint")] {
        sqlx::query("INSERT INTO desks (id, workspace_id, title) VALUES ($1, $2, $3)")
            .bind(desk_id)
            .bind(board.workspace_id)
            .bind(title)
            .execute(pool)
            .await
            .expect("seed desk");
    }
    sqlx::query("INSERT INTO rows (id, workspace_id, title) VALUES ($1, $2, $3)")
        .bind(board.row_id)
        .bind(board.workspace_id)
        .bind("Default")
        .execute(pool)
        .await
        .expect("seed row");
    for (column_id, title) in [(board.column_id, "To Do"), (board.other_column_id, "Done")] {
        sqlx::query("INSERT INTO columns (id, workspace_id, title) VALUES ($1, $2, $3)")
            .bind(column_id)
            .bind(board.workspace_id)
            .bind(title)
            .execute(pool)
            .await
            .expect("seed column");
    }
    sqlx::query("INSERT INTO task_types (id, workspace_id, title) VALUES ($1, $2, $3)")
        .bind(board.task_type_id)
        .bind(board.workspace_id)
        .bind("Feature")
        .execute(pool)
        .await
        .expect("seed task type");
    for (tag_id, title) in [(board.tag_a, "urgent"), (board.tag_b, "backend")] {
        sqlx::query("INSERT INTO tags (id, workspace_id, title) VALUES ($1, $2, $3)")
            .bind(tag_id)
            .bind(board.workspace_id)
            .bind(title)
            .execute(pool)
            .await
            .expect("seed tag");
    }
    for (file_id, path) in [(board.file_a, "docs/a.pdf"), (board.file_b, "docs/b.pdf")] {
        sqlx::query("INSERT INTO files (id, path) VALUES ($1, $2)")
            .bind(file_id)
            .bind(path)
            .execute(pool)
            .await
            .expect("seed file");
    }

    board
}

pub fn create_task_data(board: &Board) -> CreateTask {
    CreateTask {
        title: "A".to_string(),
        description: None,
        desk_id: board.desk_id,
        row_id: board.row_id,
        column_id: board.column_id,
        task_type_id: board.task_type_id,
        initial_assessment: Some(5),
        performer_id: None,
        author_id: board.user_id,
        tags: Vec::new(),
        files: Vec::new(),
    }
}
