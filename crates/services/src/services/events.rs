use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::Display;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use ts_rs::TS;
use uuid::Uuid;

/// Socket event names, matching the client protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, TS)]
#[serde(rename_all = "camelCase")]
pub enum EventName {
    #[strum(to_string = "updateTasks")]
    UpdateTasks,
    #[strum(to_string = "updateTask")]
    UpdateTask,
    #[strum(to_string = "updateTaskWall")]
    UpdateTaskWall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, TS)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    #[strum(to_string = "create")]
    Create,
    #[strum(to_string = "update")]
    Update,
    #[strum(to_string = "delete")]
    Delete,
}

/// One event on the broadcast bus. `channel` is the room the event belongs
/// to: a desk id for board-level task lists, a task id for task detail and
/// wall updates.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub channel: String,
    pub event: EventName,
    pub action: ChangeAction,
    #[ts(type = "unknown")]
    pub payload: Value,
}

impl ChangeEvent {
    pub fn tasks(desk_id: Uuid, action: ChangeAction, payload: Value) -> Self {
        Self {
            channel: desk_id.to_string(),
            event: EventName::UpdateTasks,
            action,
            payload,
        }
    }

    pub fn task(task_id: Uuid, action: ChangeAction, payload: Value) -> Self {
        Self {
            channel: task_id.to_string(),
            event: EventName::UpdateTask,
            action,
            payload,
        }
    }

    pub fn task_wall(task_id: Uuid, action: ChangeAction, payload: Value) -> Self {
        Self {
            channel: task_id.to_string(),
            event: EventName::UpdateTaskWall,
            action,
            payload,
        }
    }
}

/// Sink for change events. Injected into the services so tests can record
/// dispatched events instead of performing real I/O.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn publish(&self, event: ChangeEvent);
}

/// Production notifier: one process-wide broadcast bus, consumed by the
/// WebSocket routes. Delivery is best-effort to currently connected
/// subscribers; publishing with no subscribers is not an error.
#[derive(Clone)]
pub struct EventService {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventService {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Live events for one channel. Lagged messages are dropped silently.
    pub fn subscribe(&self, channel: &str) -> BoxStream<'static, ChangeEvent> {
        let channel = channel.to_string();
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(move |result| {
                let channel = channel.clone();
                async move {
                    match result {
                        Ok(event) if event.channel == channel => Some(event),
                        _ => None,
                    }
                }
            })
            .boxed()
    }
}

impl Default for EventService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangeNotifier for EventService {
    async fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }
}
