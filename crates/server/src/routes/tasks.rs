use axum::{
    Extension, Json, Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    middleware::from_fn_with_state,
    response::{IntoResponse, Json as ResponseJson},
    routing::get,
};
use db::models::task::{CreateTask, Task, TaskWithDetails};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use services::services::{
    events::{ChangeAction, ChangeEvent},
    wall::WallItem,
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    middleware::load_task_middleware,
    routes::{comments, time_entries},
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub desk_id: Uuid,
}

/// Partial task update. Named fields carry the acting user and the tag/file
/// sets; everything else lands in `fields` and is diffed against the stored
/// task.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub user_id: Uuid,
    pub tags: Option<Vec<Uuid>>,
    pub files: Option<Vec<Uuid>>,
    #[serde(flatten)]
    #[ts(skip)]
    pub fields: Map<String, Value>,
}

pub async fn get_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskWithDetails>>>, ApiError> {
    let tasks = state.tasks().list_desk_tasks(query.desk_id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<TaskWithDetails>>, ApiError> {
    tracing::debug!(
        "Creating task '{}' on desk {}",
        payload.title,
        payload.desk_id
    );
    let task = state.tasks().create(&payload).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<TaskWithDetails>>, ApiError> {
    let task = state.tasks().get(task.id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<ResponseJson<ApiResponse<TaskWithDetails>>, ApiError> {
    state
        .tasks()
        .apply_update(
            task.id,
            payload.user_id,
            &payload.fields,
            payload.tags.as_deref(),
            payload.files.as_deref(),
        )
        .await?;
    let task = state.tasks().get(task.id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.tasks().delete(task.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_task_wall(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<WallItem>>>, ApiError> {
    let wall = state.tasks().wall(task.id).await?;
    Ok(ResponseJson(ApiResponse::success(wall)))
}

pub async fn stream_tasks_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_tasks_ws(socket, state, query.desk_id).await {
            tracing::warn!("tasks WS closed: {}", e);
        }
    })
}

async fn handle_tasks_ws(
    socket: WebSocket,
    state: AppState,
    desk_id: Uuid,
) -> anyhow::Result<()> {
    // Subscribe before the snapshot query so no event falls in the gap.
    let mut stream = state.events().subscribe(&desk_id.to_string());

    let (mut sender, mut receiver) = socket.split();

    // Drain (and ignore) any client->server messages so pings/pongs work
    tokio::spawn(async move { while let Some(Ok(_)) = receiver.next().await {} });

    let tasks = state.tasks().list_desk_tasks(desk_id).await?;
    let snapshot = ChangeEvent::tasks(
        desk_id,
        ChangeAction::Update,
        serde_json::to_value(&tasks)?,
    );
    sender
        .send(Message::Text(serde_json::to_string(&snapshot)?.into()))
        .await?;

    while let Some(event) = stream.next().await {
        let text = serde_json::to_string(&event)?;
        if sender.send(Message::Text(text.into())).await.is_err() {
            break; // client disconnected
        }
    }
    Ok(())
}

pub async fn stream_task_ws(
    ws: WebSocketUpgrade,
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_task_ws(socket, state, task.id).await {
            tracing::warn!("task WS closed: {}", e);
        }
    })
}

/// Per-task stream: detail updates and wall items share the task's channel,
/// clients tell them apart by event name.
async fn handle_task_ws(socket: WebSocket, state: AppState, task_id: Uuid) -> anyhow::Result<()> {
    let mut stream = state.events().subscribe(&task_id.to_string());

    let (mut sender, mut receiver) = socket.split();
    tokio::spawn(async move { while let Some(Ok(_)) = receiver.next().await {} });

    let task = state.tasks().get(task_id).await?;
    let snapshot = ChangeEvent::task(task_id, ChangeAction::Update, serde_json::to_value(&task)?);
    sender
        .send(Message::Text(serde_json::to_string(&snapshot)?.into()))
        .await?;

    while let Some(event) = stream.next().await {
        let text = serde_json::to_string(&event)?;
        if sender.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
    Ok(())
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route("/wall", get(get_task_wall))
        .route("/stream/ws", get(stream_task_ws))
        .layer(from_fn_with_state(state.clone(), load_task_middleware))
        .nest("/comments", comments::router())
        .nest("/time-entries", time_entries::router());

    let tasks_router = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .route("/stream/ws", get(stream_tasks_ws))
        .nest("/{task_id}", task_id_router);

    Router::new().nest("/tasks", tasks_router)
}
