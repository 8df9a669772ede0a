use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::time_entry::TimeEntry;
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeEntryRequest {
    pub user_id: Uuid,
    pub spent_time: i64,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimeEntryRequest {
    pub spent_time: i64,
}

pub async fn get_time_entries(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<TimeEntry>>>, ApiError> {
    let entries = state.time_entries().list_for_task(task_id).await?;
    Ok(ResponseJson(ApiResponse::success(entries)))
}

pub async fn create_time_entry(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<CreateTimeEntryRequest>,
) -> Result<ResponseJson<ApiResponse<TimeEntry>>, ApiError> {
    let entry = state
        .time_entries()
        .create(task_id, payload.user_id, payload.spent_time)
        .await?;
    Ok(ResponseJson(ApiResponse::success(entry)))
}

pub async fn update_time_entry(
    State(state): State<AppState>,
    Path((task_id, entry_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateTimeEntryRequest>,
) -> Result<ResponseJson<ApiResponse<TimeEntry>>, ApiError> {
    let entry = state
        .time_entries()
        .update(task_id, entry_id, payload.spent_time)
        .await?;
    Ok(ResponseJson(ApiResponse::success(entry)))
}

pub async fn delete_time_entry(
    State(state): State<AppState>,
    Path((task_id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.time_entries().delete(task_id, entry_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_time_entries).post(create_time_entry))
        .route(
            "/{entry_id}",
            put(update_time_entry).delete(delete_time_entry),
        )
}
