use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::comment::Comment;
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub user_id: Uuid,
    pub text: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateCommentRequest {
    pub text: String,
}

pub async fn get_comments(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Comment>>>, ApiError> {
    let comments = state.comments().list_for_task(task_id).await?;
    Ok(ResponseJson(ApiResponse::success(comments)))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    let comment = state
        .comments()
        .create(task_id, payload.user_id, &payload.text)
        .await?;
    Ok(ResponseJson(ApiResponse::success(comment)))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path((task_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    let comment = state
        .comments()
        .update(task_id, comment_id, &payload.text)
        .await?;
    Ok(ResponseJson(ApiResponse::success(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path((task_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.comments().delete(task_id, comment_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_comments).post(create_comment))
        .route("/{comment_id}", put(update_comment).delete(delete_comment))
}
