use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    comments::CommentError, tasks::TaskError, time_entries::TimeEntryError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    TimeEntry(#[from] TimeEntryError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Task(err) => match err {
                TaskError::NotFound => (StatusCode::NOT_FOUND, "TaskError"),
                TaskError::InvalidField(_) | TaskError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, "TaskError")
                }
                TaskError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Comment(err) => match err {
                CommentError::NotFound => (StatusCode::NOT_FOUND, "CommentError"),
                CommentError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::TimeEntry(err) => match err {
                TimeEntryError::NotFound => (StatusCode::NOT_FOUND, "TimeEntryError"),
                TimeEntryError::Validation(_) => (StatusCode::BAD_REQUEST, "TimeEntryError"),
                TimeEntryError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError")
                }
            },
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
        };

        let error_message = format!("{}: {}", error_type, self);
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
