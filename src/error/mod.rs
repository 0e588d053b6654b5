use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::coordinator::CoordinatorError;
use crate::queue::QueueError;
use crate::sender::DeliveryError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Chat client error: {0}")]
    Sender(#[from] DeliveryError),
}

impl From<CoordinatorError> for AppError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::EmptyMessage => AppError::Validation(err.to_string()),
            CoordinatorError::Queue(e) => AppError::Queue(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Queue(QueueError::EmptyMessage) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Queue(QueueError::DuplicateId(_)) => (StatusCode::CONFLICT, "DUPLICATE_ID"),
            AppError::Queue(QueueError::QueueFull { .. }) => {
                (StatusCode::INSUFFICIENT_STORAGE, "QUEUE_FULL")
            }
            AppError::Queue(_) | AppError::Storage(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_ERROR")
            }
            AppError::Sender(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        };

        let message = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        };

        // Always log the detailed error server-side
        if status.is_server_error() {
            tracing::error!(code = %code, status = %status.as_u16(), message = %message, "API error");
        } else {
            tracing::debug!(code = %code, status = %status.as_u16(), message = %message, "API error");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
