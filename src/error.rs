use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Status and message pair handed back to callers for every failed request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorPayload {
    pub status: u16,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        let message = match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::Internal(msg) => msg.clone(),
            // storage details stay in the logs
            AppError::Storage(_) => "Internal server error".to_string(),
        };

        ErrorPayload {
            status: self.status().as_u16(),
            message,
        }
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::RecordNotFound(id) => AppError::NotFound(format!("Courier #{id} not found")),
            DbError::UniqueViolation(field) => {
                AppError::Conflict(format!("Unique constraint failed on {field}"))
            }
            DbError::NotConnected | DbError::Query(_) => AppError::Storage(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Storage(msg) | AppError::Internal(msg) = &self {
            tracing::error!(error = %msg, "request failed");
        }

        (self.status(), Json(self.payload())).into_response()
    }
}
