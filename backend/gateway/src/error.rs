//! API error type.
//!
//! Handlers return `Result<T, ApiError>`; errors render as `{"detail": ...}`
//! with a matching status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tawjihi_media::FileError;
use tawjihi_memory::MemoryError;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Upload rejected by file validation.
    #[error("invalid file: {}", .0.join("; "))]
    InvalidFile(Vec<String>),

    #[error("storage error: {0}")]
    Storage(#[from] MemoryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<FileError> for ApiError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::Invalid(errors) => ApiError::InvalidFile(errors),
            FileError::UnsafePath(segment) => {
                ApiError::BadRequest(format!("Invalid user id: {segment}"))
            }
            FileError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(detail) => {
                warn!(detail = %detail, "Bad request");
                (StatusCode::BAD_REQUEST, json!({ "detail": detail }))
            }
            ApiError::InvalidFile(errors) => {
                warn!(errors = ?errors, "Upload rejected");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "detail": "Invalid file", "errors": errors }),
                )
            }
            ApiError::Storage(e) => {
                error!(error = %e, "Storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": e.to_string() }),
                )
            }
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": detail }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
