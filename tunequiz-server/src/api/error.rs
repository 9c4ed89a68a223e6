//! API error mapping
//!
//! Wraps the common taxonomy and maps each entry to one transport status.
//! Infrastructure faults collapse into a generic 500 without leaking
//! internals to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tunequiz_common::Error;

/// Error returned from API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Core(err) = self;
        let (status, code, message) = match err {
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            Error::InvalidCredential(msg) => {
                (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIAL", msg)
            }
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            Error::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            Error::Database(ref e) => {
                tracing::error!(error = %e, "Database failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal error".to_string(),
                )
            }
            Error::Io(_) | Error::Config(_) | Error::Provider(_) | Error::Internal(_) => {
                tracing::error!(error = %err, "Internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
