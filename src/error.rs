// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::store::{BufferError, RemoteError};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 500, but the message reaches the client: the local buffer refused a write
    LocalStorage(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., enrollment id already examined)
    Conflict(String),

    // 503 Service Unavailable (remote store unconfigured or unreachable)
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::LocalStorage(msg) => {
                tracing::error!("Local buffer write failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Could not save the result locally. Check storage permissions and try again."
                        .to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BufferError> for AppError {
    fn from(err: BufferError) -> Self {
        AppError::LocalStorage(err.to_string())
    }
}

/// Remote failures degrade to 503 so clients can tell "try later" from a bug.
impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotConfigured => AppError::ServiceUnavailable(
                "Remote results store is not configured; running in local-only mode".to_string(),
            ),
            RemoteError::NotFound(user_id) => {
                AppError::NotFound(format!("No result stored for user '{}'", user_id))
            }
            other => {
                tracing::warn!("Remote store failure: {}", other);
                AppError::ServiceUnavailable("Remote results store is unreachable".to_string())
            }
        }
    }
}
