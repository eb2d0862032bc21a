//! API error types and their HTTP mapping.
//!
//! Registry-store errors (conflict, not-found, forbidden) are authoritative
//! and reach the caller distinctly; they are never collapsed into a generic
//! failure. Internal error details are logged but never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    pub timestamp: String,
}

/// Result type for API handlers
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Application-level error type implementing [`IntoResponse`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input shape (400); the message names the offending field.
    #[error("validation error: {0}")]
    Validation(String),

    /// No valid session (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not an admin (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unknown id on update/delete (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate domain (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal failure (500); message logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!("internal server error: {}", detail);
                "Internal server error".to_string()
            }
            Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg) => msg.clone(),
        };

        let body = ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict => Self::Conflict("Domain already exists".to_string()),
            DbError::NotFound => Self::NotFound("Domain not found".to_string()),
            DbError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}
