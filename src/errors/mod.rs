//! Error handling module for the congestion sync backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const AUTH_REQUIRED: &str = "AUTH_REQUIRED";
    pub const DATA_UNAVAILABLE: &str = "DATA_UNAVAILABLE";
    pub const FILTER_DEGRADED: &str = "FILTER_DEGRADED";
    pub const WRITE_FAILED: &str = "WRITE_FAILED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// User-facing message shown when a congestion report could not be saved.
pub const STATUS_WRITE_FAILED_MESSAGE: &str =
    "混雑状況の更新に失敗しました。もう一度お試しください。";

/// User-facing message shown when a store's tags could not be changed.
pub const TAG_WRITE_FAILED_MESSAGE: &str = "タグの更新に失敗しました。もう一度お試しください。";

/// Path the client should call to retry a failed bulk load.
pub const RELOAD_PATH: &str = "/api/session/reload";

/// Application error type.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Missing or invalid API key
    Unauthorized(String),
    /// A write was attempted without a signed-in user
    AuthRequired(String),
    /// Bulk load failed; the view stays behind an error state until reloaded
    DataUnavailable(String),
    /// A per-tag query failed; callers fall back to unfiltered results
    FilterDegraded(String),
    /// An authenticated write was rejected by the backend. Carries the localized user message;
    /// the backend cause is only logged.
    WriteFailed(String),
    /// Resource not found
    NotFound(String),
    /// Validation error
    Validation(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
    /// Bad request
    BadRequest(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            AppError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::FilterDegraded(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WriteFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::AuthRequired(_) => codes::AUTH_REQUIRED,
            AppError::DataUnavailable(_) => codes::DATA_UNAVAILABLE,
            AppError::FilterDegraded(_) => codes::FILTER_DEGRADED,
            AppError::WriteFailed(_) => codes::WRITE_FAILED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::AuthRequired(msg)
            | AppError::DataUnavailable(msg)
            | AppError::FilterDegraded(msg)
            | AppError::WriteFailed(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Database(msg)
            | AppError::Internal(msg)
            | AppError::BadRequest(msg) => msg.clone(),
        }
    }

    /// Reclassify a backend failure during a write as `WriteFailed` carrying `user_message`.
    /// Auth failures and existing write failures pass through untouched.
    pub fn into_write_failure(self, user_message: &str) -> AppError {
        match self {
            AppError::AuthRequired(_) | AppError::WriteFailed(_) => self,
            cause => {
                tracing::warn!("Write rejected: {}", cause);
                AppError::WriteFailed(user_message.to_string())
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let details = match error {
            AppError::DataUnavailable(_) => Some(serde_json::json!({ "retry": RELOAD_PATH })),
            AppError::AuthRequired(_) => Some(serde_json::json!({ "signIn": "/api/auth/session" })),
            AppError::WriteFailed(user_message) => {
                Some(serde_json::json!({ "userMessage": user_message }))
            }
            _ => None,
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
