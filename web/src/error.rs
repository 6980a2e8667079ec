//! Error types for web handlers.
//!
//! [`AppError`] bridges domain errors and HTTP responses. Every failure,
//! including malformed JSON, query strings and path segments, is rendered
//! as the same JSON body:
//!
//! ```json
//! {
//!   "status": "CONFLICT",
//!   "reason": "Integrity constraint or business logic violation.",
//!   "message": "The participant limit has been reached",
//!   "timestamp": "2025-01-01 12:00:00"
//! }
//! ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use ewm_core::DomainError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Implements Axum's `IntoResponse`, so handlers return
/// `Result<_, AppError>` and use `?` on domain calls.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            source: None,
        }
    }

    /// Attach the underlying cause, logged but never sent to the client.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into())
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message.into())
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into())
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    fn reason(&self) -> &'static str {
        match self.status {
            StatusCode::BAD_REQUEST => "Incorrectly made request.",
            StatusCode::NOT_FOUND => "The required object was not found.",
            StatusCode::CONFLICT => "Integrity constraint or business logic violation.",
            _ => "An unexpected error has occurred.",
        }
    }

    /// `NOT_FOUND`-style name of the status.
    fn status_name(&self) -> String {
        self.status
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_uppercase()
            .replace(' ', "_")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status_name(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: String,
    reason: &'static str,
    message: String,
    timestamp: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    "Internal server error"
                );
            }
        } else {
            tracing::warn!(status = %self.status, message = %self.message, "Request failed");
        }

        let body = ErrorResponse {
            status: self.status_name(),
            reason: self.reason(),
            message: self.message,
            timestamp: ewm_core::timestamp::format(&Utc::now()),
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(message) => Self::not_found(message),
            DomainError::Validation(message) => Self::bad_request(message),
            DomainError::Conflict(message) => Self::conflict(message),
            DomainError::Internal(message) => {
                Self::internal("An internal error occurred").with_source(anyhow::anyhow!(message))
            },
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
