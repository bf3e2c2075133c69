//! Unified error handling for the service
//!
//! One enum shared by the engine and the HTTP layer; `IntoResponse`
//! maps each kind to its status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Result type alias
pub type Result<T> = std::result::Result<T, OncallError>;

#[derive(Debug)]
pub enum OncallError {
    /// Bad client input, never retried
    Validation(String),
    /// Missing or unknown credentials
    Unauthorized(String),
    /// Authenticated but not allowed
    Forbidden(String),
    /// Unknown entity id
    NotFound(String),
    /// Transition not allowed from the current status
    InvalidTransition { from: String, to: String },
    /// Caller exceeded its budget
    RateLimited(String),
    /// Store or queue failure after retries
    Store(anyhow::Error),
    /// Everything else
    Internal(String),
}

impl fmt::Display for OncallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OncallError::Validation(msg) => write!(f, "Invalid input: {}", msg),
            OncallError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            OncallError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            OncallError::NotFound(id) => write!(f, "Not found: {}", id),
            OncallError::InvalidTransition { from, to } => {
                write!(f, "Invalid transition from {} to {}", from, to)
            }
            OncallError::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            OncallError::Store(err) => write!(f, "Store error: {}", err),
            OncallError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for OncallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OncallError::Store(err) => err.source(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for OncallError {
    fn from(err: anyhow::Error) -> Self {
        OncallError::Store(err)
    }
}

impl From<serde_json::Error> for OncallError {
    fn from(err: serde_json::Error) -> Self {
        OncallError::Internal(err.to_string())
    }
}

impl IntoResponse for OncallError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            OncallError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            OncallError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            OncallError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            OncallError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            OncallError::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            OncallError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            // Internal details stay out of responses
            OncallError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            OncallError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Helper to build a not-found error
pub fn not_found(id: &str) -> OncallError {
    OncallError::NotFound(id.to_string())
}

/// Helper to build a validation error
pub fn invalid_input(msg: &str) -> OncallError {
    OncallError::Validation(msg.to_string())
}
