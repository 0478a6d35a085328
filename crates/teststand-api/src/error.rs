//! Error types for the gateway API layer.
//!
//! [`ApiError`] unifies all failure modes into a single enum that is
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The
//! busy rejection maps to 429 so callers can distinguish "try again
//! later" from a malformed request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use teststand_core::coordinator::CoordinatorError;

/// Errors that can occur in the gateway API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required request field was missing or empty.
    #[error("{0}")]
    Validation(String),

    /// A test workflow is already in flight.
    #[error("{0}")]
    Busy(String),

    /// The requested resource was not found.
    #[error("{0}")]
    NotFound(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::MissingField(_) => Self::Validation(err.to_string()),
            CoordinatorError::Busy => Self::Busy(err.to_string()),
            CoordinatorError::Publish { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Busy(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Serialization(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("JSON error: {e}"))
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
