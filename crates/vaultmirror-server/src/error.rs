//! HTTP error types for the `vaultmirror` server.
//!
//! Maps domain errors from `vaultmirror-core` into HTTP responses. Every
//! error produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use vaultmirror_core::WriteError;
use vaultmirror_store::StoreError;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Client sent invalid input.
    BadRequest(String),
    /// A concurrent writer changed the same component first.
    Conflict(String),
    /// The secret store failed or refused the operation.
    Store(String),
    /// The secret store did not answer in time.
    StoreTimeout(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Store(msg) => (StatusCode::BAD_GATEWAY, "store_error", msg),
            Self::StoreTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "store_timeout", msg),
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<WriteError> for AppError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::InvalidInput { .. } => Self::BadRequest(err.to_string()),
            WriteError::Timeout { .. } => Self::StoreTimeout(err.to_string()),
            WriteError::Store { ref source, .. } => match source {
                StoreError::Conflict { .. } => Self::Conflict(err.to_string()),
                StoreError::InvalidInput { .. } => Self::BadRequest(err.to_string()),
                StoreError::Unavailable { .. }
                | StoreError::Rejected { .. }
                | StoreError::Malformed { .. } => Self::Store(err.to_string()),
            },
        }
    }
}
