//! Admin routes: `/api/v2/admin/*`
//!
//! Lists every cached scope and writes single secrets through to the store.
//! Callers are expected to be authenticated upstream.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use vaultmirror_core::Snapshot;

use crate::error::AppError;
use crate::state::AppState;

/// Validate a component path segment.
///
/// - Only alphanumeric, `_`, `-`, `.` characters allowed.
/// - No `..` path traversal.
/// - Maximum 128 bytes.
fn validate_component(component: &str) -> Result<(), AppError> {
    if component.is_empty() {
        return Err(AppError::BadRequest(
            "component must not be empty".to_owned(),
        ));
    }

    if component.len() > 128 {
        return Err(AppError::BadRequest(
            "component exceeds maximum length of 128 bytes".to_owned(),
        ));
    }

    if component.contains("..") {
        return Err(AppError::BadRequest(
            "path traversal (..) is not allowed".to_owned(),
        ));
    }

    if !component
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(AppError::BadRequest(
            "component may only contain alphanumeric characters, '_', '-', and '.'".to_owned(),
        ));
    }

    Ok(())
}

/// Build the `/api/v2/admin` router.
///
/// Paths:
/// - `GET /api/v2/admin/secrets` — full cache snapshot
/// - `PUT /api/v2/admin/{component}/secret` — write-through
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/secrets", get(list_secrets))
        .route("/{component}/secret", put(set_secret))
}

// ── Request / Response types ─────────────────────────────────────────

/// Response body for `GET /api/v2/admin/secrets`.
#[derive(Debug, Serialize)]
pub struct SecretsResponse {
    /// Every cached scope with its entries.
    pub scopes: Snapshot,
}

/// Request body for `PUT /api/v2/admin/{component}/secret`.
#[derive(Debug, Deserialize)]
pub struct SetSecretRequest {
    pub key: String,
    pub value: serde_json::Value,
}

/// Response body for a successful write.
#[derive(Debug, Serialize)]
pub struct SetSecretResponse {
    pub component: String,
    pub key: String,
    pub status: &'static str,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list_secrets(State(state): State<Arc<AppState>>) -> Json<SecretsResponse> {
    Json(SecretsResponse {
        scopes: state.cache.snapshot().await,
    })
}

async fn set_secret(
    State(state): State<Arc<AppState>>,
    Path(component): Path<String>,
    payload: Result<Json<SetSecretRequest>, JsonRejection>,
) -> Result<Json<SetSecretResponse>, AppError> {
    validate_component(&component)?;
    let Json(body) = payload?;

    state.writer.write(&component, &body.key, body.value).await?;

    Ok(Json(SetSecretResponse {
        component,
        key: body.key,
        status: "ok",
    }))
}
