//! Public routes: `/api/v2/public/*`
//!
//! Read-only access to the single public scope, used by the front-end to
//! hydrate client-visible configuration. No other scope is reachable here.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use vaultmirror_core::SecretMap;

use crate::state::AppState;

/// Build the `/api/v2/public` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/config", get(public_config))
}

/// `GET /api/v2/public/config` — entries of the public scope, possibly empty
/// or stale but never an error.
async fn public_config(State(state): State<Arc<AppState>>) -> Json<SecretMap> {
    Json(state.cache.read(&state.public_scope).await)
}
