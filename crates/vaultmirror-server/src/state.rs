//! Shared application state for the `vaultmirror` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. Handlers read the cache directly; the only
//! handler-side mutation goes through the [`SecretWriter`].

use std::sync::Arc;

use vaultmirror_core::{ConfigCache, RefreshStats, SecretWriter};

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// In-memory mirror of the secret store.
    pub cache: Arc<ConfigCache>,
    /// Write-through path for admin updates.
    pub writer: SecretWriter,
    /// Counters published by the refresh loop.
    pub refresh_stats: Arc<RefreshStats>,
    /// Scope exposed by the public config endpoint.
    pub public_scope: String,
    /// Deployment identifier attached to every response.
    pub deployment_id: String,
    /// Application version attached to every response.
    pub version: &'static str,
    /// Backend identifier of the secret store.
    pub store_name: &'static str,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("public_scope", &self.public_scope)
            .field("deployment_id", &self.deployment_id)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
