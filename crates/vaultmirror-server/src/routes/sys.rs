//! System routes: `/api/v2/sys/*` and `/api/v2/version`
//!
//! Health, Prometheus metrics, and build information. None of these touch
//! the secret store; they only report what the cache and the refresh loop
//! already know.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use vaultmirror_core::RefreshStatsSnapshot;

use crate::state::AppState;

/// Build the `/api/v2/sys` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
}

// ── Response types ───────────────────────────────────────────────────

/// Response body for `GET /api/v2/version`.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub deployment_id: String,
}

/// Response body for `GET /api/v2/sys/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` while the last refresh succeeded, `degraded` while serving stale data.
    pub status: &'static str,
    /// Number of populated scopes.
    pub scopes: usize,
    /// Refresh loop counters.
    #[serde(flatten)]
    pub refresh: RefreshStatsSnapshot,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// `GET /api/v2/version` — application version and deployment identifier.
pub async fn version(State(state): State<Arc<AppState>>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.version,
        deployment_id: state.deployment_id.clone(),
    })
}

/// `GET /api/v2/sys/health` — always `200`; a degraded cache still serves.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let refresh = state.refresh_stats.snapshot();
    Json(HealthResponse {
        status: if refresh.consecutive_failures == 0 {
            "ok"
        } else {
            "degraded"
        },
        scopes: state.cache.len().await,
        refresh,
    })
}

/// `GET /api/v2/sys/metrics` — Prometheus text format metrics.
///
/// Exposes:
/// - `vaultmirror_cache_scopes` (gauge): populated scopes
/// - `vaultmirror_cache_entries` (gauge): entries across all scopes
/// - `vaultmirror_refresh_ticks_total` (counter): completed refresh ticks
/// - `vaultmirror_refresh_failed_fetches_total` (counter): failed scope fetches
/// - `vaultmirror_refresh_consecutive_failures` (gauge)
/// - `vaultmirror_refresh_last_success_timestamp_seconds` (gauge)
/// - `vaultmirror_info` (gauge): build info labels
async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.refresh_stats.snapshot();
    let scopes = state.cache.len().await;
    let entries = state.cache.entry_count().await;
    let last_success = stats.last_success.map_or(0, |t| t.timestamp());

    let mut body = String::with_capacity(1024);
    let mut metric = |name: &str, kind: &str, help: &str, value: &dyn std::fmt::Display| {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} {kind}");
        let _ = writeln!(body, "{name} {value}");
    };

    metric("vaultmirror_cache_scopes", "gauge", "Number of populated cache scopes.", &scopes);
    metric("vaultmirror_cache_entries", "gauge", "Number of cached entries across all scopes.", &entries);
    metric("vaultmirror_refresh_ticks_total", "counter", "Completed cache refresh ticks.", &stats.ticks);
    metric(
        "vaultmirror_refresh_failed_fetches_total",
        "counter",
        "Scope fetches that failed or timed out.",
        &stats.failed_fetches,
    );
    metric(
        "vaultmirror_refresh_consecutive_failures",
        "gauge",
        "Refresh ticks in a row with at least one failed scope.",
        &stats.consecutive_failures,
    );
    metric(
        "vaultmirror_refresh_last_success_timestamp_seconds",
        "gauge",
        "Unix time of the last fully successful refresh.",
        &last_success,
    );

    let _ = writeln!(body, "# HELP vaultmirror_info vaultmirror build information.");
    let _ = writeln!(body, "# TYPE vaultmirror_info gauge");
    let _ = writeln!(
        body,
        "vaultmirror_info{{version=\"{}\",deployment_id=\"{}\",store=\"{}\"}} 1",
        state.version,
        escape_label(&state.deployment_id),
        state.store_name
    );

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Escape a Prometheus label value.
fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
