//! HTTP route modules for the `vaultmirror` API.
//!
//! All routes live under `/api/v2`. When a static directory is configured,
//! every other path falls through to it so the front-end can be served from
//! the same listener.

pub mod admin;
pub mod public;
pub mod sys;

use std::path::Path;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::get;
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Response header carrying the deployment identifier.
pub const DEPLOYMENT_ID_HEADER: &str = "x-deployment-id";

/// Response header carrying the application version.
pub const APP_VERSION_HEADER: &str = "x-app-version";

/// Maximum admin requests in flight across all admin routes together; each
/// one may hold a store connection.
const ADMIN_CONCURRENCY_LIMIT: usize = 16;

/// One permit pool shared by every route the layer is applied to.
fn admin_concurrency_limit() -> GlobalConcurrencyLimitLayer {
    GlobalConcurrencyLimitLayer::new(ADMIN_CONCURRENCY_LIMIT)
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Deployment ids are validated as non-empty, not as header-safe.
    let deployment_id = HeaderValue::from_str(&state.deployment_id)
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
    let version = HeaderValue::from_static(state.version);

    let mut app = Router::new()
        .nest(
            "/api/v2/admin",
            admin::router().layer(admin_concurrency_limit()),
        )
        .nest("/api/v2/public", public::router())
        .nest("/api/v2/sys", sys::router())
        .route("/api/v2/version", get(sys::version));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(DEPLOYMENT_ID_HEADER),
            deployment_id,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(APP_VERSION_HEADER),
            version,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
