//! Integration tests for the `vaultmirror` HTTP API.
//!
//! Each test builds the full router over a [`MemoryStore`] and drives it with
//! `tower::ServiceExt::oneshot`, so no listener or external Vault is needed.
//! Refresh behaviour is exercised by calling [`Refresher::tick`] directly.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use vaultmirror_core::{ConfigCache, Refresher, SecretMap, SecretWriter};
use vaultmirror_server::routes::{self, APP_VERSION_HEADER, DEPLOYMENT_ID_HEADER};
use vaultmirror_server::state::AppState;
use vaultmirror_store::{MemoryStore, SecretStore};

struct Harness {
    app: Router,
    store: MemoryStore,
    refresher: Refresher,
}

/// Helper: seed the store, prime a cache from it, and build the router.
async fn harness(seed: &[(&str, SecretMap)], static_dir: Option<&std::path::Path>) -> Harness {
    let store = MemoryStore::new();
    for (scope, entries) in seed {
        store.seed(scope, entries.clone()).await;
    }

    let cache = Arc::new(ConfigCache::new());
    let refresher = Refresher::new(
        Arc::clone(&cache),
        Arc::new(store.clone()),
        vec!["public".to_owned(), "billing".to_owned()],
    );
    refresher.prime().await.unwrap();

    let state = Arc::new(AppState {
        cache: Arc::clone(&cache),
        writer: SecretWriter::new(cache, Arc::new(store.clone())),
        refresh_stats: refresher.stats(),
        public_scope: "public".to_owned(),
        deployment_id: "opendax-test".to_owned(),
        version: "9.9.9-test",
        store_name: "memory",
    });

    Harness {
        app: routes::build_router(state, static_dir),
        store,
        refresher,
    }
}

fn entries(pairs: &[(&str, Value)]) -> SecretMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

/// Helper: send a request and return (status, headers, body bytes).
async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Method::GET, uri, None).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// ── Public config ────────────────────────────────────────────────────

#[tokio::test]
async fn test_public_config_served_from_cache() {
    let h = harness(&[("public", entries(&[("featureX", json!(true))]))], None).await;

    let (status, body) = get_json(&h.app, "/api/v2/public/config").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"featureX": true}));
}

#[tokio::test]
async fn test_public_config_empty_when_scope_missing() {
    let h = harness(&[], None).await;

    let (status, body) = get_json(&h.app, "/api/v2/public/config").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_public_config_survives_store_outage() {
    let h = harness(&[("public", entries(&[("featureX", json!(true))]))], None).await;
    h.store.set_available(false);

    let report = h.refresher.tick().await;
    assert!(!report.is_success());

    let (status, body) = get_json(&h.app, "/api/v2/public/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"featureX": true}));
}

#[tokio::test]
async fn test_public_config_picks_up_store_changes_on_tick() {
    let h = harness(&[("public", entries(&[("featureX", json!(true))]))], None).await;
    h.store
        .seed("public", entries(&[("featureY", json!("on"))]))
        .await;

    assert!(h.refresher.tick().await.is_success());

    let (_, body) = get_json(&h.app, "/api/v2/public/config").await;
    assert_eq!(body, json!({"featureY": "on"}));
}

#[tokio::test]
async fn test_public_config_does_not_expose_other_scopes() {
    let h = harness(
        &[
            ("public", entries(&[("featureX", json!(true))])),
            ("billing", entries(&[("apiKey", json!("secret"))])),
        ],
        None,
    )
    .await;

    let (_, _, body) = send(&h.app, Method::GET, "/api/v2/public/config", None).await;

    assert!(!String::from_utf8_lossy(&body).contains("apiKey"));
}

// ── Admin ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_secrets_returns_every_scope() {
    let h = harness(
        &[
            ("public", entries(&[("featureX", json!(true))])),
            ("billing", entries(&[("apiKey", json!("abc"))])),
        ],
        None,
    )
    .await;

    let (status, body) = get_json(&h.app, "/api/v2/admin/secrets").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scopes"]["public"]["featureX"], json!(true));
    assert_eq!(body["scopes"]["billing"]["apiKey"], json!("abc"));
}

#[tokio::test]
async fn test_write_secret_visible_immediately() {
    let h = harness(&[], None).await;

    let (status, _, body) = send(
        &h.app,
        Method::PUT,
        "/api/v2/admin/billing/secret",
        Some(json!({"key": "apiKey", "value": "abc"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body,
        json!({"component": "billing", "key": "apiKey", "status": "ok"})
    );

    let (_, listed) = get_json(&h.app, "/api/v2/admin/secrets").await;
    assert_eq!(listed["scopes"]["billing"]["apiKey"], json!("abc"));
}

#[tokio::test]
async fn test_written_secret_survives_refresh() {
    let h = harness(&[], None).await;

    let (status, _, _) = send(
        &h.app,
        Method::PUT,
        "/api/v2/admin/billing/secret",
        Some(json!({"key": "apiKey", "value": {"id": 7}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(h.refresher.tick().await.is_success());

    let (_, listed) = get_json(&h.app, "/api/v2/admin/secrets").await;
    assert_eq!(listed["scopes"]["billing"]["apiKey"], json!({"id": 7}));
}

#[tokio::test]
async fn test_write_failure_leaves_cache_unchanged() {
    let h = harness(&[("billing", entries(&[("apiKey", json!("old"))]))], None).await;
    h.store.set_available(false);

    let (status, _, body) = send(
        &h.app,
        Method::PUT,
        "/api/v2/admin/billing/secret",
        Some(json!({"key": "apiKey", "value": "new"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "store_error");

    let (_, listed) = get_json(&h.app, "/api/v2/admin/secrets").await;
    assert_eq!(listed["scopes"]["billing"]["apiKey"], json!("old"));
}

#[tokio::test]
async fn test_write_rejects_invalid_component() {
    let h = harness(&[], None).await;

    let (status, _, body) = send(
        &h.app,
        Method::PUT,
        "/api/v2/admin/bad%20name/secret",
        Some(json!({"key": "apiKey", "value": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "bad_request");
    assert!(h.store.fetch_scope("bad name").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_write_rejects_empty_key() {
    let h = harness(&[], None).await;

    let (status, _, _) = send(
        &h.app,
        Method::PUT,
        "/api/v2/admin/billing/secret",
        Some(json!({"key": "", "value": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_write_rejects_malformed_body_as_json_error() {
    let h = harness(&[], None).await;

    let (status, headers, body) = send(
        &h.app,
        Method::PUT,
        "/api/v2/admin/billing/secret",
        Some(json!({"value": "abc"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/json")
    );
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("key"));
}

#[tokio::test]
async fn test_write_without_json_content_type_is_json_error() {
    let h = harness(&[], None).await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/api/v2/admin/billing/secret")
                .body(Body::from("key=apiKey"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "bad_request");
}

// ── System ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_version_and_response_headers() {
    let h = harness(&[], None).await;

    let (status, headers, body) = send(&h.app, Method::GET, "/api/v2/version", None).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body,
        json!({"version": "9.9.9-test", "deployment_id": "opendax-test"})
    );
    assert_eq!(headers[DEPLOYMENT_ID_HEADER], "opendax-test");
    assert_eq!(headers[APP_VERSION_HEADER], "9.9.9-test");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["cache-control"], "no-store");
}

#[tokio::test]
async fn test_error_responses_carry_headers() {
    let h = harness(&[], None).await;

    let (status, headers, _) = send(&h.app, Method::GET, "/api/v2/nope", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[DEPLOYMENT_ID_HEADER], "opendax-test");
}

#[tokio::test]
async fn test_health_reports_degraded_after_failed_tick() {
    let h = harness(&[("public", entries(&[("featureX", json!(true))]))], None).await;

    let (status, body) = get_json(&h.app, "/api/v2/sys/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["scopes"], 2);
    assert_eq!(body["consecutive_failures"], 0);
    assert_eq!(body["ticks"], 1);
    assert_eq!(body["failed_fetches"], 0);
    assert!(body["last_success"].is_string());

    h.store.set_available(false);
    h.refresher.tick().await;

    let (status, body) = get_json(&h.app, "/api/v2/sys/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["consecutive_failures"], 1);
    assert_eq!(body["failed_fetches"], 2);
    assert!(body["last_success"].is_string());
}

#[tokio::test]
async fn test_metrics_exposition() {
    let h = harness(
        &[(
            "public",
            entries(&[("featureX", json!(true)), ("theme", json!("dark"))]),
        )],
        None,
    )
    .await;
    h.store.set_available(false);
    h.refresher.tick().await;

    let (status, headers, body) = send(&h.app, Method::GET, "/api/v2/sys/metrics", None).await;
    let text = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(
        headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    assert!(text.contains("vaultmirror_cache_entries 2\n"), "{text}");
    assert!(text.contains("vaultmirror_refresh_ticks_total 2\n"), "{text}");
    assert!(text.contains("vaultmirror_refresh_failed_fetches_total 2\n"), "{text}");
    assert!(text.contains("vaultmirror_refresh_consecutive_failures 1\n"), "{text}");
    assert!(text.contains(
        "vaultmirror_info{version=\"9.9.9-test\",deployment_id=\"opendax-test\",store=\"memory\"} 1"
    ));
}

// ── Static assets ────────────────────────────────────────────────────

#[tokio::test]
async fn test_static_dir_fallback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>app</h1>").unwrap();

    let h = harness(&[], Some(dir.path())).await;

    let (status, _, body) = send(&h.app, Method::GET, "/index.html", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>app</h1>");

    let (status, _) = get_json(&h.app, "/api/v2/public/config").await;
    assert_eq!(status, StatusCode::OK);
}
