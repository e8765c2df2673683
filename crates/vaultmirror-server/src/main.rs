//! `vaultmirror` server entry point.
//!
//! Bootstraps the secret store, primes the config cache, and starts the Axum
//! HTTP server with graceful shutdown. A background refresh loop keeps the
//! cache in sync with the store and is stopped on shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use vaultmirror_core::{ConfigCache, Refresher, SecretWriter};
use vaultmirror_store::{MemoryStore, SecretStore};

use vaultmirror_server::config::{ServerConfig, StoreBackendType};
use vaultmirror_server::hardening;
use vaultmirror_server::routes;
use vaultmirror_server::state::AppState;

/// How long to wait for the refresh loop to stop after the server exits.
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Runs before logging is initialized, so warnings go to stderr.
    apply_hardening(&config);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(
        store = ?config.store_backend,
        deployment_id = %config.deployment_id,
        scopes = ?config.refresh_scopes,
        "vaultmirror starting"
    );

    let store = build_store(&config)?;
    let store_timeout = Duration::from_secs(config.store_timeout_secs);

    let cache = Arc::new(ConfigCache::new());
    let refresher = Refresher::new(
        Arc::clone(&cache),
        Arc::clone(&store),
        config.refresh_scopes.clone(),
    )
    .with_interval(Duration::from_secs(config.refresh_interval_secs))
    .with_fetch_timeout(store_timeout);

    if let Err(e) = refresher.prime().await {
        if config.require_initial_sync {
            return Err(e).context("initial cache population failed");
        }
        warn!(error = %e, "initial cache population failed, starting with partial cache");
    }

    let state = Arc::new(AppState {
        cache: Arc::clone(&cache),
        writer: SecretWriter::new(cache, Arc::clone(&store)).with_write_timeout(store_timeout),
        refresh_stats: refresher.stats(),
        public_scope: config.public_scope.clone(),
        deployment_id: config.deployment_id.clone(),
        version: env!("CARGO_PKG_VERSION"),
        store_name: store.name(),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_handle = refresher.spawn(shutdown_rx);

    let app = routes::build_router(Arc::clone(&state), config.static_dir.as_deref());

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "vaultmirror listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("server error")?;

    info!("waiting for refresh loop to stop");
    if tokio::time::timeout(WORKER_SHUTDOWN_TIMEOUT, refresh_handle)
        .await
        .is_err()
    {
        warn!("refresh loop did not stop in time");
    }

    info!("vaultmirror stopped");
    Ok(())
}

/// Construct the configured secret store backend.
fn build_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn SecretStore>> {
    match &config.store_backend {
        StoreBackendType::Memory => {
            warn!("using in-memory secret store (starts empty, writes do not persist)");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "vault-backend")]
        StoreBackendType::Vault {
            address,
            token,
            mount,
        } => {
            info!(address = %address, mount = %mount, "using Vault KV v2 secret store");
            let store = vaultmirror_store::VaultStore::new(vaultmirror_store::VaultStoreConfig {
                address: address.clone(),
                token: token.clone(),
                mount: mount.clone(),
                deployment_id: config.deployment_id.clone(),
                timeout: Duration::from_secs(config.store_timeout_secs),
            })
            .context("failed to create Vault client")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "vault-backend"))]
        StoreBackendType::Vault { .. } => {
            anyhow::bail!("Vault store requested but feature 'vault-backend' is not enabled");
        }
    }
}

/// Wait for SIGINT or SIGTERM, then broadcast shutdown.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    let _ = shutdown_tx.send(true);
}

/// Apply process hardening before logging is initialized.
///
/// Uses `eprintln` because structured logging is not yet available.
#[allow(clippy::print_stderr)]
fn apply_hardening(config: &ServerConfig) {
    if config.disable_hardening {
        eprintln!(
            "WARNING: hardening disabled via VAULTMIRROR_DISABLE_HARDENING, core dumps may contain secrets"
        );
    } else if let Err(e) = hardening::disable_core_dumps() {
        eprintln!("WARNING: failed to disable core dumps: {e}");
    }
}
