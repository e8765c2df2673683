//! Periodic cache refresh.
//!
//! [`Refresher::prime`] populates the cache once before the HTTP listener is
//! bound. [`Refresher::run`] then re-fetches every configured scope on a
//! fixed interval until shutdown is signalled. Ticks run strictly one after
//! another inside a single task, so there is never more than one refresh in
//! flight.
//!
//! A failed fetch leaves the cached scope exactly as it was: stale data wins
//! over no data. There is no backoff; the next tick is the retry. Each fetch
//! is bounded by a timeout so a hung store stalls one tick, not the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use vaultmirror_store::{SecretMap, SecretStore};

use crate::cache::ConfigCache;
use crate::error::RefreshError;

/// Refresh period of the reference deployment.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound on a single scope fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Consecutive failed ticks after which failures are logged at `error`.
const ESCALATE_AFTER_FAILURES: u32 = 5;

/// Counters describing refresh health, shared with the metrics endpoint.
#[derive(Debug, Default)]
pub struct RefreshStats {
    ticks: AtomicU64,
    failed_fetches: AtomicU64,
    consecutive_failures: AtomicU32,
    /// Unix seconds of the last fully successful tick, 0 if none yet.
    last_success: AtomicI64,
}

/// Point-in-time copy of [`RefreshStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshStatsSnapshot {
    /// Completed ticks, including the startup prime.
    pub ticks: u64,
    /// Individual scope fetches that failed or timed out.
    pub failed_fetches: u64,
    /// Ticks in a row with at least one failed scope.
    pub consecutive_failures: u32,
    /// When the last tick succeeded for every scope.
    pub last_success: Option<DateTime<Utc>>,
}

impl RefreshStats {
    /// Copy the current counter values.
    pub fn snapshot(&self) -> RefreshStatsSnapshot {
        let last = self.last_success.load(Ordering::Relaxed);
        RefreshStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            failed_fetches: self.failed_fetches.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_success: (last > 0)
                .then(|| DateTime::from_timestamp(last, 0))
                .flatten(),
        }
    }

    fn record_tick(&self, failed_scopes: usize) -> u32 {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if failed_scopes == 0 {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.last_success
                .store(Utc::now().timestamp(), Ordering::Relaxed);
            0
        } else {
            self.failed_fetches
                .fetch_add(failed_scopes as u64, Ordering::Relaxed);
            self.consecutive_failures
                .fetch_add(1, Ordering::Relaxed)
                .saturating_add(1)
        }
    }
}

/// Outcome of one refresh iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Scopes whose cached mapping was replaced.
    pub refreshed: Vec<String>,
    /// Scopes left untouched because their fetch failed.
    pub failed: Vec<String>,
}

impl TickReport {
    /// Whether every configured scope was refreshed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Keeps a [`ConfigCache`] within one interval of the secret store.
pub struct Refresher {
    cache: Arc<ConfigCache>,
    store: Arc<dyn SecretStore>,
    scopes: Vec<String>,
    interval: Duration,
    fetch_timeout: Duration,
    stats: Arc<RefreshStats>,
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("store", &self.store.name())
            .field("scopes", &self.scopes)
            .field("interval", &self.interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl Refresher {
    /// Create a refresher for the given scopes with the default interval and
    /// fetch timeout.
    #[must_use]
    pub fn new(cache: Arc<ConfigCache>, store: Arc<dyn SecretStore>, scopes: Vec<String>) -> Self {
        Self {
            cache,
            store,
            scopes,
            interval: DEFAULT_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            stats: Arc::new(RefreshStats::default()),
        }
    }

    /// Override the refresh period. A zero period keeps the default.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.interval = interval;
        }
        self
    }

    /// Override the per-scope fetch timeout. A zero timeout keeps the default.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.fetch_timeout = timeout;
        }
        self
    }

    /// Shared handle to the refresh counters.
    pub fn stats(&self) -> Arc<RefreshStats> {
        Arc::clone(&self.stats)
    }

    /// Populate every scope once, before traffic is accepted.
    ///
    /// Scopes that fetch successfully are installed even if another scope
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns the first scope's [`RefreshError`] if any scope could not be
    /// fetched.
    pub async fn prime(&self) -> Result<(), RefreshError> {
        let mut first_error = None;
        let mut failed = 0usize;

        for scope in &self.scopes {
            match self.refresh_scope(scope).await {
                Ok(count) => info!(scope = %scope, entries = count, "scope primed"),
                Err(e) => {
                    failed = failed.saturating_add(1);
                    warn!(
                        scope = %scope,
                        error = %e,
                        transient = e.is_transient(),
                        "initial scope fetch failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        self.stats.record_tick(failed);
        first_error.map_or(Ok(()), Err)
    }

    /// Run exactly one refresh iteration over all scopes.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        for scope in &self.scopes {
            match self.refresh_scope(scope).await {
                Ok(count) => {
                    debug!(scope = %scope, entries = count, "scope refreshed");
                    report.refreshed.push(scope.clone());
                }
                Err(e) => {
                    warn!(
                        scope = %scope,
                        error = %e,
                        transient = e.is_transient(),
                        "scope refresh failed, keeping cached data"
                    );
                    report.failed.push(scope.clone());
                }
            }
        }

        let consecutive_failures = self.stats.record_tick(report.failed.len());
        if consecutive_failures >= ESCALATE_AFTER_FAILURES {
            error!(
                consecutive_failures,
                failed = ?report.failed,
                "cache refresh persistently failing, secret store may be down"
            );
        }

        report
    }

    /// Refresh on a fixed period until `shutdown` flips or its sender is
    /// dropped. The first tick fires one full interval after the call.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.interval.as_secs(),
            scopes = ?self.scopes,
            "cache refresh loop started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    info!("cache refresh loop shutting down");
                    return;
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) as a background task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Fetch one scope and install it. Nothing is locked while fetching.
    async fn refresh_scope(&self, scope: &str) -> Result<usize, RefreshError> {
        let entries = self.fetch(scope).await?;
        let count = entries.len();
        self.cache.replace_scope(scope, entries).await?;
        Ok(count)
    }

    async fn fetch(&self, scope: &str) -> Result<SecretMap, RefreshError> {
        match tokio::time::timeout(self.fetch_timeout, self.store.fetch_scope(scope)).await {
            Ok(Ok(entries)) => Ok(entries),
            Ok(Err(source)) => Err(RefreshError::Fetch {
                scope: scope.to_owned(),
                source,
            }),
            Err(_) => Err(RefreshError::Timeout {
                scope: scope.to_owned(),
                timeout: self.fetch_timeout,
            }),
        }
    }
}
