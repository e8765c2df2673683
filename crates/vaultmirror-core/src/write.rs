//! Write-through path for admin updates.
//!
//! A write goes to the secret store first. Only once the store confirms it is
//! the key installed in the cache, under the scope named after the component.
//! A failed or timed-out store write leaves the cache untouched, so the cache
//! never shows a value the store does not hold.
//!
//! The store write and the cache update are not atomic with respect to the
//! refresh loop. A refresh landing in between may briefly win; the next
//! refresh reconciles both against the store. Two concurrent writes to the
//! same key settle in store completion order.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use vaultmirror_store::SecretStore;

use crate::cache::ConfigCache;
use crate::error::WriteError;

/// Upper bound on a single store write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Writes secrets through to the store and then into the cache.
pub struct SecretWriter {
    cache: Arc<ConfigCache>,
    store: Arc<dyn SecretStore>,
    write_timeout: Duration,
}

impl std::fmt::Debug for SecretWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretWriter")
            .field("store", &self.store.name())
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl SecretWriter {
    /// Create a writer with the default write timeout.
    #[must_use]
    pub fn new(cache: Arc<ConfigCache>, store: Arc<dyn SecretStore>) -> Self {
        Self {
            cache,
            store,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    /// Override the store write timeout. A zero timeout keeps the default.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.write_timeout = timeout;
        }
        self
    }

    /// Write `key = value` under `component` in the store, then in the cache.
    ///
    /// # Errors
    ///
    /// - [`WriteError::InvalidInput`] if `component` or `key` is empty; the
    ///   store is not contacted.
    /// - [`WriteError::Store`] if the store rejects or fails the write.
    /// - [`WriteError::Timeout`] if the store does not answer in time.
    ///
    /// In every error case the cache is unchanged.
    pub async fn write(
        &self,
        component: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), WriteError> {
        if component.is_empty() {
            return Err(WriteError::InvalidInput {
                reason: "component must not be empty".to_owned(),
            });
        }
        if key.is_empty() {
            return Err(WriteError::InvalidInput {
                reason: "key must not be empty".to_owned(),
            });
        }

        let stored = tokio::time::timeout(
            self.write_timeout,
            self.store.write_secret(component, key, value.clone()),
        )
        .await;

        match stored {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                warn!(
                    component,
                    key,
                    error = %source,
                    transient = source.is_transient(),
                    "store write failed, cache untouched"
                );
                return Err(WriteError::Store {
                    component: component.to_owned(),
                    key: key.to_owned(),
                    source,
                });
            }
            Err(_) => {
                warn!(
                    component,
                    key,
                    timeout_secs = self.write_timeout.as_secs(),
                    "store write timed out, cache untouched"
                );
                return Err(WriteError::Timeout {
                    component: component.to_owned(),
                    key: key.to_owned(),
                    timeout: self.write_timeout,
                });
            }
        }

        // Identifiers were validated above, so the cache cannot refuse them.
        if let Err(e) = self.cache.set_entry(component, key, value).await {
            return Err(WriteError::InvalidInput {
                reason: e.to_string(),
            });
        }

        info!(component, key, "secret written through to store and cache");
        Ok(())
    }
}
