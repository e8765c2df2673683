//! In-memory secret store for testing and local development.
//!
//! This backend keeps every scope in a `BTreeMap` behind a `RwLock`. Nothing
//! is persisted — all data is lost when the process exits. Availability can
//! be toggled at runtime so callers can exercise outage handling without a
//! real network.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::{SecretMap, SecretStore, StoreError};

/// An in-memory secret store backed by a `BTreeMap` of scopes.
///
/// Cloning is cheap and clones share state, so a test can keep a handle to
/// the store it hands to the cache.
///
/// # Examples
///
/// ```
/// # use vaultmirror_store::{MemoryStore, SecretStore};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// store.write_secret("billing", "apiKey", "abc".into()).await.unwrap();
/// let billing = store.fetch_scope("billing").await.unwrap();
/// assert_eq!(billing["apiKey"], "abc");
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    scopes: Arc<RwLock<BTreeMap<String, SecretMap>>>,
    unavailable: Arc<AtomicBool>,
    fetches: Arc<AtomicU64>,
}

impl MemoryStore {
    /// Create a new empty, available store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole content of a scope, bypassing availability checks.
    pub async fn seed(&self, scope: &str, entries: SecretMap) {
        self.scopes.write().await.insert(scope.to_owned(), entries);
    }

    /// Toggle availability. While unavailable every call fails with
    /// [`StoreError::Unavailable`] and no data changes.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of `fetch_scope` calls served or refused so far.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "memory store marked unavailable".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SecretStore for MemoryStore {
    async fn fetch_scope(&self, scope: &str) -> Result<SecretMap, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let scopes = self.scopes.read().await;
        Ok(scopes.get(scope).cloned().unwrap_or_default())
    }

    async fn write_secret(
        &self,
        component: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        if component.is_empty() || key.is_empty() {
            return Err(StoreError::InvalidInput {
                reason: "component and key must not be empty".to_owned(),
            });
        }
        let mut scopes = self.scopes.write().await;
        scopes
            .entry(component.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn unknown_scope_is_empty() {
        let store = MemoryStore::new();
        let entries = store.fetch_scope("never/written").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn write_then_fetch() {
        let store = MemoryStore::new();
        store
            .write_secret("billing", "apiKey", json!("abc"))
            .await
            .unwrap();
        let entries = store.fetch_scope("billing").await.unwrap();
        assert_eq!(entries.get("apiKey"), Some(&json!("abc")));
    }

    #[tokio::test]
    async fn write_keeps_other_keys() {
        let store = MemoryStore::new();
        store
            .seed("billing", SecretMap::from([("region".to_owned(), json!("eu"))]))
            .await;
        store
            .write_secret("billing", "apiKey", json!("abc"))
            .await
            .unwrap();

        let entries = store.fetch_scope("billing").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["region"], json!("eu"));
    }

    #[tokio::test]
    async fn unavailable_store_refuses_everything() {
        let store = MemoryStore::new();
        store
            .seed("public", SecretMap::from([("featureX".to_owned(), json!(true))]))
            .await;
        store.set_available(false);

        assert!(matches!(
            store.fetch_scope("public").await,
            Err(StoreError::Unavailable { .. })
        ));
        assert!(matches!(
            store.write_secret("public", "featureY", json!(1)).await,
            Err(StoreError::Unavailable { .. })
        ));

        store.set_available(true);
        let entries = store.fetch_scope("public").await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn empty_key_is_rejected() {
        let store = MemoryStore::new();
        let result = store.write_secret("billing", "", json!("x")).await;
        assert!(matches!(result, Err(StoreError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        store.write_secret("a", "k", json!("v")).await.unwrap();
        assert_eq!(clone.fetch_scope("a").await.unwrap()["k"], json!("v"));
        assert_eq!(clone.fetch_count(), 1);
    }
}
