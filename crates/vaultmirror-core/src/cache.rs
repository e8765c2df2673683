//! Concurrent config cache.
//!
//! The cache maps scope → entries. Each scope is held behind an
//! `Arc<SecretMap>`: a reader takes a clone of the `Arc` under the shared
//! guard and never sees a scope that is half-replaced. [`replace_scope`]
//! swaps the `Arc`; [`set_entry`] copy-on-writes it, so readers still holding
//! the previous mapping keep a complete copy.
//!
//! The guard is only ever held for in-memory work. Callers fetch from or
//! write to the store *before* calling into the cache.
//!
//! [`replace_scope`]: ConfigCache::replace_scope
//! [`set_entry`]: ConfigCache::set_entry

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use vaultmirror_store::SecretMap;

use crate::error::CacheError;

/// Full cache content: scope → entries.
pub type Snapshot = BTreeMap<String, SecretMap>;

/// In-memory mirror of secret store scopes.
#[derive(Debug, Default)]
pub struct ConfigCache {
    scopes: RwLock<HashMap<String, Arc<SecretMap>>>,
}

impl ConfigCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entries of a scope, or an empty mapping if the scope has never
    /// been populated.
    pub async fn read(&self, scope: &str) -> SecretMap {
        let entries = self.scopes.read().await.get(scope).cloned();
        entries.map(|e| (*e).clone()).unwrap_or_default()
    }

    /// Every populated scope with its entries.
    pub async fn snapshot(&self) -> Snapshot {
        let held: Vec<(String, Arc<SecretMap>)> = self
            .scopes
            .read()
            .await
            .iter()
            .map(|(scope, entries)| (scope.clone(), Arc::clone(entries)))
            .collect();

        held.into_iter()
            .map(|(scope, entries)| (scope, (*entries).clone()))
            .collect()
    }

    /// Install a complete new mapping for one scope. Other scopes are not
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::EmptyScope`] if `scope` is empty.
    pub async fn replace_scope(&self, scope: &str, entries: SecretMap) -> Result<(), CacheError> {
        if scope.is_empty() {
            return Err(CacheError::EmptyScope);
        }
        let entries = Arc::new(entries);
        self.scopes.write().await.insert(scope.to_owned(), entries);
        Ok(())
    }

    /// Install or overwrite a single key. All other keys of the scope and all
    /// other scopes are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::EmptyScope`] or [`CacheError::EmptyKey`] if an
    /// identifier is empty.
    pub async fn set_entry(
        &self,
        scope: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), CacheError> {
        if scope.is_empty() {
            return Err(CacheError::EmptyScope);
        }
        if key.is_empty() {
            return Err(CacheError::EmptyKey {
                scope: scope.to_owned(),
            });
        }

        let mut scopes = self.scopes.write().await;
        let slot = scopes.entry(scope.to_owned()).or_default();
        Arc::make_mut(slot).insert(key.to_owned(), value);
        Ok(())
    }

    /// Names of the populated scopes, sorted.
    pub async fn scopes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scopes.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of populated scopes.
    pub async fn len(&self) -> usize {
        self.scopes.read().await.len()
    }

    /// Whether no scope has been populated yet.
    pub async fn is_empty(&self) -> bool {
        self.scopes.read().await.is_empty()
    }

    /// Total number of entries across all scopes.
    pub async fn entry_count(&self) -> usize {
        self.scopes.read().await.values().map(|e| e.len()).sum()
    }
}
