//! Secret store client abstraction for `vaultmirror`.
//!
//! This crate defines the [`SecretStore`] trait — the capability the config
//! cache mirrors. A store can fetch every key/value pair of a named scope and
//! write a single key/value pair under a named component. The cache never
//! implements storage itself.
//!
//! Two implementations are provided:
//!
//! - [`VaultStore`] — `HashiCorp` Vault KV v2 over HTTP (feature `vault-backend`)
//! - [`MemoryStore`] — in-memory, for tests and local development

mod error;
mod memory;
#[cfg(feature = "vault-backend")]
mod vault;

use std::collections::BTreeMap;

pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "vault-backend")]
pub use vault::{VaultStore, VaultStoreConfig};

/// Entries of a single scope: key → JSON value of arbitrary shape.
pub type SecretMap = BTreeMap<String, serde_json::Value>;

/// A pluggable secret store backend.
///
/// Scopes and components are opaque, non-empty identifiers. A value written
/// under component `c` is visible in scope `c` on the next fetch.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync + 'static {
    /// Fetch the complete current entry mapping of a scope.
    ///
    /// A scope that has never been written is returned as an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached,
    /// [`StoreError::Malformed`] if its response cannot be decoded, or
    /// [`StoreError::Rejected`] if it refuses the request.
    async fn fetch_scope(&self, scope: &str) -> Result<SecretMap, StoreError>;

    /// Write one key/value pair under a component, leaving other keys intact.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if a concurrent writer changed the
    /// component first, and the same errors as
    /// [`fetch_scope`](SecretStore::fetch_scope) otherwise.
    async fn write_secret(
        &self,
        component: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Short backend identifier used in logs and metrics.
    fn name(&self) -> &'static str;
}
