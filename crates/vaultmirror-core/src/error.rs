//! Error types for `vaultmirror-core`.
//!
//! Secret values never appear in error messages, only scope, component,
//! and key names.

use std::time::Duration;

use vaultmirror_store::StoreError;

/// Errors from cache mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Mutations require a non-empty scope identifier.
    #[error("scope must not be empty")]
    EmptyScope,

    /// Entry mutations require a non-empty key.
    #[error("key must not be empty (scope '{scope}')")]
    EmptyKey { scope: String },
}

/// Errors from populating the cache out of the secret store.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The store returned an error for a scope.
    #[error("failed to fetch scope '{scope}': {source}")]
    Fetch {
        scope: String,
        #[source]
        source: StoreError,
    },

    /// The store did not answer within the fetch timeout.
    #[error("fetching scope '{scope}' timed out after {timeout:?}")]
    Timeout { scope: String, timeout: Duration },

    /// The fetched data could not be installed.
    #[error("failed to install scope: {0}")]
    Cache(#[from] CacheError),
}

impl RefreshError {
    /// Whether the next tick may succeed without operator action.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch { source, .. } => source.is_transient(),
            Self::Timeout { .. } => true,
            Self::Cache(_) => false,
        }
    }
}

/// Errors from the write-through path.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The caller supplied an empty component or key.
    #[error("invalid write: {reason}")]
    InvalidInput { reason: String },

    /// The store refused or failed the write; the cache was not touched.
    #[error("store write for '{component}/{key}' failed: {source}")]
    Store {
        component: String,
        key: String,
        #[source]
        source: StoreError,
    },

    /// The store did not confirm the write in time; the cache was not touched.
    #[error("store write for '{component}/{key}' timed out after {timeout:?}")]
    Timeout {
        component: String,
        key: String,
        timeout: Duration,
    },
}
