//! Core library for `vaultmirror`.
//!
//! Contains the concurrent config cache, the periodic refresh loop that keeps
//! it in step with the secret store, and the write-through path used by the
//! admin API. This crate depends on `vaultmirror-store` for the
//! [`SecretStore`](vaultmirror_store::SecretStore) trait and knows nothing
//! about HTTP.
//!
//! Lifecycle: the cache is created empty, primed once before traffic is
//! accepted, then mutated by exactly two call sites — the [`Refresher`] and
//! the [`SecretWriter`]. Handlers only read.

pub mod cache;
pub mod error;
pub mod refresh;
pub mod write;

pub use cache::{ConfigCache, Snapshot};
pub use error::{CacheError, RefreshError, WriteError};
pub use refresh::{RefreshStats, RefreshStatsSnapshot, Refresher, TickReport};
pub use vaultmirror_store::SecretMap;
pub use write::SecretWriter;
