//! Server configuration for `vaultmirror`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Application settings use the `VAULTMIRROR_*` prefix; Vault connection
//! settings use the conventional `VAULT_*` names.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Secret store backend.
    pub store_backend: StoreBackendType,
    /// Deployment identifier: prefixes store paths and tags every response.
    pub deployment_id: String,
    /// Scopes kept fresh by the refresh loop. Always contains `public_scope`.
    pub refresh_scopes: Vec<String>,
    /// The one scope readable through the public config endpoint.
    pub public_scope: String,
    /// Seconds between refresh ticks.
    pub refresh_interval_secs: u64,
    /// Timeout in seconds for each store fetch and write.
    pub store_timeout_secs: u64,
    /// Refuse to start if the initial cache population fails.
    pub require_initial_sync: bool,
    /// Directory of pre-built front-end assets served as the fallback route.
    pub static_dir: Option<PathBuf>,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Skip disabling core dumps (for local debugging only).
    pub disable_hardening: bool,
}

/// Supported secret store backends.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreBackendType {
    /// In-memory (development only, starts empty).
    Memory,
    /// `HashiCorp` Vault KV v2.
    Vault {
        address: String,
        token: String,
        mount: String,
    },
}

impl std::fmt::Debug for StoreBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::Vault { address, mount, .. } => f
                .debug_struct("Vault")
                .field("address", address)
                .field("token", &"[redacted]")
                .field("mount", mount)
                .finish(),
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set to something that could not be parsed.
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// A variable that must be non-empty was empty.
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `PORT` — port to bind on all interfaces
    /// - `VAULTMIRROR_BIND_ADDR` — full bind address (overrides `PORT`, default: `127.0.0.1:8080`)
    /// - `VAULTMIRROR_STORE` — `vault` or `memory` (default: `vault`)
    /// - `VAULT_ADDR` — Vault address (default: `http://127.0.0.1:8200`)
    /// - `VAULT_TOKEN` — Vault token
    /// - `VAULT_MOUNT` — KV v2 mount (default: `secret`)
    /// - `VAULTMIRROR_DEPLOYMENT_ID` — deployment identifier (default: `opendax`)
    /// - `VAULTMIRROR_REFRESH_SCOPES` — comma-separated scopes (default: `public`)
    /// - `VAULTMIRROR_PUBLIC_SCOPE` — public scope (default: `public`)
    /// - `VAULTMIRROR_REFRESH_INTERVAL` — seconds between refreshes (default: `30`)
    /// - `VAULTMIRROR_STORE_TIMEOUT` — seconds per store call (default: `10`)
    /// - `VAULTMIRROR_REQUIRE_INITIAL_SYNC` — fail startup if priming fails (default: `true`)
    /// - `VAULTMIRROR_STATIC_DIR` — front-end asset directory (optional)
    /// - `VAULTMIRROR_LOG_LEVEL` — log filter (default: `info`)
    /// - `VAULTMIRROR_DISABLE_HARDENING` — keep core dumps enabled (default: `false`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable holds an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable holds an unusable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Priority: VAULTMIRROR_BIND_ADDR > PORT > default 127.0.0.1:8080
        let bind_addr = if let Some(addr) = lookup("VAULTMIRROR_BIND_ADDR") {
            addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "VAULTMIRROR_BIND_ADDR",
                value: addr.clone(),
                reason: e.to_string(),
            })?
        } else if let Some(port) = lookup("PORT") {
            SocketAddr::from(([0, 0, 0, 0], parse_number("PORT", &port)?))
        } else {
            SocketAddr::from(([127, 0, 0, 1], 8080))
        };

        let store_backend = match lookup("VAULTMIRROR_STORE")
            .unwrap_or_else(|| "vault".to_owned())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackendType::Memory,
            "vault" => StoreBackendType::Vault {
                address: lookup("VAULT_ADDR")
                    .unwrap_or_else(|| "http://127.0.0.1:8200".to_owned()),
                token: lookup("VAULT_TOKEN").unwrap_or_default(),
                mount: lookup("VAULT_MOUNT").unwrap_or_else(|| "secret".to_owned()),
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: "VAULTMIRROR_STORE",
                    value: other.to_owned(),
                    reason: "expected 'vault' or 'memory'".to_owned(),
                });
            }
        };

        let deployment_id =
            lookup("VAULTMIRROR_DEPLOYMENT_ID").unwrap_or_else(|| "opendax".to_owned());
        if deployment_id.trim().is_empty() {
            return Err(ConfigError::Empty {
                var: "VAULTMIRROR_DEPLOYMENT_ID",
            });
        }

        let public_scope =
            lookup("VAULTMIRROR_PUBLIC_SCOPE").unwrap_or_else(|| "public".to_owned());
        if public_scope.trim().is_empty() {
            return Err(ConfigError::Empty {
                var: "VAULTMIRROR_PUBLIC_SCOPE",
            });
        }

        let mut refresh_scopes = vec![public_scope.clone()];
        if let Some(raw) = lookup("VAULTMIRROR_REFRESH_SCOPES") {
            for scope in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if !refresh_scopes.iter().any(|s| s == scope) {
                    refresh_scopes.push(scope.to_owned());
                }
            }
        }

        let refresh_interval_secs: u64 = lookup("VAULTMIRROR_REFRESH_INTERVAL")
            .map(|v| parse_number("VAULTMIRROR_REFRESH_INTERVAL", &v))
            .transpose()?
            .unwrap_or(30);
        if refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "VAULTMIRROR_REFRESH_INTERVAL",
                value: "0".to_owned(),
                reason: "interval must be at least one second".to_owned(),
            });
        }

        let store_timeout_secs: u64 = lookup("VAULTMIRROR_STORE_TIMEOUT")
            .map(|v| parse_number("VAULTMIRROR_STORE_TIMEOUT", &v))
            .transpose()?
            .unwrap_or(10);

        let require_initial_sync = lookup("VAULTMIRROR_REQUIRE_INITIAL_SYNC")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let static_dir = lookup("VAULTMIRROR_STATIC_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let log_level = lookup("VAULTMIRROR_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let disable_hardening = lookup("VAULTMIRROR_DISABLE_HARDENING")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            bind_addr,
            store_backend,
            deployment_id,
            refresh_scopes,
            public_scope,
            refresh_interval_secs,
            store_timeout_secs,
            require_initial_sync,
            static_dir,
            log_level,
            disable_hardening,
        })
    }
}

fn parse_number<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_owned(),
        reason: e.to_string(),
    })
}
