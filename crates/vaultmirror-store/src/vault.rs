//! `HashiCorp` Vault KV v2 backend.
//!
//! Every scope (and every component written by the admin API) is one KV v2
//! secret at `{mount}/data/{deployment_id}/{scope}`. The secret's data object
//! is the scope's entry mapping. Writes are read-modify-write guarded by the
//! KV v2 check-and-set option, so two admins racing on the same component
//! cannot silently drop each other's keys.
//!
//! The token travels in `X-Vault-Token` and is never logged.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::{SecretMap, SecretStore, StoreError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`VaultStore`].
#[derive(Clone)]
pub struct VaultStoreConfig {
    /// Vault address, e.g. `http://127.0.0.1:8200`.
    pub address: String,
    /// Vault token sent with every request.
    pub token: String,
    /// KV v2 mount path (without slashes).
    pub mount: String,
    /// Deployment identifier prefixed to every secret path.
    pub deployment_id: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl Default for VaultStoreConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_owned(),
            token: String::new(),
            mount: "secret".to_owned(),
            deployment_id: "opendax".to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for VaultStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStoreConfig")
            .field("address", &self.address)
            .field("token", &"[redacted]")
            .field("mount", &self.mount)
            .field("deployment_id", &self.deployment_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Secret store backed by a Vault KV v2 engine.
pub struct VaultStore {
    client: reqwest::Client,
    address: String,
    token: String,
    mount: String,
    deployment_id: String,
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("address", &self.address)
            .field("mount", &self.mount)
            .field("deployment_id", &self.deployment_id)
            .finish_non_exhaustive()
    }
}

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct KvReadResponse {
    data: KvData,
}

#[derive(Deserialize)]
struct KvData {
    /// `null` when the latest version has been deleted.
    data: Option<SecretMap>,
    metadata: Option<KvMetadata>,
}

#[derive(Deserialize)]
struct KvMetadata {
    version: u64,
}

#[derive(Deserialize)]
struct VaultErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

impl VaultStore {
    /// Build a store client from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] if the address, mount, or
    /// deployment identifier is empty, or [`StoreError::Unavailable`] if the
    /// HTTP client cannot be constructed.
    pub fn new(config: VaultStoreConfig) -> Result<Self, StoreError> {
        if config.address.trim().is_empty() {
            return Err(StoreError::InvalidInput {
                reason: "vault address must not be empty".to_owned(),
            });
        }
        let mount = config.mount.trim_matches('/').to_owned();
        if mount.is_empty() {
            return Err(StoreError::InvalidInput {
                reason: "vault mount must not be empty".to_owned(),
            });
        }
        validate_path(&config.deployment_id)?;

        let timeout = if config.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            config.timeout
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vaultmirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Unavailable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            address: config.address.trim_end_matches('/').to_owned(),
            token: config.token,
            mount,
            deployment_id: config.deployment_id,
        })
    }

    /// Logical secret path of a scope, relative to the mount.
    fn secret_path(&self, scope: &str) -> Result<String, StoreError> {
        validate_path(scope)?;
        Ok(format!("{}/{}", self.deployment_id, scope))
    }

    fn data_url(&self, path: &str) -> String {
        let encoded = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/v1/{}/data/{encoded}", self.address, self.mount)
    }

    /// Read a secret along with its current KV version (`None` if absent).
    async fn read_versioned(&self, path: &str) -> Result<(SecretMap, Option<u64>), StoreError> {
        let resp = self
            .client
            .get(self.data_url(path))
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;

        // A soft-deleted latest version answers 404 but still carries its
        // metadata; the next write must check-and-set against that version.
        if status == StatusCode::NOT_FOUND {
            let version = serde_json::from_str::<KvReadResponse>(&text)
                .ok()
                .and_then(|parsed| parsed.data.metadata)
                .map(|m| m.version);
            debug!(path, ?version, "vault secret not found, treating as empty");
            return Ok((SecretMap::new(), version));
        }

        if !status.is_success() {
            return Err(rejection(status, &text));
        }

        let parsed: KvReadResponse =
            serde_json::from_str(&text).map_err(|e| StoreError::Malformed {
                reason: format!("KV v2 read of '{path}': {e}"),
            })?;

        Ok((
            parsed.data.data.unwrap_or_default(),
            parsed.data.metadata.map(|m| m.version),
        ))
    }
}

#[async_trait::async_trait]
impl SecretStore for VaultStore {
    async fn fetch_scope(&self, scope: &str) -> Result<SecretMap, StoreError> {
        let path = self.secret_path(scope)?;
        let (entries, _) = self.read_versioned(&path).await?;
        Ok(entries)
    }

    async fn write_secret(
        &self,
        component: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidInput {
                reason: "secret key must not be empty".to_owned(),
            });
        }
        let path = self.secret_path(component)?;
        let (mut entries, version) = self.read_versioned(&path).await?;
        entries.insert(key.to_owned(), value);

        // cas = 0 only succeeds if the secret does not exist yet.
        let body = serde_json::json!({
            "options": { "cas": version.unwrap_or(0) },
            "data": entries,
        });

        let resp = self
            .client
            .post(self.data_url(&path))
            .header("X-Vault-Token", &self.token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status.is_success() {
            debug!(path, key, "vault secret written");
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && text.contains("check-and-set") {
            return Err(StoreError::Conflict { path });
        }
        Err(rejection(status, &text))
    }

    fn name(&self) -> &'static str {
        "vault"
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Reject paths Vault would normalise into something else.
fn validate_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidInput {
            reason: "secret path must not be empty".to_owned(),
        });
    }
    if path.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
        return Err(StoreError::InvalidInput {
            reason: format!("secret path '{path}' contains an empty or relative segment"),
        });
    }
    if path.contains('\0') {
        return Err(StoreError::InvalidInput {
            reason: "null bytes are not allowed in secret paths".to_owned(),
        });
    }
    Ok(())
}

fn transport_error(err: reqwest::Error) -> StoreError {
    let reason = if err.is_timeout() {
        "request timed out".to_owned()
    } else {
        err.to_string()
    };
    StoreError::Unavailable { reason }
}

fn rejection(status: StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<VaultErrorBody>(body)
        .ok()
        .map(|b| b.errors.join("; "))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    StoreError::Rejected {
        status: status.as_u16(),
        message,
    }
}
