//! Store error types.
//!
//! Every variant carries enough context to diagnose the problem without a
//! debugger. Tokens and secret values never appear in error messages.

/// Errors that can occur while talking to a secret store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached (network failure, timeout, outage).
    #[error("secret store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The store answered but refused the request.
    #[error("secret store rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The store answered with a body that could not be decoded.
    #[error("malformed secret store response: {reason}")]
    Malformed { reason: String },

    /// A check-and-set write lost against a concurrent writer.
    #[error("concurrent modification of '{path}'")]
    Conflict { path: String },

    /// The caller supplied an identifier the store cannot address.
    #[error("invalid store input: {reason}")]
    InvalidInput { reason: String },
}

impl StoreError {
    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } | Self::Conflict { .. } => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed { .. } | Self::InvalidInput { .. } => false,
        }
    }
}
