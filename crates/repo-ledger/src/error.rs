//! Error types for the repository ledger.

use thiserror::Error;

/// Ledger error
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Network failure or a non-success status other than 404 on read
    #[error("remote document unavailable: {0}")]
    RemoteUnavailable(String),

    /// The contents API rejected a write (stale version token, auth, ...)
    #[error("GitHub API error ({status}): {message}")]
    RemoteWrite { status: u16, message: String },

    /// Required remote settings are absent; writes go to the local cache only
    #[error("remote store not configured (missing: {})", missing.join(", "))]
    NotConfigured { missing: Vec<&'static str> },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local cache database failure
    #[error("cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    /// Filesystem error while preparing the cache location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        LedgerError::RemoteUnavailable(e.to_string())
    }
}

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
