//! Configuration for the shared remote document.

use serde::{Deserialize, Serialize};

/// Document name inside the target repository.
pub const DEFAULT_DOCUMENT_PATH: &str = "repositories-data.json";

/// Remote (GitHub contents API) settings.
///
/// `token`, `owner`, `repo` and `branch` must all be present for the
/// remote store to be built; otherwise the ledger runs on the local cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    /// Personal access token with write access to `owner/repo`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Repository owner (user or organisation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Repository name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Branch the document lives on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Path of the JSON document within the repository.
    #[serde(default = "default_path")]
    pub path: String,
    /// Contents API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Raw content host used for reads.
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_path() -> String {
    DEFAULT_DOCUMENT_PATH.to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: None,
            repo: None,
            branch: None,
            path: default_path(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("token", &self.token),
            ("owner", &self.owner),
            ("repo", &self.repo),
            ("branch", &self.branch),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_configured(&self) -> bool {
        self.missing_fields().is_empty()
    }
}
