pub mod ledger_schema;

use anyhow::{Context, Result};
use repo_ledger::RemoteConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use ledger_schema::{CacheConfig, LoggingConfig, TableConfig, APP_DIR_NAME, TOKEN_ENV_VAR};

/// Top-level `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub table: TableConfig,
}

/// `~/.repoledger`, or `./.repoledger` when no home directory is known.
pub fn app_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(APP_DIR_NAME))
}

pub fn default_config_path() -> PathBuf {
    app_dir().join("config.toml")
}

impl Config {
    /// Load `path`. A missing file yields defaults (local-only mode).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());

        let mut config = if expanded.exists() {
            let content = fs::read_to_string(&expanded)
                .with_context(|| format!("Failed to read config file: {}", expanded.display()))?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(std::env::var(TOKEN_ENV_VAR).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML config")
    }

    /// Fill `remote.token` from the environment when the file leaves it unset.
    pub fn apply_env_overrides(&mut self, env_token: Option<String>) {
        let unset = self
            .remote
            .token
            .as_deref()
            .map_or(true, |t| t.trim().is_empty());
        if unset {
            if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
                self.remote.token = Some(token);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("remote.api_base", &self.remote.api_base),
            ("remote.raw_base", &self.remote.raw_base),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{name} must start with http:// or https://");
            }
        }

        if self.remote.path.trim_matches('/').is_empty() {
            anyhow::bail!("remote.path must name a file");
        }

        if self.table.max_rows == 0 {
            anyhow::bail!("table.max_rows must be at least 1");
        }

        Ok(())
    }

    /// Cache database path with `~` expanded.
    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.cache.db_path).as_ref())
    }
}
