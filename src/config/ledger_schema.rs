//! Config section types for the `repoledger` binary.
//!
//! The `[remote]` section is `repo_ledger::RemoteConfig` itself; the
//! sections here only matter to the CLI.

use repo_ledger::MAX_TABLE_ROWS;
use serde::{Deserialize, Serialize};

// ── Identity ────────────────────────────────────────────────────

/// Default config directory name under `$HOME`.
pub const APP_DIR_NAME: &str = ".repoledger";

/// Environment variable consulted when `remote.token` is unset.
pub const TOKEN_ENV_VAR: &str = "REPOLEDGER_GITHUB_TOKEN";

// ── Local cache ─────────────────────────────────────────────────

/// Local fallback cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// SQLite file holding the mirrored collection. `~` is expanded.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    format!("~/{APP_DIR_NAME}/cache.db")
}

// ── Logging ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// error | warn | info | debug | trace. `RUST_LOG` overrides.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Ranking table ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableConfig {
    /// Rows shown by `list` when `--limit` is not given.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
        }
    }
}

fn default_max_rows() -> usize {
    MAX_TABLE_ROWS
}
