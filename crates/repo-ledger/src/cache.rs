//! Local fallback copy of the ledger.
//!
//! A single JSON blob in a SQLite key-value table. Written on every persist
//! attempt, read only when the remote document cannot be reached. Failures
//! are logged and swallowed: the cache is a mirror, never the source of truth.

use crate::error::Result;
use crate::types::{parse_collection, RepositoryRecord};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, warn};

/// Key the collection is stored under.
pub const CACHE_KEY: &str = "repositories-data-backup";

/// SQLite-backed key-value cache holding the last known collection.
///
/// The connection sits behind a `parking_lot::Mutex` so the cache can be
/// shared by reference without holding a guard across `.await`.
pub struct LocalCache {
    conn: Mutex<Connection>,
}

impl LocalCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn)
    }

    /// Open an in-memory cache (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key       TEXT PRIMARY KEY,
                value     TEXT NOT NULL,
                stored_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Overwrite the cached collection. Returns `false` (after logging) on failure.
    pub fn save(&self, records: &[RepositoryRecord]) -> bool {
        match self.try_save(records) {
            Ok(()) => {
                debug!("Cached {} repositories locally", records.len());
                true
            }
            Err(e) => {
                warn!("Failed to write local cache: {}", e);
                false
            }
        }
    }

    fn try_save(&self, records: &[RepositoryRecord]) -> Result<()> {
        let value = serde_json::to_string(records)?;
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, stored_at) VALUES (?1, ?2, ?3)",
            params![CACHE_KEY, value, stored_at],
        )?;
        Ok(())
    }

    /// Cached collection; empty when absent, corrupt, or not an array.
    pub fn load(&self) -> Vec<RepositoryRecord> {
        let raw = match self.raw_value() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read local cache: {}", e);
                return Vec::new();
            }
        };

        match parse_collection(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring unreadable local cache: {}", e);
                Vec::new()
            }
        }
    }

    /// When the cache was last written, if ever.
    pub fn stored_at(&self) -> Option<String> {
        self.conn
            .lock()
            .query_row(
                "SELECT stored_at FROM cache_entries WHERE key = ?1",
                params![CACHE_KEY],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten()
    }

    fn raw_value(&self) -> Result<Option<String>> {
        let value = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1",
                params![CACHE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    #[cfg(test)]
    fn put_raw(&self, value: &str) {
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, stored_at) VALUES (?1, ?2, 'x')",
                params![CACHE_KEY, value],
            )
            .unwrap();
    }
}
