//! Shared repository evaluation ledger.
//!
//! The ledger is one JSON array of evaluated repositories kept in a GitHub
//! repository and read/written through the contents API, with a SQLite
//! mirror for offline or unconfigured use. Writes are conditioned on the
//! document's blob `sha`, so concurrent writers get a rejected write rather
//! than silently overwriting each other.

pub mod cache;
pub mod config;
pub mod error;
pub mod ranking;
pub mod remote;
pub mod store;
pub mod types;

pub use cache::LocalCache;
pub use config::RemoteConfig;
pub use error::{LedgerError, Result};
pub use ranking::{paginate, rank_by_earnings, QueryView, TablePage, MAX_TABLE_ROWS};
pub use remote::{Fetched, RemoteStore, WriteReceipt};
pub use store::{
    Evaluation, LoadSource, Loaded, PersistOutcome, RepositoryStore, SharedWrite, Upserted,
    WalletUpdate,
};
pub use types::{MetricScores, Metrics, RepoInfo, RepositoryRecord};
