//! Reconciling façade over the remote document and the local cache.
//!
//! Reads always try the remote first and fall back to the cache only when
//! the remote is unreachable or unconfigured. Writes go to the remote when
//! configured and are mirrored to the cache either way; the returned
//! [`PersistOutcome`] says whether the shared copy was updated.

use crate::cache::LocalCache;
use crate::error::{LedgerError, Result};
use crate::remote::{Fetched, RemoteStore};
use crate::types::{combined_score, Metrics, MetricScores, RepoInfo, RepositoryRecord};
use chrono::{SubsecRound, Utc};
use tracing::{error, info, warn};

/// Where a loaded collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The remote document answered. Empty means "no data yet", authoritatively.
    Remote,
    /// Remote unreachable or unconfigured; contents come from the local cache.
    Degraded,
}

/// A loaded collection plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub records: Vec<RepositoryRecord>,
    pub source: LoadSource,
}

impl Loaded {
    pub fn is_degraded(&self) -> bool {
        self.source == LoadSource::Degraded
    }
}

/// What happened to the shared copy during a persist.
#[derive(Debug)]
pub enum SharedWrite {
    /// The remote document now holds the collection.
    Persisted { version: Option<String> },
    /// The remote rejected the write or could not be reached.
    Failed(LedgerError),
    /// No remote configured; nothing was shared.
    NotConfigured,
}

/// Result of writing the whole collection.
#[derive(Debug)]
pub struct PersistOutcome {
    pub shared: SharedWrite,
    pub local_persisted: bool,
}

impl PersistOutcome {
    /// Whether other clients will see this write.
    pub fn shared_persisted(&self) -> bool {
        matches!(self.shared, SharedWrite::Persisted { .. })
    }

    /// Turn a failed shared write back into an error.
    ///
    /// `NotConfigured` is a routing decision, not a failure, and maps to `Ok(false)`.
    pub fn into_result(self) -> Result<bool> {
        match self.shared {
            SharedWrite::Persisted { .. } => Ok(true),
            SharedWrite::NotConfigured => Ok(false),
            SharedWrite::Failed(e) => Err(e),
        }
    }
}

/// Result of an upsert: the full collection after the mutation.
#[derive(Debug)]
pub struct Upserted {
    pub records: Vec<RepositoryRecord>,
    pub outcome: PersistOutcome,
    /// Where the collection was read from before the mutation.
    pub source: LoadSource,
}

/// Result of a wallet update. `outcome` is `None` when nothing was found.
#[derive(Debug)]
pub struct WalletUpdate {
    pub found: bool,
    pub outcome: Option<PersistOutcome>,
    pub source: LoadSource,
}

/// Fields for one evaluation write.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub url: String,
    pub username: String,
    pub name: String,
    pub scores: MetricScores,
    pub info: RepoInfo,
    /// Empty keeps whatever wallet the record already has.
    pub wallet: String,
}

/// The ledger: one optional remote, one local cache.
pub struct RepositoryStore {
    remote: Option<RemoteStore>,
    cache: LocalCache,
}

impl RepositoryStore {
    pub fn new(remote: Option<RemoteStore>, cache: LocalCache) -> Self {
        Self { remote, cache }
    }

    /// Whether writes can reach the shared document.
    pub fn is_shared(&self) -> bool {
        self.remote.is_some()
    }

    pub fn remote(&self) -> Option<&RemoteStore> {
        self.remote.as_ref()
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Load the current collection. Never fails.
    pub async fn load(&self) -> Loaded {
        let Some(remote) = &self.remote else {
            let records = self.cache.load();
            info!("Remote not configured; loaded {} repositories from local cache", records.len());
            return Loaded {
                records,
                source: LoadSource::Degraded,
            };
        };

        match remote.fetch_collection().await {
            Ok(Fetched::Found(records)) => {
                info!("Loaded {} repositories from shared document", records.len());
                Loaded {
                    records,
                    source: LoadSource::Remote,
                }
            }
            Ok(Fetched::NotFound) => {
                info!("Shared document not found; starting empty");
                Loaded {
                    records: Vec::new(),
                    source: LoadSource::Remote,
                }
            }
            Ok(Fetched::Malformed(reason)) => {
                warn!("Shared document is malformed ({}); treating as empty", reason);
                Loaded {
                    records: Vec::new(),
                    source: LoadSource::Remote,
                }
            }
            Err(e) => {
                error!("Error loading shared document: {}", e);
                let records = self.cache.load();
                warn!("Using local cache backup ({} repositories)", records.len());
                Loaded {
                    records,
                    source: LoadSource::Degraded,
                }
            }
        }
    }

    /// Start-up load; same as [`load`](Self::load).
    pub async fn initialize(&self) -> Loaded {
        self.load().await
    }

    /// Insert or replace the record for `evaluation.url` and persist.
    pub async fn upsert(&self, evaluation: Evaluation) -> Upserted {
        let Loaded {
            mut records,
            source,
        } = self.load().await;
        let existing = records.iter().position(|r| r.url == evaluation.url);

        let wallet = match existing {
            Some(index) if evaluation.wallet.is_empty() => records[index].solana_wallet.clone(),
            _ => evaluation.wallet,
        };

        let metrics = Metrics::from_scores(&evaluation.scores);
        let record = RepositoryRecord {
            combined_score: combined_score(metrics.quality, metrics.hourly_earnings),
            url: evaluation.url,
            username: evaluation.username,
            name: evaluation.name,
            description: evaluation.info.description_or_default(),
            solana_wallet: wallet,
            metrics,
            // Millisecond precision, matching what the document stores.
            evaluated_at: Utc::now().trunc_subsecs(3),
        };

        match existing {
            Some(index) => records[index] = record,
            None => records.push(record),
        }

        self.warn_if_rebuilt_from_cache(source);
        let outcome = self.persist(&records).await;
        Upserted {
            records,
            outcome,
            source,
        }
    }

    /// Set the wallet on an existing record. Not found is `found == false`.
    pub async fn update_wallet(&self, url: &str, wallet: &str) -> WalletUpdate {
        let Loaded {
            mut records,
            source,
        } = self.load().await;
        let Some(record) = records.iter_mut().find(|r| r.url == url) else {
            return WalletUpdate {
                found: false,
                outcome: None,
                source,
            };
        };
        record.solana_wallet = wallet.to_string();

        self.warn_if_rebuilt_from_cache(source);
        let outcome = self.persist(&records).await;
        WalletUpdate {
            found: true,
            outcome: Some(outcome),
            source,
        }
    }

    /// A configured remote that could not be read is about to receive a
    /// collection built from the local cache.
    fn warn_if_rebuilt_from_cache(&self, source: LoadSource) {
        if source == LoadSource::Degraded && self.remote.is_some() {
            warn!(
                "Shared document could not be read; writing a collection rebuilt from the local cache"
            );
        }
    }

    /// Write the whole collection: remote when configured, local mirror always.
    pub async fn persist(&self, records: &[RepositoryRecord]) -> PersistOutcome {
        let Some(remote) = &self.remote else {
            warn!("Remote not configured; saved to local cache only (not shared with other users)");
            return PersistOutcome {
                shared: SharedWrite::NotConfigured,
                local_persisted: self.cache.save(records),
            };
        };

        let shared = match remote.write_collection(records).await {
            Ok(receipt) => SharedWrite::Persisted {
                version: receipt.version,
            },
            Err(e) => {
                error!("Failed to save shared document: {}", e);
                SharedWrite::Failed(e)
            }
        };

        PersistOutcome {
            shared,
            local_persisted: self.cache.save(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_store() -> RepositoryStore {
        RepositoryStore::new(None, LocalCache::open_in_memory().unwrap())
    }

    fn evaluation(url: &str, quality: f64, hourly_earnings: f64) -> Evaluation {
        Evaluation {
            url: url.to_string(),
            username: "acme".to_string(),
            name: url.rsplit('/').next().unwrap_or_default().to_string(),
            scores: MetricScores {
                quality,
                hourly_earnings,
                stars: 7,
                ..Default::default()
            },
            info: RepoInfo::default(),
            wallet: String::new(),
        }
    }

    #[tokio::test]
    async fn fresh_url_appends_one_record() {
        let store = local_store();
        store.upsert(evaluation("https://github.com/acme/a", 100.0, 50.0)).await;

        let result = store
            .upsert(evaluation("https://github.com/acme/b", 640.0, 250.0))
            .await;
        assert_eq!(result.records.len(), 2);

        let added = &result.records[1];
        assert_eq!(added.url, "https://github.com/acme/b");
        assert_eq!(added.combined_score, 640.0 + 250.0 / 100.0);
        assert_eq!(added.description, crate::types::DEFAULT_DESCRIPTION);
        assert!(matches!(result.outcome.shared, SharedWrite::NotConfigured));
        assert!(result.outcome.local_persisted);
        assert!(!result.outcome.shared_persisted());
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_url() {
        let store = local_store();
        let first = store
            .upsert(evaluation("https://github.com/acme/a", 100.0, 50.0))
            .await;
        let second = store
            .upsert(evaluation("https://github.com/acme/a", 100.0, 50.0))
            .await;
        assert_eq!(first.records.len(), 1);
        assert_eq!(second.records.len(), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let store = local_store();
        store.upsert(evaluation("https://github.com/acme/a", 100.0, 50.0)).await;
        store.upsert(evaluation("https://github.com/acme/b", 200.0, 60.0)).await;
        store.upsert(evaluation("https://github.com/acme/c", 300.0, 70.0)).await;

        let result = store
            .upsert(evaluation("https://github.com/acme/b", 900.0, 10.0))
            .await;
        let urls: Vec<&str> = result.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://github.com/acme/a",
                "https://github.com/acme/b",
                "https://github.com/acme/c"
            ]
        );
        assert_eq!(result.records[1].metrics.quality, 900);
    }

    #[tokio::test]
    async fn url_match_is_exact() {
        let store = local_store();
        store.upsert(evaluation("https://github.com/acme/a", 100.0, 50.0)).await;
        let result = store
            .upsert(evaluation("https://github.com/acme/a/", 100.0, 50.0))
            .await;
        assert_eq!(result.records.len(), 2);
    }

    #[tokio::test]
    async fn quality_is_clamped_on_write() {
        let store = local_store();
        for (url, raw, expected) in [
            ("https://github.com/acme/high", 1500.0, 1000),
            ("https://github.com/acme/tiny", 0.4, 1),
            ("https://github.com/acme/negative", -5.0, 1),
        ] {
            let result = store.upsert(evaluation(url, raw, 0.0)).await;
            let record = result.records.iter().find(|r| r.url == url).unwrap();
            assert_eq!(record.metrics.quality, expected, "input {raw}");
            assert_eq!(record.combined_score, expected as f64);
        }
    }

    #[tokio::test]
    async fn empty_wallet_keeps_existing_wallet() {
        let store = local_store();
        let mut first = evaluation("https://github.com/acme/a", 100.0, 50.0);
        first.wallet = "W1".to_string();
        store.upsert(first).await;

        let kept = store
            .upsert(evaluation("https://github.com/acme/a", 120.0, 55.0))
            .await;
        assert_eq!(kept.records[0].solana_wallet, "W1");

        let mut replace = evaluation("https://github.com/acme/a", 120.0, 55.0);
        replace.wallet = "W2".to_string();
        let replaced = store.upsert(replace).await;
        assert_eq!(replaced.records[0].solana_wallet, "W2");
    }

    #[tokio::test]
    async fn update_wallet_reports_found() {
        let store = local_store();
        store.upsert(evaluation("https://github.com/acme/a", 100.0, 50.0)).await;

        let missing = store.update_wallet("https://github.com/acme/zzz", "W9").await;
        assert!(!missing.found);
        assert!(missing.outcome.is_none());

        let updated = store.update_wallet("https://github.com/acme/a", "W9").await;
        assert!(updated.found);
        assert!(updated.outcome.unwrap().local_persisted);
        assert_eq!(store.load().await.records[0].solana_wallet, "W9");
    }

    #[tokio::test]
    async fn unconfigured_load_is_degraded_cache_read() {
        let store = local_store();
        let loaded = store.initialize().await;
        assert!(loaded.records.is_empty());
        assert!(loaded.is_degraded());
    }

    #[test]
    fn into_result_maps_outcomes() {
        let ok = PersistOutcome {
            shared: SharedWrite::Persisted { version: None },
            local_persisted: true,
        };
        assert!(ok.into_result().unwrap());

        let local = PersistOutcome {
            shared: SharedWrite::NotConfigured,
            local_persisted: true,
        };
        assert!(!local.into_result().unwrap());

        let failed = PersistOutcome {
            shared: SharedWrite::Failed(LedgerError::RemoteWrite {
                status: 409,
                message: "conflict".to_string(),
            }),
            local_persisted: true,
        };
        assert!(failed.into_result().is_err());
    }
}
