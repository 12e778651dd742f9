//! Read-only ranked views over the ledger.

use crate::store::{LoadSource, RepositoryStore};
use crate::types::RepositoryRecord;
use serde::Serialize;
use std::cmp::Ordering;

/// Rows shown in the ranking table by default.
pub const MAX_TABLE_ROWS: usize = 100;

/// One page of the ranking table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePage {
    pub displayed: Vec<RepositoryRecord>,
    pub total: usize,
    pub has_more: bool,
}

/// Sort by potential earnings, highest first. Equal earnings order by `url`.
pub fn rank_by_earnings(mut records: Vec<RepositoryRecord>) -> Vec<RepositoryRecord> {
    records.sort_by(|a, b| {
        b.metrics
            .hourly_earnings
            .partial_cmp(&a.metrics.hourly_earnings)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.url.cmp(&b.url))
    });
    records
}

/// First `limit` records of an already ranked collection.
pub fn paginate(ranked: Vec<RepositoryRecord>, limit: usize) -> TablePage {
    let total = ranked.len();
    let mut displayed = ranked;
    displayed.truncate(limit);
    TablePage {
        displayed,
        total,
        has_more: total > limit,
    }
}

/// Ranked views that always re-load through the store.
pub struct QueryView<'a> {
    store: &'a RepositoryStore,
}

impl<'a> QueryView<'a> {
    pub fn new(store: &'a RepositoryStore) -> Self {
        Self { store }
    }

    /// Whole collection, ranked by earnings.
    pub async fn sorted(&self) -> Vec<RepositoryRecord> {
        rank_by_earnings(self.store.load().await.records)
    }

    /// Top `limit` ranked records plus totals.
    pub async fn for_table(&self, limit: usize) -> TablePage {
        self.for_table_with_source(limit).await.0
    }

    /// [`for_table`](Self::for_table) plus where the rows were read from.
    pub async fn for_table_with_source(&self, limit: usize) -> (TablePage, LoadSource) {
        let loaded = self.store.load().await;
        (paginate(rank_by_earnings(loaded.records), limit), loaded.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalCache;
    use crate::types::{MetricScores, Metrics};
    use chrono::{TimeZone, Utc};

    fn make_record(url: &str, hourly_earnings: f64) -> RepositoryRecord {
        RepositoryRecord {
            url: url.to_string(),
            username: "acme".to_string(),
            name: "widgets".to_string(),
            description: "test".to_string(),
            solana_wallet: String::new(),
            metrics: Metrics::from_scores(&MetricScores {
                quality: 100.0,
                hourly_earnings,
                ..Default::default()
            }),
            evaluated_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            combined_score: 100.0 + hourly_earnings / 100.0,
        }
    }

    fn cached_store(records: &[RepositoryRecord]) -> RepositoryStore {
        let cache = LocalCache::open_in_memory().unwrap();
        assert!(cache.save(records));
        RepositoryStore::new(None, cache)
    }

    #[test]
    fn rank_is_non_increasing_in_earnings() {
        let ranked = rank_by_earnings(vec![
            make_record("a", 5.0),
            make_record("b", 80.0),
            make_record("c", 12.5),
            make_record("d", 80.0),
            make_record("e", 0.0),
        ]);
        for pair in ranked.windows(2) {
            assert!(pair[0].metrics.hourly_earnings >= pair[1].metrics.hourly_earnings);
        }
    }

    #[test]
    fn ties_break_on_url() {
        let ranked = rank_by_earnings(vec![
            make_record("https://github.com/z/z", 10.0),
            make_record("https://github.com/a/a", 10.0),
            make_record("https://github.com/m/m", 10.0),
        ]);
        let urls: Vec<&str> = ranked.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://github.com/a/a",
                "https://github.com/m/m",
                "https://github.com/z/z"
            ]
        );
    }

    #[test]
    fn paginate_truncates_and_flags_more() {
        let many: Vec<_> = (0..150)
            .map(|i| make_record(&format!("r{i}"), i as f64))
            .collect();
        let page = paginate(many, MAX_TABLE_ROWS);
        assert_eq!(page.displayed.len(), 100);
        assert_eq!(page.total, 150);
        assert!(page.has_more);

        let few: Vec<_> = (0..50)
            .map(|i| make_record(&format!("r{i}"), i as f64))
            .collect();
        let page = paginate(few, MAX_TABLE_ROWS);
        assert_eq!(page.displayed.len(), 50);
        assert_eq!(page.total, 50);
        assert!(!page.has_more);
    }

    #[test]
    fn exactly_limit_has_no_more() {
        let records: Vec<_> = (0..100).map(|i| make_record(&format!("r{i}"), 1.0)).collect();
        let page = paginate(records, 100);
        assert_eq!(page.displayed.len(), 100);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn for_table_is_idempotent() {
        let store = cached_store(&[
            make_record("a", 1.0),
            make_record("b", 3.0),
            make_record("c", 2.0),
        ]);
        let view = QueryView::new(&store);

        let first = view.for_table(2).await;
        let second = view.for_table(2).await;
        assert_eq!(first, second);
        assert_eq!(first.displayed[0].url, "b");
        assert_eq!(first.displayed[1].url, "c");
        assert_eq!(first.total, 3);
        assert!(first.has_more);

        let (_, source) = view.for_table_with_source(2).await;
        assert_eq!(source, LoadSource::Degraded);

        // Underlying storage order is untouched.
        let stored: Vec<String> = store.load().await.records.into_iter().map(|r| r.url).collect();
        assert_eq!(stored, vec!["a", "b", "c"]);
    }

    #[test]
    fn table_page_serializes_camel_case() {
        let page = paginate(vec![make_record("a", 1.0)], 10);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["hasMore"], false);
    }
}
