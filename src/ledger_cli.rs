//! CLI subcommands for the repository ledger.
//!
//! Provides `repoledger list`, `show <url>`, `upsert ...`, `wallet <url> <address>`
//! and `status` on top of the configured store.

use anyhow::{Context, Result};
use clap::Subcommand;
use repo_ledger::{
    Evaluation, LedgerError, LoadSource, LocalCache, MetricScores, PersistOutcome, QueryView,
    RemoteStore, RepoInfo, RepositoryRecord, RepositoryStore, SharedWrite, TablePage,
};
use std::io::Read;

use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum LedgerCommands {
    /// Show the ranking table (highest potential earnings first)
    List {
        /// Maximum rows to display (default: table.max_rows)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single repository by URL
    Show {
        /// Repository URL (exact match)
        url: String,
    },
    /// Record an evaluation, inserting or replacing by URL
    Upsert {
        /// Repository URL
        #[arg(long)]
        url: String,
        /// Owner login
        #[arg(long)]
        username: String,
        /// Repository name
        #[arg(long)]
        name: String,
        /// Scorer output as a JSON file ("-" reads stdin)
        #[arg(long)]
        metrics: String,
        /// Repository description
        #[arg(long)]
        description: Option<String>,
        /// Payout wallet; omit to keep the current one
        #[arg(long, default_value = "")]
        wallet: String,
    },
    /// Set the payout wallet of an existing repository
    Wallet {
        /// Repository URL (exact match)
        url: String,
        /// Wallet address
        address: String,
    },
    /// Show configuration state and where reads come from
    Status,
}

/// Build the store from config. Missing remote settings mean local-only mode.
pub fn open_store(config: &Config) -> Result<RepositoryStore> {
    let remote = match RemoteStore::from_config(&config.remote) {
        Ok(remote) => Some(remote),
        Err(LedgerError::NotConfigured { missing }) => {
            tracing::warn!(
                "GitHub remote not configured (missing: {}); data stays local",
                missing.join(", ")
            );
            None
        }
        Err(e) => return Err(e).context("Failed to create GitHub client"),
    };

    let cache_path = config.cache_path();
    let cache = LocalCache::open(&cache_path)
        .with_context(|| format!("Failed to open local cache: {}", cache_path.display()))?;

    Ok(RepositoryStore::new(remote, cache))
}

/// Read scorer output from a file, or stdin for "-".
pub fn read_scores(source: &str) -> Result<MetricScores> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read metrics from stdin")?;
        buf
    } else {
        let path = shellexpand::tilde(source);
        std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read metrics file: {source}"))?
    };
    serde_json::from_str(&raw).context("Metrics must be a JSON object of scorer output")
}

pub async fn handle_command(cmd: LedgerCommands, config: &Config) -> Result<()> {
    let store = open_store(config)?;

    match cmd {
        LedgerCommands::List { limit, json } => {
            let limit = limit.unwrap_or(config.table.max_rows);
            let (page, source) = QueryView::new(&store).for_table_with_source(limit).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_table(&page);
            }
            warn_if_degraded(source);
        }

        LedgerCommands::Show { url } => {
            let loaded = store.load().await;
            match loaded.records.iter().find(|r| r.url == url) {
                Some(record) => print_record(record),
                None => println!("No repository found for URL: {url}"),
            }
            warn_if_degraded(loaded.source);
        }

        LedgerCommands::Upsert {
            url,
            username,
            name,
            metrics,
            description,
            wallet,
        } => {
            let scores = read_scores(&metrics)?;
            let result = store
                .upsert(Evaluation {
                    url: url.clone(),
                    username,
                    name,
                    scores,
                    info: RepoInfo { description },
                    wallet,
                })
                .await;
            if let Some(record) = result.records.iter().find(|r| r.url == url) {
                println!(
                    "Saved {} (quality {}, combined {:.2}); {} repositories total",
                    record.url,
                    record.metrics.quality,
                    record.combined_score,
                    result.records.len()
                );
            }
            warn_if_rebuilt(&store, result.source);
            report_persist(result.outcome)?;
        }

        LedgerCommands::Wallet { url, address } => {
            let update = store.update_wallet(&url, &address).await;
            match update.outcome {
                Some(outcome) => {
                    println!("Wallet set for {url}");
                    warn_if_rebuilt(&store, update.source);
                    report_persist(outcome)?;
                }
                None => println!("No repository found for URL: {url}"),
            }
        }

        LedgerCommands::Status => {
            match store.remote() {
                Some(remote) => println!("Remote:  {}", remote.target()),
                None => println!(
                    "Remote:  not configured (missing: {})",
                    config.remote.missing_fields().join(", ")
                ),
            }
            println!("Cache:   {}", config.cache_path().display());
            if let Some(at) = store.cache().stored_at() {
                println!("Cached:  {at}");
            }
            let loaded = store.initialize().await;
            let source = match loaded.source {
                LoadSource::Remote => "shared document",
                LoadSource::Degraded => "local cache (degraded)",
            };
            println!("Source:  {source}");
            println!("Entries: {}", loaded.records.len());
        }
    }

    Ok(())
}

/// Print where a write landed; a failed shared write becomes an error.
fn report_persist(outcome: PersistOutcome) -> Result<()> {
    let local = if outcome.local_persisted {
        "local copy saved"
    } else {
        "local copy NOT saved"
    };
    match &outcome.shared {
        SharedWrite::Persisted { version } => match version {
            Some(v) => println!("✓ Shared document updated (sha {v}); {local}"),
            None => println!("✓ Shared document updated; {local}"),
        },
        SharedWrite::NotConfigured => {
            println!("⚠ Remote not configured: {local}, not shared with other users")
        }
        SharedWrite::Failed(_) => println!("✗ Shared write failed; {local}"),
    }
    outcome
        .into_result()
        .map(|_| ())
        .context("Shared write failed; reload and retry to publish this change")
}

fn warn_if_degraded(source: LoadSource) {
    if source == LoadSource::Degraded {
        eprintln!("⚠ Showing local cache; the shared document was not read");
    }
}

fn warn_if_rebuilt(store: &RepositoryStore, source: LoadSource) {
    if store.is_shared() && source == LoadSource::Degraded {
        eprintln!("⚠ Shared document was not readable; this write was built from the local cache");
    }
}

fn print_table(page: &TablePage) {
    if page.displayed.is_empty() {
        println!("No repositories evaluated yet.");
        return;
    }

    println!(
        "{:>4}  {:<32} {:<18} {:>7} {:>12} {:>10}  {}",
        "#", "Repository", "Owner", "Quality", "Earnings/h", "Combined", "Wallet"
    );
    for (i, record) in page.displayed.iter().enumerate() {
        println!(
            "{:>4}  {:<32} {:<18} {:>7} {:>12.2} {:>10.2}  {}",
            i + 1,
            truncate(&record.name, 32),
            truncate(&record.username, 18),
            record.metrics.quality,
            record.metrics.hourly_earnings,
            record.combined_score,
            if record.has_wallet() { "yes" } else { "-" }
        );
    }
    if page.has_more {
        println!(
            "Showing {} of {} repositories.",
            page.displayed.len(),
            page.total
        );
    }
}

fn print_record(record: &RepositoryRecord) {
    let m = &record.metrics;
    println!("URL:         {}", record.url);
    println!("Name:        {}/{}", record.username, record.name);
    println!("Description: {}", record.description);
    if record.has_wallet() {
        println!("Wallet:      {}", record.solana_wallet);
    }
    println!("Evaluated:   {}", record.evaluated_at.to_rfc3339());
    println!("Combined:    {:.2}", record.combined_score);
    println!("---");
    println!("Quality {} · Uniqueness {} · Market demand {}", m.quality, m.uniqueness, m.market_demand);
    println!(
        "Earnings/h {:.2} · Rental {:.2} · Royalty {} · Annual revenue {:.2}",
        m.hourly_earnings, m.rental_price, m.royalty_rate, m.annual_revenue
    );
    println!("Stars {} · Forks {} · Watchers {}", m.stars, m.forks, m.watchers);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
