//! Core types for the repository ledger.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

/// Placeholder stored when the upstream repository has no description.
pub const DEFAULT_DESCRIPTION: &str = "No description available";

/// Lowest stored quality score.
pub const QUALITY_MIN: u32 = 1;
/// Highest stored quality score.
pub const QUALITY_MAX: u32 = 1000;

/// One evaluated repository.
///
/// Other clients write this document too, so every field reads leniently:
/// nulls, missing keys and mistyped values become defaults instead of
/// failing the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    /// Repository URL. Unique within a collection, compared byte for byte.
    #[serde(default, deserialize_with = "tolerant::string")]
    pub url: String,
    /// Owner login.
    #[serde(default, deserialize_with = "tolerant::string")]
    pub username: String,
    /// Repository name.
    #[serde(default, deserialize_with = "tolerant::string")]
    pub name: String,
    /// Upstream description, or [`DEFAULT_DESCRIPTION`].
    #[serde(default = "default_description", deserialize_with = "tolerant::description")]
    pub description: String,
    /// Payout wallet. Empty means "not set yet".
    #[serde(default, deserialize_with = "tolerant::string")]
    pub solana_wallet: String,
    #[serde(default, deserialize_with = "tolerant::metrics")]
    pub metrics: Metrics,
    /// Time of the last evaluation write.
    #[serde(
        default,
        serialize_with = "iso_millis",
        deserialize_with = "tolerant::timestamp"
    )]
    pub evaluated_at: DateTime<Utc>,
    /// `quality + hourlyEarnings / 100`.
    #[serde(default, deserialize_with = "tolerant::float")]
    pub combined_score: f64,
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

impl RepositoryRecord {
    /// Whether a payout wallet has been recorded.
    pub fn has_wallet(&self) -> bool {
        !self.solana_wallet.is_empty()
    }
}

/// Stored metrics for a record. `quality` is already clamped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    #[serde(deserialize_with = "tolerant::float")]
    pub uniqueness: f64,
    #[serde(deserialize_with = "tolerant::quality")]
    pub quality: u32,
    #[serde(deserialize_with = "tolerant::float")]
    pub market_demand: f64,
    #[serde(deserialize_with = "tolerant::float")]
    pub hourly_earnings: f64,
    #[serde(deserialize_with = "tolerant::float")]
    pub rental_price: f64,
    #[serde(deserialize_with = "tolerant::float")]
    pub royalty_rate: f64,
    #[serde(deserialize_with = "tolerant::float")]
    pub annual_revenue: f64,
    #[serde(deserialize_with = "tolerant::count")]
    pub stars: u64,
    #[serde(deserialize_with = "tolerant::count")]
    pub forks: u64,
    #[serde(deserialize_with = "tolerant::count")]
    pub watchers: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            uniqueness: 0.0,
            quality: QUALITY_MIN,
            market_demand: 0.0,
            hourly_earnings: 0.0,
            rental_price: 0.0,
            royalty_rate: 0.0,
            annual_revenue: 0.0,
            stars: 0,
            forks: 0,
            watchers: 0,
        }
    }
}

/// Metrics as produced by the external scorer, before clamping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricScores {
    pub uniqueness: f64,
    pub quality: f64,
    pub market_demand: f64,
    pub hourly_earnings: f64,
    pub rental_price: f64,
    pub royalty_rate: f64,
    pub annual_revenue: f64,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub watchers: u64,
}

/// Extra repository details fetched alongside the scores.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RepoInfo {
    #[serde(default)]
    pub description: Option<String>,
}

impl RepoInfo {
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
        }
    }

    /// Description to store; empty and missing both fall back to the placeholder.
    pub fn description_or_default(&self) -> String {
        match self.description.as_deref() {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => default_description(),
        }
    }
}

/// Round then bound a raw quality score to `[QUALITY_MIN, QUALITY_MAX]`.
///
/// NaN maps to the floor.
pub fn clamp_quality(raw: f64) -> u32 {
    if raw.is_nan() {
        return QUALITY_MIN;
    }
    raw.round().clamp(QUALITY_MIN as f64, QUALITY_MAX as f64) as u32
}

/// Combined ranking score stored with each record.
pub fn combined_score(quality: u32, hourly_earnings: f64) -> f64 {
    quality as f64 + hourly_earnings / 100.0
}

impl Metrics {
    /// Build stored metrics from scorer output, clamping quality.
    pub fn from_scores(scores: &MetricScores) -> Self {
        Self {
            uniqueness: scores.uniqueness,
            quality: clamp_quality(scores.quality),
            market_demand: scores.market_demand,
            hourly_earnings: scores.hourly_earnings,
            rental_price: scores.rental_price,
            royalty_rate: scores.royalty_rate,
            annual_revenue: scores.annual_revenue,
            stars: scores.stars,
            forks: scores.forks,
            watchers: scores.watchers,
        }
    }
}

/// Read a collection document.
///
/// Any JSON array is a collection. Entries that are not records at all
/// (numbers, strings, nested arrays) are dropped with a warning; everything
/// else reads leniently.
pub fn parse_collection(body: &str) -> Result<Vec<RepositoryRecord>, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let Value::Array(items) = value else {
        return Err("document is not a JSON array".to_string());
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RepositoryRecord>(item) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Dropping entry {} of collection: {}", index, e),
        }
    }
    Ok(records)
}

/// `evaluatedAt` is written as `2026-01-02T03:04:05.678Z`.
fn iso_millis<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

mod tolerant {
    use super::{clamp_quality, Metrics, DEFAULT_DESCRIPTION};
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(number(&Value::deserialize(deserializer)?).unwrap_or(0.0))
    }

    /// Negative and NaN counts read as 0.
    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Ok(number(&Value::deserialize(deserializer)?)
            .map(|n| n.round() as u64)
            .unwrap_or(0))
    }

    /// Re-clamped on read; null is the floor.
    pub fn quality<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let raw = number(&Value::deserialize(deserializer)?).unwrap_or(f64::NAN);
        Ok(clamp_quality(raw))
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        })
    }

    pub fn description<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let text = string(deserializer)?;
        Ok(if text.is_empty() {
            DEFAULT_DESCRIPTION.to_string()
        } else {
            text
        })
    }

    pub fn metrics<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Metrics, D::Error> {
        match Value::deserialize(deserializer)? {
            value @ Value::Object(_) => serde_json::from_value(value).map_err(D::Error::custom),
            _ => Ok(Metrics::default()),
        }
    }

    /// Any RFC 3339 instant; anything else reads as the Unix epoch.
    pub fn timestamp<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let parsed = match Value::deserialize(deserializer)? {
            Value::String(s) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        };
        Ok(parsed.unwrap_or_default())
    }
}
