//! GitHub-hosted copy of the ledger document.
//!
//! Reads go to the raw content host with a cache-busting query parameter.
//! Writes are a read-modify-write against the contents API: fetch the
//! current blob `sha`, then PUT the whole document with that `sha` as the
//! precondition. A concurrent writer that got there first turns our PUT
//! into a rejected write instead of a silent overwrite.

use crate::config::RemoteConfig;
use crate::error::{LedgerError, Result};
use crate::types::{parse_collection, RepositoryRecord};
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("repoledger/", env!("CARGO_PKG_VERSION"));

/// Outcome of reading the remote document.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Document parsed as a record array (possibly empty).
    Found(Vec<RepositoryRecord>),
    /// No document at the configured path yet.
    NotFound,
    /// Document exists but is empty or not a JSON array.
    Malformed(String),
}

impl Fetched {
    /// Collapse to a collection; "not found" and "malformed" mean no data.
    pub fn into_records(self) -> Vec<RepositoryRecord> {
        match self {
            Fetched::Found(records) => records,
            Fetched::NotFound | Fetched::Malformed(_) => Vec::new(),
        }
    }
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReceipt {
    /// Version token the write was conditioned on (`None` = created).
    pub previous_version: Option<String>,
    /// New version token, when the API reported one.
    pub version: Option<String>,
}

#[derive(Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct ContentsEntry {
    sha: String,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    #[serde(default)]
    content: Option<ContentsEntry>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Client for the shared document.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    owner: String,
    repo: String,
    branch: String,
    path: String,
    api_base: String,
    raw_base: String,
}

impl RemoteStore {
    /// Build a store from configuration.
    ///
    /// Fails with [`LedgerError::NotConfigured`] when any of `token`,
    /// `owner`, `repo` or `branch` is missing.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            return Err(LedgerError::NotConfigured { missing });
        }
        let field = |value: &Option<String>| value.as_deref().unwrap_or_default().trim().to_string();
        let token = field(&config.token);

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| LedgerError::NotConfigured { missing: vec!["token"] })?;
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            owner: field(&config.owner),
            repo: field(&config.repo),
            branch: field(&config.branch),
            path: config.path.trim_matches('/').to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            raw_base: config.raw_base.trim_end_matches('/').to_string(),
        })
    }

    /// `owner/repo@branch:path`, for log lines and status output.
    pub fn target(&self) -> String {
        format!("{}/{}@{}:{}", self.owner, self.repo, self.branch, self.path)
    }

    fn encoded_path(&self) -> String {
        self.path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn raw_url(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base,
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo),
            urlencoding::encode(&self.branch),
            self.encoded_path()
        )
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo),
            self.encoded_path()
        )
    }

    /// Read and parse the shared document.
    pub async fn fetch_collection(&self) -> Result<Fetched> {
        let url = format!("{}?t={}", self.raw_url(), Utc::now().timestamp_millis());
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("No remote document at {}", self.target());
            return Ok(Fetched::NotFound);
        }
        if !status.is_success() {
            return Err(LedgerError::RemoteUnavailable(format!(
                "GET {} returned {}",
                self.target(),
                status
            )));
        }

        let body = response.text().await?;
        Ok(parse_document(&body))
    }

    /// Current blob `sha` of the document, or `None` if it does not exist yet.
    pub async fn fetch_version(&self) -> Result<Option<String>> {
        let url = format!(
            "{}?ref={}",
            self.contents_url(),
            urlencoding::encode(&self.branch)
        );
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            if status != StatusCode::NOT_FOUND {
                warn!("Version lookup for {} returned {}; writing without sha", self.target(), status);
            }
            return Ok(None);
        }

        let entry: ContentsEntry = response.json().await?;
        Ok(Some(entry.sha))
    }

    /// Replace the shared document with `records`.
    ///
    /// One attempt only. A rejected write (including a stale version
    /// token) comes back as [`LedgerError::RemoteWrite`].
    pub async fn write_collection(&self, records: &[RepositoryRecord]) -> Result<WriteReceipt> {
        let previous_version = self.fetch_version().await?;
        let body = PutContentsRequest {
            message: commit_message(Utc::now()),
            content: encode_document(records)?,
            branch: &self.branch,
            sha: previous_version.as_deref(),
        };

        let response = self.client.put(self.contents_url()).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(LedgerError::RemoteWrite {
                status: status.as_u16(),
                message,
            });
        }

        let version = response
            .json::<PutContentsResponse>()
            .await
            .ok()
            .and_then(|r| r.content)
            .map(|c| c.sha);

        info!("Wrote {} repositories to {}", records.len(), self.target());
        Ok(WriteReceipt {
            previous_version,
            version,
        })
    }
}

/// Parse a document body. Never fails; bad input is `Malformed`.
pub fn parse_document(body: &str) -> Fetched {
    if body.trim().is_empty() {
        return Fetched::Malformed("empty document".to_string());
    }
    match parse_collection(body) {
        Ok(records) => Fetched::Found(records),
        Err(reason) => Fetched::Malformed(reason),
    }
}

/// Pretty-printed (2-space) JSON, base64 encoded for the contents API.
pub fn encode_document(records: &[RepositoryRecord]) -> Result<String> {
    let json = serde_json::to_string_pretty(records)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json.as_bytes()))
}

fn commit_message(now: DateTime<Utc>) -> String {
    format!(
        "Update repositories data - {}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
