//! Remote quote sources.
//!
//! # Responsibility
//! - Define the async contract the reconciler fetches through.
//! - Provide the HTTP implementation and its fixed item projection.
//!
//! # Invariants
//! - Remote payloads are untrusted; items go through the same quote decode
//!   as durable and imported data.
//! - Projected quotes always carry the `Server` category.

use crate::model::decode::{decode_quote, parse_array, PayloadError};
use crate::model::quote::Quote;
use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Category assigned to every remotely sourced quote.
pub const SERVER_CATEGORY: &str = "Server";
/// Number of remote items considered per fetch.
pub const DEFAULT_REMOTE_LIMIT: usize = 5;

/// Remote fetch failure. Always non-fatal for the caller.
#[derive(Debug)]
pub enum RemoteError {
    Transport(reqwest::Error),
    Timeout(Duration),
    Status(u16),
    Decode(PayloadError),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "remote request failed: {err}"),
            Self::Timeout(limit) => {
                write!(f, "remote request timed out after {} ms", limit.as_millis())
            }
            Self::Status(code) => write!(f, "remote responded with HTTP {code}"),
            Self::Decode(err) => write!(f, "remote payload rejected: {err}"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::Timeout(_) | Self::Status(_) => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

impl From<PayloadError> for RemoteError {
    fn from(value: PayloadError) -> Self {
        Self::Decode(value)
    }
}

/// Source of candidate quotes for reconciliation.
///
/// Implementations do not enforce a deadline; the reconciler bounds each
/// call with its configured fetch timeout.
#[async_trait]
pub trait RemoteQuoteSource: Send + Sync {
    /// Short label used in log lines.
    fn source_id(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<Quote>, RemoteError>;
}

/// Projects a raw remote JSON array into quotes.
///
/// Only the first `limit` items are considered. Each item's `title` becomes
/// the quote text; items without a usable string `title` are skipped.
///
/// # Errors
/// - Returns a payload error when `raw` is not JSON or not an array.
pub fn project_remote_items(raw: &str, limit: usize) -> Result<Vec<Quote>, PayloadError> {
    let items = parse_array(raw)?;
    let mut skipped = 0;
    let quotes: Vec<Quote> = items
        .iter()
        .take(limit)
        .filter_map(|item| {
            let candidate = json!({
                "text": item.get("title").cloned().unwrap_or(Value::Null),
                "category": SERVER_CATEGORY,
            });
            decode_quote(&candidate)
                .inspect_err(|_| skipped += 1)
                .ok()
        })
        .collect();
    if skipped > 0 {
        debug!("event=remote_project module=sync status=ok skipped={skipped}");
    }
    Ok(quotes)
}

/// HTTP GET source returning a JSON array of `{title, ...}` items.
pub struct HttpQuoteSource {
    endpoint: String,
    limit: usize,
    client: reqwest::Client,
}

impl HttpQuoteSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    pub fn with_client(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            limit: DEFAULT_REMOTE_LIMIT,
            client,
        }
    }

    /// Overrides how many remote items are considered per fetch.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteQuoteSource for HttpQuoteSource {
    fn source_id(&self) -> &str {
        "http"
    }

    async fn fetch(&self) -> Result<Vec<Quote>, RemoteError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(project_remote_items(&body, self.limit)?)
    }
}
