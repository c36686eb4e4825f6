//! Types for the btdig search pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Timestamp reported when an age string could not be parsed.
pub const UNKNOWN_TIMESTAMP: i64 = -1;

/// Seed/leech count reported by sources that do not expose swarm data.
pub const UNKNOWN_COUNT: i64 = -1;

/// Query parameters for a btdig search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text search query.
    pub query: String,
    /// Category selector. Accepted for API compatibility, never sent to the site.
    #[serde(default)]
    pub category: SearchCategory,
}

impl SearchQuery {
    /// Create a query in the wildcard category.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: SearchCategory::All,
        }
    }

    /// Create a query from a raw category name, rejecting names the site does not support.
    pub fn with_category(query: impl Into<String>, category: &str) -> Result<Self, SearchError> {
        Ok(Self {
            query: query.into(),
            category: category.parse()?,
        })
    }
}

/// Content category for a search.
///
/// btdig indexes the DHT without categories, so only the wildcard exists.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    #[default]
    All,
}

impl SearchCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchCategory::All => "all",
        }
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchCategory {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SearchCategory::All),
            _ => Err(SearchError::UnsupportedCategory(s.to_string())),
        }
    }
}

/// A single scraped search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Magnet URI.
    pub link: String,
    /// Display title with markup removed.
    pub name: String,
    /// Human readable size as rendered by the site ("1.4 GB").
    pub size: String,
    /// Base URL of the site the record came from.
    pub engine_url: String,
    /// Absolute URL of the detail page.
    pub desc_link: String,
    /// Unix timestamp, or [`UNKNOWN_TIMESTAMP`].
    pub pub_date: i64,
    /// Always [`UNKNOWN_COUNT`] for this source.
    pub seeds: i64,
    /// Always [`UNKNOWN_COUNT`] for this source.
    pub leech: i64,
}

impl ResultRecord {
    /// Publication time, if the age string was understood.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        if self.pub_date == UNKNOWN_TIMESTAMP {
            return None;
        }
        DateTime::from_timestamp(self.pub_date, 0)
    }
}

/// Outcome of a completed search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchSummary {
    /// Pages the site reports for the query (at least 1, after any configured cap).
    pub total_pages: u32,
    /// Pages actually fetched.
    pub pages_fetched: u32,
    /// Records handed to the sink.
    pub records_emitted: u64,
    /// Result blocks dropped because a required field was missing.
    pub blocks_skipped: u64,
    /// Wall-clock time spent, delays included.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Errors raised by a [`PageFetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::ConnectionFailed(_) => "connection",
            FetchError::Timeout => "timeout",
            FetchError::Status { .. } => "status",
            FetchError::Body(_) => "body",
            FetchError::Request(_) => "request",
        }
    }
}

/// Errors that abort a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Unsupported category: {0}")]
    UnsupportedCategory(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Retrieves the raw content of a page.
///
/// Implementations own transport concerns: timeouts, retries, charset decoding.
/// Any error aborts the running search.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Receives records as soon as they are extracted, in document order.
pub trait ResultSink: Send {
    fn emit(&mut self, record: ResultRecord);
}

impl<F> ResultSink for F
where
    F: FnMut(ResultRecord) + Send,
{
    fn emit(&mut self, record: ResultRecord) {
        self(record)
    }
}

/// Source of the "now" anchor used to resolve relative ages.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
