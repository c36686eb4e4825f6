//! btdig search engine.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, EngineConfig};
use crate::metrics::SEARCH_DURATION;

use super::extractor::BlockExtractor;
use super::http::HttpFetcher;
use super::paginator::{PaginationSettings, Paginator};
use super::{
    Clock, PageFetcher, ResultRecord, ResultSink, SearchError, SearchQuery, SearchSummary,
    SystemClock,
};

/// Default site root.
pub const BTDIG_URL: &str = "https://btdig.com";

/// Searches btdig and streams the scraped records.
pub struct BtdigSearcher {
    fetcher: Arc<dyn PageFetcher>,
    paginator: Paginator,
}

impl BtdigSearcher {
    /// Create a searcher using the system clock.
    pub fn new(config: &EngineConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Self, SearchError> {
        Self::with_clock(config, fetcher, Arc::new(SystemClock))
    }

    /// Create a searcher with an explicit clock for resolving result ages.
    pub fn with_clock(
        config: &EngineConfig,
        fetcher: Arc<dyn PageFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SearchError> {
        let extractor = BlockExtractor::new(&config.base_url)?;
        let settings = PaginationSettings {
            page_size: config.page_size,
            page_delay: config.page_delay(),
            max_pages: config.max_pages,
        };

        Ok(Self {
            fetcher,
            paginator: Paginator::new(settings, extractor, clock),
        })
    }

    /// Create a searcher that fetches over HTTP as configured.
    pub fn from_config(config: &Config) -> Result<Self, SearchError> {
        let fetcher = HttpFetcher::new(&config.http)
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        Self::new(&config.engine, Arc::new(fetcher))
    }

    /// Provider name for logging.
    pub fn name(&self) -> &str {
        "btdig"
    }

    pub fn base_url(&self) -> &str {
        self.paginator.extractor().base_url()
    }

    /// Run a search, handing each record to `sink` as soon as it is extracted.
    pub async fn search<S>(
        &self,
        query: &SearchQuery,
        sink: &mut S,
    ) -> Result<SearchSummary, SearchError>
    where
        S: ResultSink + ?Sized,
    {
        let start = Instant::now();
        debug!(
            query = %query.query,
            category = %query.category,
            engine = self.name(),
            "Starting search"
        );

        let result = self.paginator.run(query, self.fetcher.as_ref(), sink).await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(summary) => {
                SEARCH_DURATION.with_label_values(&["success"]).observe(elapsed);
                info!(
                    query = %query.query,
                    pages = summary.pages_fetched,
                    records = summary.records_emitted,
                    skipped = summary.blocks_skipped,
                    duration_ms = summary.elapsed.as_millis() as u64,
                    "Search complete"
                );
            }
            Err(e) => {
                SEARCH_DURATION.with_label_values(&["failure"]).observe(elapsed);
                warn!(query = %query.query, error = %e, "Search aborted");
            }
        }

        result
    }

    /// Run a search from raw text and a category name.
    ///
    /// Unknown categories are rejected before anything is fetched.
    pub async fn search_text<S>(
        &self,
        text: &str,
        category: &str,
        sink: &mut S,
    ) -> Result<SearchSummary, SearchError>
    where
        S: ResultSink + ?Sized,
    {
        let query = SearchQuery::with_category(text, category)?;
        self.search(&query, sink).await
    }

    /// Run a search and collect every record.
    pub async fn search_all(&self, query: &SearchQuery) -> Result<Vec<ResultRecord>, SearchError> {
        let mut records = Vec::new();
        self.search(query, &mut |r: ResultRecord| records.push(r))
            .await?;
        Ok(records)
    }
}
