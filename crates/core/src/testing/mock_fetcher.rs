//! Mock page fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::searcher::{FetchError, PageFetcher};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    /// The URL that was requested.
    pub url: String,
    /// When the request was made (tokio clock, so paused time is honoured).
    pub at: Instant,
}

/// Mock implementation of the [`PageFetcher`] trait.
///
/// Serves canned pages keyed by exact URL. Unknown URLs fail with a 404.
/// Every call is recorded, including failing ones.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, String>>>,
    failures: Arc<RwLock<HashMap<String, u16>>>,
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
}

impl std::fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFetcher")
            .field("pages", &"<pages>")
            .field("failures", &"<failures>")
            .field("fetches", &"<fetches>")
            .finish()
    }
}

impl MockFetcher {
    /// Create a fetcher with no pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for `url`.
    pub async fn set_page(&self, url: impl Into<String>, content: impl Into<String>) {
        self.pages.write().await.insert(url.into(), content.into());
    }

    /// Make requests for `url` fail with the given HTTP status.
    pub async fn fail_with_status(&self, url: impl Into<String>, status: u16) {
        self.failures.write().await.insert(url.into(), status);
    }

    /// All fetches made so far, in order.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    /// URLs fetched so far, in order.
    pub async fn fetched_urls(&self) -> Vec<String> {
        self.fetches
            .read()
            .await
            .iter()
            .map(|f| f.url.clone())
            .collect()
    }

    /// Forget recorded fetches.
    pub async fn clear_recorded(&self) {
        self.fetches.write().await.clear();
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetches.write().await.push(RecordedFetch {
            url: url.to_string(),
            at: Instant::now(),
        });

        if let Some(status) = self.failures.read().await.get(url) {
            return Err(FetchError::Status {
                status: *status,
                url: url.to_string(),
            });
        }

        self.pages
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_configured_page() {
        let fetcher = MockFetcher::new();
        fetcher.set_page("http://a/1", "page one").await;

        let content = tokio_test::assert_ok!(fetcher.fetch("http://a/1").await);
        assert_eq!(content, "page one");
        assert_eq!(fetcher.fetched_urls().await, vec!["http://a/1"]);
    }

    #[tokio::test]
    async fn test_unknown_url_is_not_found() {
        let fetcher = MockFetcher::new();

        let err = tokio_test::assert_err!(fetcher.fetch("http://a/missing").await);
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(fetcher.recorded_fetches().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_overrides_page() {
        let fetcher = MockFetcher::new();
        fetcher.set_page("http://a/1", "page one").await;
        fetcher.fail_with_status("http://a/1", 503).await;

        let err = fetcher.fetch("http://a/1").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));

        fetcher.clear_recorded().await;
        assert!(fetcher.recorded_fetches().await.is_empty());
    }
}
