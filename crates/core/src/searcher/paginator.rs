//! Sequential page walking for a btdig search.
//!
//! Page 1 is fetched first and tells us how many results exist. The remaining
//! pages are then fetched one at a time, with a fixed pause before each
//! request so the site is never hit faster than once per delay.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::metrics::{BLOCKS_SKIPPED, FETCH_FAILURES, PAGES_FETCHED, RECORDS_EMITTED};

use super::age_parser::RelativeTimeParser;
use super::extractor::BlockExtractor;
use super::{Clock, PageFetcher, ResultSink, SearchError, SearchQuery, SearchSummary};

/// Results the site renders per page.
pub const RESULTS_PER_PAGE: u32 = 10;

/// Pause before each request after the first.
pub const PAGE_DELAY: Duration = Duration::from_secs(1);

/// "N results found" banner at the top of the listing.
static RESULT_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<span style="color:rgb\(100, 100, 100\);padding:2px 10px">([0-9][0-9,]*) results found"#,
    )
    .unwrap()
});

/// Build the URL of a result page. Page 0 carries no page parameter.
pub fn page_url(base_url: &str, query: &str, page: u32) -> String {
    let q = encode_query(query);
    if page == 0 {
        format!("{}/search?q={}&order=0", base_url, q)
    } else {
        format!("{}/search?q={}&p={}&order=0", base_url, q, page)
    }
}

/// Spaces become `+`; everything else inside a word is percent-encoded.
fn encode_query(query: &str) -> String {
    query
        .split(' ')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("+")
}

/// Number of result pages announced on the first page.
///
/// Falls back to a single page when the banner is missing. Never returns 0:
/// the first page has already been fetched by the time this is asked.
pub fn total_pages(first_page: &str, page_size: u32) -> u32 {
    let Some(caps) = RESULT_COUNT_RE.captures(first_page) else {
        debug!("Result count not found, assuming a single page");
        return 1;
    };

    let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.parse::<u64>() {
        Ok(total) => {
            let pages = total.div_ceil(u64::from(page_size.max(1)));
            pages.clamp(1, u64::from(u32::MAX)) as u32
        }
        Err(_) => 1,
    }
}

/// Tunables for page walking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSettings {
    pub page_size: u32,
    pub page_delay: Duration,
    /// Upper bound on pages fetched, regardless of what the site announces.
    pub max_pages: Option<u32>,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: RESULTS_PER_PAGE,
            page_delay: PAGE_DELAY,
            max_pages: None,
        }
    }
}

/// Drives fetch and extraction across all pages of a query.
pub struct Paginator {
    settings: PaginationSettings,
    extractor: BlockExtractor,
    clock: Arc<dyn Clock>,
}

impl Paginator {
    pub fn new(settings: PaginationSettings, extractor: BlockExtractor, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            extractor,
            clock,
        }
    }

    pub fn settings(&self) -> &PaginationSettings {
        &self.settings
    }

    pub fn extractor(&self) -> &BlockExtractor {
        &self.extractor
    }

    /// Walk every page of `query`, streaming records into `sink` as they are found.
    ///
    /// A failed fetch aborts the walk. Records from earlier pages have already
    /// been emitted by then.
    pub async fn run<S>(
        &self,
        query: &SearchQuery,
        fetcher: &dyn PageFetcher,
        sink: &mut S,
    ) -> Result<SearchSummary, SearchError>
    where
        S: ResultSink + ?Sized,
    {
        let start = Instant::now();
        let mut summary = SearchSummary::default();

        let first = self.fetch_page(query, 0, fetcher, &mut summary).await?;
        self.emit_page(&first, &mut *sink, &mut summary);

        let mut pages = total_pages(&first, self.settings.page_size);
        if let Some(cap) = self.settings.max_pages {
            if pages > cap {
                debug!(announced = pages, cap = cap, "Capping page count");
                pages = cap.max(1);
            }
        }
        summary.total_pages = pages;

        for page in 1..pages {
            tokio::time::sleep(self.settings.page_delay).await;
            let content = self.fetch_page(query, page, fetcher, &mut summary).await?;
            self.emit_page(&content, &mut *sink, &mut summary);
        }

        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    async fn fetch_page(
        &self,
        query: &SearchQuery,
        page: u32,
        fetcher: &dyn PageFetcher,
        summary: &mut SearchSummary,
    ) -> Result<String, SearchError> {
        let url = page_url(self.extractor.base_url(), &query.query, page);
        debug!(page = page, url = %url, "Fetching result page");

        match fetcher.fetch(&url).await {
            Ok(content) => {
                PAGES_FETCHED.inc();
                summary.pages_fetched += 1;
                Ok(content)
            }
            Err(source) => {
                FETCH_FAILURES.with_label_values(&[source.reason()]).inc();
                warn!(page = page, url = %url, error = %source, "Page fetch failed");
                Err(SearchError::Fetch { url, source })
            }
        }
    }

    /// Extract and emit one page. A fresh age parser is anchored per page.
    fn emit_page<S>(&self, content: &str, sink: &mut S, summary: &mut SearchSummary)
    where
        S: ResultSink + ?Sized,
    {
        let ages = RelativeTimeParser::new(self.clock.now());
        let parsed = self.extractor.parse_blocks(content, &ages);
        let emitted = parsed.records.len() as u64;
        let skipped = parsed.skipped;

        for record in parsed.records {
            sink.emit(record);
        }

        if skipped > 0 {
            debug!(skipped = skipped, "Skipped incomplete result blocks");
        }
        RECORDS_EMITTED.inc_by(emitted);
        BLOCKS_SKIPPED.inc_by(skipped);
        summary.records_emitted += emitted;
        summary.blocks_skipped += skipped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searcher::ResultRecord;
    use crate::testing::{fixtures, FixedClock, MockFetcher};
    use chrono::{TimeZone, Utc};

    const BASE: &str = "https://btdig.com";

    fn paginator(settings: PaginationSettings) -> Paginator {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap());
        Paginator::new(settings, BlockExtractor::new(BASE).unwrap(), Arc::new(clock))
    }

    #[test]
    fn test_page_url_first_page() {
        assert_eq!(
            page_url(BASE, "foo", 0),
            "https://btdig.com/search?q=foo&order=0"
        );
    }

    #[test]
    fn test_page_url_later_page() {
        assert_eq!(
            page_url(BASE, "big buck bunny", 2),
            "https://btdig.com/search?q=big+buck+bunny&p=2&order=0"
        );
    }

    #[test]
    fn test_page_url_encodes_reserved_characters() {
        assert_eq!(
            page_url(BASE, "a&b c", 0),
            "https://btdig.com/search?q=a%26b+c&order=0"
        );
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = fixtures::results_page(Some(37), &[]);
        assert_eq!(total_pages(&page, 10), 4);

        let page = fixtures::results_page(Some(25), &[]);
        assert_eq!(total_pages(&page, 10), 3);

        let page = fixtures::results_page(Some(10), &[]);
        assert_eq!(total_pages(&page, 10), 1);
    }

    #[test]
    fn test_total_pages_without_banner() {
        assert_eq!(total_pages("<html>no banner</html>", 10), 1);
        assert_eq!(total_pages("37 results found", 10), 1);
    }

    #[test]
    fn test_total_pages_zero_results_is_one() {
        let page = fixtures::results_page(Some(0), &[]);
        assert_eq!(total_pages(&page, 10), 1);
    }

    #[test]
    fn test_total_pages_thousands_separator() {
        let page = fixtures::results_page(None, &[]).replace(
            "<div></div>",
            r#"<div><span style="color:rgb(100, 100, 100);padding:2px 10px">1,234 results found</span></div>"#,
        );
        assert_eq!(total_pages(&page, 10), 124);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_streams_every_page() {
        let fetcher = MockFetcher::new();
        let query = SearchQuery::new("foo");
        fetcher
            .set_page(page_url(BASE, "foo", 0), fixtures::numbered_page(Some(15), "a", 10))
            .await;
        fetcher
            .set_page(page_url(BASE, "foo", 1), fixtures::numbered_page(None, "b", 5))
            .await;

        let mut records: Vec<ResultRecord> = Vec::new();
        let summary = paginator(PaginationSettings::default())
            .run(&query, &fetcher, &mut |r: ResultRecord| records.push(r))
            .await
            .unwrap();

        assert_eq!(records.len(), 15);
        assert_eq!(summary.total_pages, 2);
        assert_eq!(summary.pages_fetched, 2);
        assert_eq!(summary.records_emitted, 15);
        assert_eq!(summary.blocks_skipped, 0);
        assert!(records[0].link.contains("a00"));
        assert!(records[14].link.contains("b04"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_respects_max_pages() {
        let fetcher = MockFetcher::new();
        let query = SearchQuery::new("foo");
        fetcher
            .set_page(page_url(BASE, "foo", 0), fixtures::numbered_page(Some(100), "a", 10))
            .await;
        fetcher
            .set_page(page_url(BASE, "foo", 1), fixtures::numbered_page(None, "b", 10))
            .await;

        let settings = PaginationSettings {
            max_pages: Some(2),
            ..Default::default()
        };
        let mut count = 0usize;
        let summary = paginator(settings)
            .run(&query, &fetcher, &mut |_r: ResultRecord| count += 1)
            .await
            .unwrap();

        assert_eq!(summary.total_pages, 2);
        assert_eq!(fetcher.fetched_urls().await.len(), 2);
        assert_eq!(count, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_counts_skipped_blocks() {
        let fetcher = MockFetcher::new();
        let query = SearchQuery::new("foo");
        let broken = fixtures::result_block("bad", "Broken", "1 GB", "1 day")
            .replace(r#"class="torrent_size""#, r#"class="other""#);
        let good = fixtures::result_block("good", "Good", "1 GB", "1 day");
        fetcher
            .set_page(page_url(BASE, "foo", 0), fixtures::results_page(None, &[broken, good]))
            .await;

        let mut names = Vec::new();
        let summary = paginator(PaginationSettings::default())
            .run(&query, &fetcher, &mut |r: ResultRecord| names.push(r.name))
            .await
            .unwrap();

        assert_eq!(names, vec!["Good"]);
        assert_eq!(summary.blocks_skipped, 1);
        assert_eq!(summary.records_emitted, 1);
    }
}
