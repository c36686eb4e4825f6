//! btdig search pipeline.
//!
//! This module turns a query into a stream of [`ResultRecord`]s: it walks the
//! result pages of btdig one at a time, cuts each page into result blocks and
//! extracts the fields of every complete block. Fetching and output are
//! abstracted behind the [`PageFetcher`] and [`ResultSink`] traits.

mod age_parser;
mod btdig;
mod extractor;
mod http;
mod paginator;
mod types;

pub use age_parser::RelativeTimeParser;
pub use btdig::{BtdigSearcher, BTDIG_URL};
pub use extractor::{split_blocks, BlockExtractor, ParsedPage, RESULT_MARKER};
pub use http::{decode_html_entities, HttpFetcher};
pub use paginator::{
    page_url, total_pages, PaginationSettings, Paginator, PAGE_DELAY, RESULTS_PER_PAGE,
};
pub use types::*;
