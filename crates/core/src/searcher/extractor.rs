//! Result block extraction from btdig search pages.
//!
//! A page is cut into blocks at every result marker, then each block is
//! matched against a fixed set of field rules. Rules only ever see their
//! own block, so a capture can not run into the next entry's markup.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Url;
use unicode_normalization::UnicodeNormalization;

use super::age_parser::RelativeTimeParser;
use super::{ResultRecord, SearchError, UNKNOWN_COUNT};

/// Opening tag of every result entry.
pub const RESULT_MARKER: &str = r#"<div class="one_result""#;

static MAGNET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="(magnet:\?xt=urn:btih:[^"]+)""#).unwrap());

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div class="torrent_name".*?><a.*?>(.*?)</a>"#).unwrap());

static SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="torrent_size"[^>]*>(.*?)</span>"#).unwrap());

static AGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="torrent_age"[^>]*>(.*?)</span>"#).unwrap());

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").unwrap());

/// Split a page into marker-delimited result blocks, in document order.
///
/// Each block runs from one marker up to the next (or the end of the page).
/// Anything before the first marker is dropped.
pub fn split_blocks(page: &str) -> Vec<&str> {
    let starts: Vec<usize> = page.match_indices(RESULT_MARKER).map(|(i, _)| i).collect();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(page.len());
            &page[start..end]
        })
        .collect()
}

/// Records extracted from one page, plus the number of incomplete blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub records: Vec<ResultRecord>,
    pub skipped: u64,
}

/// Raw captures of one block, before any cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockFields<'a> {
    magnet: &'a str,
    name: &'a str,
    size: &'a str,
    desc_path: &'a str,
    age: &'a str,
}

/// Extracts [`ResultRecord`]s from blocks of one site.
#[derive(Debug, Clone)]
pub struct BlockExtractor {
    base_url: String,
    desc_link_re: Regex,
}

impl BlockExtractor {
    /// Create an extractor for the site at `base_url` (e.g. `https://btdig.com`).
    ///
    /// Detail links are recognised on the same host, with or without `www.`.
    pub fn new(base_url: &str) -> Result<Self, SearchError> {
        let base_url = base_url.trim_end_matches('/');
        let url = Url::parse(base_url)
            .map_err(|e| SearchError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| SearchError::InvalidBaseUrl(format!("{}: missing host", base_url)))?;
        let host = host.strip_prefix("www.").unwrap_or(host);

        let pattern = format!(
            r#"<a.*? href="{}://(?:www\.)?{}([^"]+)""#,
            regex_lite::escape(url.scheme()),
            regex_lite::escape(host)
        );
        let desc_link_re =
            Regex::new(&pattern).map_err(|e| SearchError::Internal(e.to_string()))?;

        Ok(Self {
            base_url: base_url.to_string(),
            desc_link_re,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Extract every complete record on a page, in document order.
    pub fn parse_blocks(&self, page: &str, ages: &RelativeTimeParser) -> ParsedPage {
        let mut parsed = ParsedPage::default();
        for block in split_blocks(page) {
            match self.extract(block, ages) {
                Some(record) => parsed.records.push(record),
                None => parsed.skipped += 1,
            }
        }
        parsed
    }

    /// Extract a record from a single block.
    ///
    /// Returns `None` when any required field is missing. An unparseable age
    /// still yields a record, with an unknown timestamp.
    pub fn extract(&self, block: &str, ages: &RelativeTimeParser) -> Option<ResultRecord> {
        let fields = self.capture(block)?;

        Some(ResultRecord {
            link: fields.magnet.to_string(),
            name: strip_tags(fields.name).trim().to_string(),
            size: fields.size.nfkd().collect(),
            engine_url: self.base_url.clone(),
            desc_link: format!("{}{}", self.base_url, fields.desc_path),
            pub_date: ages.parse(fields.age),
            seeds: UNKNOWN_COUNT,
            leech: UNKNOWN_COUNT,
        })
    }

    fn capture<'a>(&self, block: &'a str) -> Option<BlockFields<'a>> {
        let group = |re: &Regex| re.captures(block).and_then(|c| c.get(1)).map(|m| m.as_str());

        Some(BlockFields {
            magnet: group(&*MAGNET_RE)?,
            name: group(&*NAME_RE)?,
            size: group(&*SIZE_RE)?,
            desc_path: group(&self.desc_link_re)?,
            age: group(&*AGE_RE)?,
        })
    }
}

fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}
