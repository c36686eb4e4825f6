//! Testing utilities and mock implementations.
//!
//! Provides a scripted [`MockFetcher`], a [`FixedClock`] and HTML fixtures
//! shaped like btdig result pages, so searches can run without the network.
//!
//! # Example
//!
//! ```rust,ignore
//! use btdig_core::testing::{fixtures, FixedClock, MockFetcher};
//!
//! let fetcher = MockFetcher::new();
//! fetcher.set_page(
//!     "https://btdig.com/search?q=ubuntu&order=0",
//!     fixtures::results_page(None, &[fixtures::result_block("abc", "Ubuntu", "1 GB", "2 days")]),
//! ).await;
//! ```

mod mock_fetcher;

pub use mock_fetcher::{MockFetcher, RecordedFetch};

use chrono::{DateTime, Utc};

use crate::searcher::Clock;

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// HTML fixtures mirroring btdig's search page markup.
pub mod fixtures {
    /// Render one result entry.
    ///
    /// The detail link is `https://btdig.com/{info_hash}/{slug}` where the slug
    /// is the lowercased first word of `name`. The age is wrapped as
    /// `found {age} ago`.
    pub fn result_block(info_hash: &str, name: &str, size: &str, age: &str) -> String {
        let slug = name
            .split(|c: char| c == '<' || c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_lowercase();

        format!(
            concat!(
                r#"<div class="one_result" style="display:table-row;background-color:#f8f8f8">"#,
                "\n",
                r#"<div class="torrent_name" style="display:table-cell;color:rgb(0, 0, 204);font-size:1.3em"><a style="color:rgb(0, 0, 204);text-decoration:underline;font-size:1.3em" href="https://btdig.com/{hash}/{slug}">{name}</a></div>"#,
                "\n",
                r#"<div class="torrent_magnet" style="display:table-cell"><div class="fa fa-magnet"></div> <a href="magnet:?xt=urn:btih:{hash}&dn=test" title="Download via magnet-link">magnet:?xt=urn:btih:{hash}</a></div>"#,
                "\n",
                r#"<div style="display:table-cell"><span class="torrent_size" style="color:#666;padding-left:10px">{size}</span> <span class="torrent_files" style="color:#666;padding-left:10px">3</span> <span class="torrent_age" style="color:#666;padding-left:10px">found {age} ago</span></div>"#,
                "\n</div>\n"
            ),
            hash = info_hash,
            slug = slug,
            name = name,
            size = size,
            age = age,
        )
    }

    /// Render the result count banner shown above the listing.
    pub fn result_count(total: u64) -> String {
        format!(
            r#"<span style="color:rgb(100, 100, 100);padding:2px 10px">{} results found</span>"#,
            total
        )
    }

    /// Render a full search page around `blocks`, with an optional count banner.
    pub fn results_page(total: Option<u64>, blocks: &[String]) -> String {
        let banner = total.map(result_count).unwrap_or_default();
        format!(
            "<html><head><title>BTDigg search</title></head><body>\n<div>{}</div>\n{}\n<div class=\"pager\"></div></body></html>",
            banner,
            blocks.concat()
        )
    }

    /// A page of `count` complete entries with hashes derived from `prefix`.
    pub fn numbered_page(total: Option<u64>, prefix: &str, count: usize) -> String {
        let blocks: Vec<String> = (0..count)
            .map(|i| {
                result_block(
                    &format!("{}{:02}", prefix, i),
                    &format!("Item{} {}", prefix, i),
                    "1.0\u{a0}GB",
                    "2 days",
                )
            })
            .collect();
        results_page(total, &blocks)
    }
}
