//! Relative age parsing ("3 hours", "2 weeks ago") into Unix timestamps.
//!
//! Units are approximated without a calendar: a month is 30 days and a year
//! is 365 days. Long ages therefore drift by a few days, which matches what
//! the site itself means by them.

use chrono::{DateTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use unicode_normalization::UnicodeNormalization;

use super::UNKNOWN_TIMESTAMP;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Unit words in match order, with their length in seconds.
const AGE_UNITS: &[(&str, i64)] = &[
    ("second", 1),
    ("minute", MINUTE),
    ("hour", HOUR),
    ("day", DAY),
    ("week", 7 * DAY),
    ("month", 30 * DAY),
    ("year", 365 * DAY),
];

/// Compiled `(pattern, seconds per unit)` rows.
static AGE_RULES: Lazy<Vec<(Regex, i64)>> = Lazy::new(|| {
    AGE_UNITS
        .iter()
        .map(|(unit, secs)| {
            let pattern = format!(r"(?i)(\d+)\s+{}s?", unit);
            (Regex::new(&pattern).unwrap(), *secs)
        })
        .collect()
});

/// Converts age strings to timestamps relative to a fixed anchor.
#[derive(Debug, Clone, Copy)]
pub struct RelativeTimeParser {
    anchor: DateTime<Utc>,
}

impl RelativeTimeParser {
    /// Create a parser anchored at `anchor`.
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    /// Parse an age string into a Unix timestamp.
    ///
    /// The first unit (seconds up to years) found anywhere in `text` decides
    /// the result. Returns [`UNKNOWN_TIMESTAMP`] when no unit matches or the age
    /// does not fit in a timestamp. Compatibility forms such as U+00A0 are
    /// folded to plain whitespace first.
    pub fn parse(&self, text: &str) -> i64 {
        let text: String = text.nfkd().collect();
        for (pattern, unit_secs) in AGE_RULES.iter() {
            if let Some(caps) = pattern.captures(&text) {
                return self
                    .subtract(&caps[1], *unit_secs)
                    .unwrap_or(UNKNOWN_TIMESTAMP);
            }
        }
        UNKNOWN_TIMESTAMP
    }

    fn subtract(&self, count: &str, unit_secs: i64) -> Option<i64> {
        let count: i64 = count.parse().ok()?;
        let secs = count.checked_mul(unit_secs)?;
        let age = TimeDelta::try_seconds(secs)?;
        self.anchor
            .checked_sub_signed(age)
            .map(|t| t.timestamp())
    }
}
