//! Prometheus metrics for the search pipeline.
//!
//! This module provides metrics for:
//! - Page fetches (successes and failures)
//! - Extraction (records emitted, blocks skipped)
//! - Whole searches (duration by result)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Fetch Metrics
// =============================================================================

/// Result pages fetched successfully.
pub static PAGES_FETCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("btdig_pages_fetched_total", "Total result pages fetched").unwrap()
});

/// Failed page fetches by cause.
pub static FETCH_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("btdig_fetch_failures_total", "Total failed page fetches"),
        &["reason"], // "timeout", "connection", "status", "body", "request"
    )
    .unwrap()
});

// =============================================================================
// Extraction Metrics
// =============================================================================

/// Records handed to a sink.
pub static RECORDS_EMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("btdig_records_emitted_total", "Total result records emitted").unwrap()
});

/// Result blocks dropped for missing a required field.
pub static BLOCKS_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "btdig_blocks_skipped_total",
        "Total result blocks skipped for missing fields",
    )
    .unwrap()
});

// =============================================================================
// Search Metrics
// =============================================================================

/// Search duration in seconds, inter-page delays included.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("btdig_search_duration_seconds", "Duration of a full search")
            .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PAGES_FETCHED.clone()),
        Box::new(FETCH_FAILURES.clone()),
        Box::new(RECORDS_EMITTED.clone()),
        Box::new(BLOCKS_SKIPPED.clone()),
        Box::new(SEARCH_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register_once() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"btdig_pages_fetched_total".to_string()));
        assert!(names.contains(&"btdig_records_emitted_total".to_string()));
        assert!(names.contains(&"btdig_blocks_skipped_total".to_string()));
    }
}
