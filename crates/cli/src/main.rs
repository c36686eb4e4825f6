mod metrics;
mod output;

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use btdig_core::{
    load_config_or_default, validate_config, BtdigSearcher, ResultSink, SearchQuery,
};

use output::{LineSink, OutputFormat};

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "btdig.toml";

/// Exit status of a run stopped by Ctrl+C or SIGTERM (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// How a search run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    /// The reader of our output went away.
    OutputClosed,
    Interrupted,
}

#[derive(Debug, Parser)]
#[command(name = "btdig")]
#[command(about = "Search btdig and stream magnet results to stdout")]
#[command(version)]
struct Cli {
    /// Search terms
    #[arg(required = true)]
    query: Vec<String>,

    /// Configuration file path (default: $BTDIG_CONFIG, then ./btdig.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Category to search in
    #[arg(long, default_value = "all")]
    category: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Nova)]
    format: OutputFormat,

    /// Stop after this many result pages
    #[arg(long)]
    max_pages: Option<u32>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(Outcome::Interrupted) => ExitCode::from(INTERRUPTED_EXIT_CODE),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<Outcome> {
    // Logs go to stderr, stdout carries results only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.clone());
    match &config_path {
        Some(path) => info!("Loading configuration from {:?}", path),
        None => info!("No configuration file, using defaults"),
    }
    let mut config = load_config_or_default(config_path.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    if cli.max_pages.is_some() {
        config.engine.max_pages = cli.max_pages;
    }
    validate_config(&config).context("Configuration validation failed")?;

    let query = SearchQuery::with_category(cli.query.join(" "), &cli.category)
        .context("Invalid search")?;
    let searcher = BtdigSearcher::from_config(&config).context("Failed to create searcher")?;
    info!(
        "Searching {} for {:?} (category: {})",
        searcher.base_url(),
        query.query,
        query.category
    );

    let closed = Arc::new(Notify::new());
    let mut sink = LineSink::new(std::io::stdout(), cli.format, closed.clone());
    let outcome = run_search(&searcher, &query, &mut sink, &closed, shutdown_signal()).await?;

    if cli.metrics {
        eprint!("{}", metrics::encode_metrics());
    }

    sink.finish().context("Failed to write results")?;
    Ok(outcome)
}

/// Drive a search until it completes, the output closes or `interrupt` fires.
///
/// Stopping early drops the search future, so no further pages are fetched.
async fn run_search<S, F>(
    searcher: &BtdigSearcher,
    query: &SearchQuery,
    sink: &mut S,
    closed: &Notify,
    interrupt: F,
) -> Result<Outcome>
where
    S: ResultSink,
    F: Future<Output = ()>,
{
    tokio::select! {
        result = searcher.search(query, sink) => {
            let summary = result.context("Search failed")?;
            info!(
                "Done: {} records from {} of {} pages in {:?}",
                summary.records_emitted,
                summary.pages_fetched,
                summary.total_pages,
                summary.elapsed
            );
            Ok(Outcome::Completed)
        }
        _ = closed.notified() => {
            info!("Output closed, stopping search");
            Ok(Outcome::OutputClosed)
        }
        _ = interrupt => {
            warn!("Search interrupted");
            Ok(Outcome::Interrupted)
        }
    }
}

/// Explicit flag first, then `$BTDIG_CONFIG`, then `./btdig.toml` if it exists.
fn resolve_config_path(flag: Option<PathBuf>) -> Option<PathBuf> {
    flag.or_else(|| std::env::var("BTDIG_CONFIG").ok().map(PathBuf::from))
        .or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btdig_core::searcher::page_url;
    use btdig_core::testing::{fixtures, MockFetcher};
    use btdig_core::{EngineConfig, ResultRecord};

    async fn paged_searcher() -> (BtdigSearcher, MockFetcher) {
        let fetcher = MockFetcher::new();
        for page in 0..3 {
            fetcher
                .set_page(
                    page_url("https://btdig.com", "foo", page),
                    fixtures::numbered_page(Some(30), &format!("p{}", page), 10),
                )
                .await;
        }
        let searcher =
            BtdigSearcher::new(&EngineConfig::default(), Arc::new(fetcher.clone())).unwrap();
        (searcher, fetcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_search_completes() {
        let (searcher, fetcher) = paged_searcher().await;
        let closed = Notify::new();
        let mut count = 0usize;
        let mut sink = |_r: ResultRecord| count += 1;

        let outcome = run_search(
            &searcher,
            &SearchQuery::new("foo"),
            &mut sink,
            &closed,
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(count, 30);
        assert_eq!(fetcher.fetched_urls().await.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_output_stops_fetching() {
        let (searcher, fetcher) = paged_searcher().await;
        let closed = Notify::new();
        let mut sink = |_r: ResultRecord| closed.notify_one();

        let outcome = run_search(
            &searcher,
            &SearchQuery::new("foo"),
            &mut sink,
            &closed,
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::OutputClosed);
        assert_eq!(fetcher.fetched_urls().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_stops_search() {
        let (searcher, fetcher) = paged_searcher().await;
        let closed = Notify::new();
        let mut sink = |_r: ResultRecord| {};

        let outcome = run_search(
            &searcher,
            &SearchQuery::new("foo"),
            &mut sink,
            &closed,
            tokio::time::sleep(std::time::Duration::from_millis(500)),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Interrupted);
        assert_eq!(fetcher.fetched_urls().await.len(), 1);
    }

    #[test]
    fn test_cli_parses_query_words() {
        let cli = Cli::try_parse_from(["btdig", "big", "buck", "bunny"]).unwrap();
        assert_eq!(cli.query.join(" "), "big buck bunny");
        assert_eq!(cli.category, "all");
        assert_eq!(cli.format, OutputFormat::Nova);
        assert!(cli.max_pages.is_none());
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::try_parse_from([
            "btdig",
            "--format",
            "json",
            "--max-pages",
            "2",
            "--metrics",
            "ubuntu",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.max_pages, Some(2));
        assert!(cli.metrics);
    }

    #[test]
    fn test_cli_requires_query() {
        assert!(Cli::try_parse_from(["btdig"]).is_err());
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let path = resolve_config_path(Some(PathBuf::from("/etc/btdig.toml")));
        assert_eq!(path, Some(PathBuf::from("/etc/btdig.toml")));
    }
}
