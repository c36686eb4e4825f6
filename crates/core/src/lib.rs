pub mod config;
pub mod metrics;
pub mod searcher;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, EngineConfig, HttpConfig,
};
pub use searcher::{
    BlockExtractor, BtdigSearcher, Clock, FetchError, HttpFetcher, PageFetcher,
    PaginationSettings, Paginator, RelativeTimeParser, ResultRecord, ResultSink, SearchCategory,
    SearchError, SearchQuery, SearchSummary, SystemClock, UNKNOWN_COUNT, UNKNOWN_TIMESTAMP,
};
