use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::searcher::{BTDIG_URL, PAGE_DELAY, RESULTS_PER_PAGE};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Search engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Site root (e.g., "https://btdig.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Results the site renders per page (default: 10)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Pause before each page request after the first, in milliseconds (default: 1000)
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Maximum pages fetched per search (default: unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
}

impl EngineConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            max_pages: None,
        }
    }
}

fn default_base_url() -> String {
    BTDIG_URL.to_string()
}

fn default_page_size() -> u32 {
    RESULTS_PER_PAGE
}

fn default_page_delay_ms() -> u64 {
    PAGE_DELAY.as_millis() as u64
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Decode HTML character references in fetched pages (default: true)
    #[serde(default = "default_decode_entities")]
    pub decode_entities: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            decode_entities: default_decode_entities(),
        }
    }
}

fn default_timeout() -> u32 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string()
}

fn default_decode_entities() -> bool {
    true
}
