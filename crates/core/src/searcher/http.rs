//! HTTP page fetcher backed by reqwest.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use quick_xml::escape::resolve_html5_entity;
use regex_lite::{Captures, Regex};
use reqwest::Client;
use std::borrow::Cow;
use std::time::Duration;
use tracing::debug;

use crate::config::HttpConfig;

use super::{FetchError, PageFetcher};

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});").unwrap()
});

/// Fetches pages over HTTP(S).
///
/// The body is decoded using the charset from the response headers. HTML
/// entities are then decoded so that extraction sees plain text, e.g. a
/// `&nbsp;` inside a size becomes U+00A0.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    decode_entities: bool,
}

impl HttpFetcher {
    /// Create a new HttpFetcher with the given configuration.
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            decode_entities: config.decode_entities,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_connect() {
                FetchError::ConnectionFailed(e.to_string())
            } else {
                FetchError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Body(e.to_string())
            }
        })?;
        debug!(url = url, bytes = body.len(), "Page fetched");

        if self.decode_entities {
            Ok(decode_html_entities(&body).into_owned())
        } else {
            Ok(body)
        }
    }
}

/// Replace HTML character references with the characters they name.
///
/// Numeric references and the full HTML5 named set are understood; anything
/// else is left untouched.
pub fn decode_html_entities(text: &str) -> Cow<'_, str> {
    ENTITY_RE.replace_all(text, |caps: &Captures<'_>| match decode_entity(&caps[1]) {
        Some(decoded) => decoded,
        None => caps[0].to_string(),
    })
}

fn decode_entity(entity: &str) -> Option<String> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    resolve_html5_entity(entity).map(str::to_string)
}
