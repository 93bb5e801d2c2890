use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::throttle::RateLimiter;
use super::util::with_retry;
use crate::core::config::AlphaVantageConfig;
use crate::core::{DataFunction, DataProvider, FetchError, FetchResult, Symbol};

/// Keys Alpha Vantage uses for notices returned with a 200 status.
const NOTICE_KEYS: [&str; 3] = ["Note", "Information", "Error Message"];

/// Returns the notice carried by a response body, such as the call frequency
/// message sent when the rate limit is exceeded.
pub fn api_notice(body: &str) -> Option<String> {
    let Ok(Value::Object(entries)) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    NOTICE_KEYS.iter().find_map(|key| {
        entries
            .get(*key)
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

pub struct AlphaVantageClient {
    base_url: Url,
    api_key: String,
    client: reqwest::Client,
    limiter: RateLimiter,
    retries: usize,
    retry_delay: Duration,
}

impl AlphaVantageClient {
    pub fn new(config: &AlphaVantageConfig, api_key: String) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid Alpha Vantage base URL: {}", config.base_url))?;
        let client = reqwest::Client::builder()
            .user_agent("avmonthly/0.1")
            .build()?;

        Ok(AlphaVantageClient {
            base_url,
            api_key,
            client,
            limiter: RateLimiter::new(config.request_interval()),
            retries: config.retries,
            retry_delay: config.retry_delay(),
        })
    }

    fn query_url(&self, function: &DataFunction, symbol: &Symbol) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("function", function.as_str())
            .append_pair("symbol", symbol.as_str())
            .append_pair("apikey", &self.api_key);
        url
    }

    async fn request(&self, function: &DataFunction, symbol: &Symbol) -> FetchResult {
        self.limiter.wait().await;

        let url = self.query_url(function, symbol);
        debug!(%function, %symbol, base_url = %self.base_url, "Sending request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                function: function.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                function: function.clone(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            function: function.clone(),
            source,
        })
    }
}

#[async_trait]
impl DataProvider for AlphaVantageClient {
    #[instrument(
        name = "AlphaVantageFetch",
        skip(self),
        fields(function = %function, symbol = %symbol)
    )]
    async fn fetch(&self, function: &DataFunction, symbol: &Symbol) -> FetchResult {
        let started = Instant::now();
        let body = with_retry(
            || self.request(function, symbol),
            self.retries,
            self.retry_delay,
        )
        .await?;

        if let Some(notice) = api_notice(&body) {
            warn!("Alpha Vantage notice for {}: {}", function, notice);
        }
        info!(
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched data"
        );
        Ok(body)
    }
}
