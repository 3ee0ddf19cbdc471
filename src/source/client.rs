use crate::config::Config;
use crate::models::{AssetRecord, ListingsResponse};
use crate::source::ListingsSource;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::ACCEPT;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const LISTINGS_PATH: &str = "/v1/cryptocurrency/listings/latest";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to fetch crypto listings ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode listings: {0}")]
    Decode(String),

    #[error("Invalid pagination: {0}")]
    InvalidParams(String),
}

impl SourceError {
    /// Worth another attempt: connection trouble, throttling or a server-side failure
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            SourceError::Transport(_) => true,
            SourceError::Decode(_) | SourceError::InvalidParams(_) => false,
        }
    }
}

/// CoinMarketCap listings client
pub struct CoinMarketCapClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: usize,
    retry_min_delay: Duration,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl CoinMarketCapClient {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.source_timeout_secs))
            .build()?;

        let limiter = config
            .source_rate_limit
            .and_then(NonZeroU32::new)
            .map(|per_minute| Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))));

        info!(
            "Initializing listings client with endpoint: {}, rate limit: {:?}/min",
            config.cmc_base_url, config.source_rate_limit
        );

        Ok(Self {
            http,
            base_url: config.cmc_base_url.trim_end_matches('/').to_string(),
            api_key: config.cmc_api_key.clone(),
            max_retries: config.source_max_retries,
            retry_min_delay: Duration::from_millis(500),
            limiter,
        })
    }

    /// Override the backoff used between transient failures
    pub fn with_retry(mut self, max_retries: usize, min_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_min_delay = min_delay;
        self
    }

    pub fn listings_url(&self) -> String {
        format!("{}{}", self.base_url, LISTINGS_PATH)
    }

    async fn request(&self, limit: u32, start: u32) -> Result<Vec<AssetRecord>, SourceError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let response = self
            .http
            .get(self.listings_url())
            .query(&[
                ("start", start.to_string()),
                ("limit", limit.to_string()),
                ("convert", "USD".to_string()),
            ])
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let listings: ListingsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        Ok(listings.data)
    }
}

#[async_trait]
impl ListingsSource for CoinMarketCapClient {
    async fn fetch_listings(&self, limit: u32, start: u32) -> Result<Vec<AssetRecord>, SourceError> {
        if limit == 0 {
            return Err(SourceError::InvalidParams("limit must be greater than 0".to_string()));
        }
        if start == 0 {
            return Err(SourceError::InvalidParams("start is 1-based".to_string()));
        }

        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.retry_min_delay)
            .with_max_times(self.max_retries);

        let records = (|| self.request(limit, start))
            .retry(backoff)
            .when(SourceError::is_transient)
            .notify(|err: &SourceError, dur: Duration| {
                warn!("Listings fetch failed, retrying in {:?}: {}", dur, err);
            })
            .await?;

        debug!("Fetched {} listings (limit={}, start={})", records.len(), limit, start);
        Ok(records)
    }
}
