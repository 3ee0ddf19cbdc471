// Configuration, read from the environment (and `.env` when present):
// - listings provider endpoint and API key
// - server listening address/port
// - refresh interval and default page size
// - cache settings (capacity, idle TTL, active lease)

use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub cmc_api_key: String,
    pub cmc_base_url: String,
    pub refresh_interval: Duration,
    pub page_size: u32,
    pub cache_max_capacity: u64,
    pub cache_idle_ttl: Duration,
    pub active_lease: Duration,
    pub source_timeout_secs: u64,
    pub source_max_retries: usize,
    pub source_rate_limit: Option<u32>,
}

fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            cmc_api_key: String::new(),
            cmc_base_url: "https://pro-api.coinmarketcap.com".to_string(),
            refresh_interval: Duration::from_millis(10_000),
            page_size: 10,
            cache_max_capacity: 1000,
            cache_idle_ttl: Duration::from_secs(1800),
            active_lease: Duration::from_secs(60),
            source_timeout_secs: 15,
            source_max_retries: 3,
            source_rate_limit: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        let server_host = env::var("SERVER_HOST").unwrap_or(defaults.server_host);
        let server_port = parse_or("SERVER_PORT", defaults.server_port);
        let cmc_api_key = env::var("CMC_API_KEY").unwrap_or(defaults.cmc_api_key);
        let cmc_base_url = env::var("CMC_BASE_URL").unwrap_or(defaults.cmc_base_url);
        let refresh_interval = env::var("REFRESH_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.refresh_interval);
        let page_size = match parse_or("PAGE_SIZE", defaults.page_size) {
            0 => defaults.page_size,
            n => n,
        };
        let cache_max_capacity = parse_or("CACHE_MAX_CAPACITY", defaults.cache_max_capacity);
        let cache_idle_ttl = env::var("CACHE_IDLE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_idle_ttl);
        let active_lease = env::var("ACTIVE_LEASE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.active_lease);
        let source_timeout_secs = parse_or("SOURCE_TIMEOUT_SECS", defaults.source_timeout_secs);
        let source_max_retries = parse_or("SOURCE_MAX_RETRIES", defaults.source_max_retries);
        let source_rate_limit = env::var("SOURCE_RATE_LIMIT")
            .map(|v| v.parse().ok())
            .unwrap_or(None);

        Self {
            server_host,
            server_port,
            cmc_api_key,
            cmc_base_url,
            refresh_interval,
            page_size,
            cache_max_capacity,
            cache_idle_ttl,
            active_lease,
            source_timeout_secs,
            source_max_retries,
            source_rate_limit,
        }
    }
}
