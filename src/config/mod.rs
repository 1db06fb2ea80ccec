use crate::error::{FeedError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HORIZON_URL: &str = "https://horizon.stellar.org";

#[derive(Debug, Clone)]
pub struct Config {
    pub horizon_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub max_pages: usize,
    pub page_limit: u32,
    pub volume_cache_ttl_secs: u64,
    pub stats_cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            horizon_url: DEFAULT_HORIZON_URL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
            max_pages: 50,
            page_limit: 200, // Horizon's maximum page size
            volume_cache_ttl_secs: 300,
            stats_cache_ttl_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            horizon_url: env::var("HORIZON_URL")
                .unwrap_or(defaults.horizon_url)
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: parse_var("HORIZON_TIMEOUT_SECS", defaults.timeout_secs)?,
            max_retries: parse_var("HORIZON_MAX_RETRIES", defaults.max_retries)?,
            retry_base_delay_ms: parse_var("HORIZON_RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms)?,
            retry_max_delay_ms: parse_var("HORIZON_RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms)?,
            max_pages: parse_var("HORIZON_MAX_PAGES", defaults.max_pages)?,
            page_limit: parse_var("HORIZON_PAGE_LIMIT", defaults.page_limit)?,
            volume_cache_ttl_secs: parse_var("VOLUME_CACHE_TTL_SECS", defaults.volume_cache_ttl_secs)?,
            stats_cache_ttl_secs: parse_var("STATS_CACHE_TTL_SECS", defaults.stats_cache_ttl_secs)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Same defaults, pointed at a different Horizon instance.
    pub fn with_horizon_url(horizon_url: impl Into<String>) -> Self {
        Self {
            horizon_url: horizon_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon_url.trim().is_empty() {
            return Err(FeedError::ConfigError("Horizon URL cannot be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(FeedError::ConfigError("Timeout must be at least 1 second".to_string()));
        }
        if self.max_retries == 0 {
            return Err(FeedError::ConfigError("Max retries must be at least 1".to_string()));
        }
        if self.max_pages == 0 {
            return Err(FeedError::ConfigError("Max pages must be at least 1".to_string()));
        }
        if self.page_limit == 0 || self.page_limit > 200 {
            return Err(FeedError::ConfigError(format!(
                "Page limit must be between 1 and 200, got {}",
                self.page_limit
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| FeedError::ConfigError(format!("Invalid {}", name))),
        Err(_) => Ok(default),
    }
}
