use crate::api::{HorizonClient, RecordSource};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::models::{NetworkStats, VolumeData};
use crate::retry::RetryExecutor;
use crate::stats::NetworkStatsCollector;
use crate::volume::{VolumeAggregator, MAX_WINDOW_HOURS};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

const STATS_CACHE_KEY: &str = "stats";

/// Cached volume and network-stats queries against one Horizon source.
///
/// Each fetcher owns its cache, so separate instances never share results.
pub struct HorizonFetcher<S = HorizonClient> {
    source: S,
    retry: RetryExecutor,
    config: Config,
    volume_cache: ResultCache<VolumeData>,
    stats_cache: ResultCache<NetworkStats>,
}

impl HorizonFetcher<HorizonClient> {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let source = HorizonClient::new(&config)?;
        Ok(Self::with_source(source, config))
    }

    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }
}

impl<S: RecordSource> HorizonFetcher<S> {
    pub fn with_source(source: S, config: Config) -> Self {
        Self {
            retry: RetryExecutor::from_config(&config),
            source,
            config,
            volume_cache: ResultCache::new(),
            stats_cache: ResultCache::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Volume of one asset over the last `hours` hours.
    pub async fn get_asset_volume(
        &self,
        asset_code: &str,
        hours: u32,
        asset_issuer: Option<&str>,
    ) -> Result<VolumeData> {
        if hours == 0 {
            return Err(FeedError::ConfigError("hours must be greater than zero".to_string()));
        }
        if hours > MAX_WINDOW_HOURS {
            return Err(FeedError::ConfigError(format!(
                "hours must be at most {}, got {}",
                MAX_WINDOW_HOURS, hours
            )));
        }
        if asset_code.trim().is_empty() {
            return Err(FeedError::ConfigError("asset code cannot be empty".to_string()));
        }

        let key = volume_cache_key(asset_code, asset_issuer, hours);
        let ttl = Duration::from_secs(self.config.volume_cache_ttl_secs);

        let (source, retry, config) = (&self.source, &self.retry, &self.config);

        self.volume_cache
            .get_or_compute(&key, ttl, move || async move {
                info!("Fetching {} volume for the last {}h", asset_code, hours);
                let end = Utc::now();
                let start = end
                    .checked_sub_signed(ChronoDuration::hours(i64::from(hours)))
                    .ok_or_else(|| FeedError::ConfigError(format!("a {}h window starts out of range", hours)))?;

                VolumeAggregator::new(source, retry, config.page_limit, config.max_pages)
                    .aggregate(asset_code, asset_issuer, start, end)
                    .await
            })
            .await
    }

    pub async fn get_network_stats(&self) -> Result<NetworkStats> {
        let ttl = Duration::from_secs(self.config.stats_cache_ttl_secs);

        let (source, retry) = (&self.source, &self.retry);

        self.stats_cache
            .get_or_compute(STATS_CACHE_KEY, ttl, move || async move {
                NetworkStatsCollector::new(source, retry).collect().await
            })
            .await
    }

    /// One unretried call to the API root. Never errors.
    pub async fn test_connection(&self) -> bool {
        match self.source.root().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Horizon connection test failed: {}", e);
                false
            }
        }
    }

    pub fn clear_cache(&self) {
        self.volume_cache.clear();
        self.stats_cache.clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.volume_cache.len() + self.stats_cache.len()
    }
}

/// Debug formatting quotes and escapes each part, so distinct parameters never share a key.
fn volume_cache_key(asset_code: &str, asset_issuer: Option<&str>, hours: u32) -> String {
    format!("volume:{:?}", (asset_code, asset_issuer, hours))
}

/// Volume query that leaves nothing behind in the fetcher's cache.
pub async fn one_shot_volume<S: RecordSource>(
    fetcher: &HorizonFetcher<S>,
    asset_code: &str,
    hours: u32,
    asset_issuer: Option<&str>,
) -> Result<Value> {
    let volume = fetcher.get_asset_volume(asset_code, hours, asset_issuer).await;
    fetcher.clear_cache();
    Ok(volume?.to_json())
}

/// Network stats query that leaves nothing behind in the fetcher's cache.
pub async fn one_shot_network_stats<S: RecordSource>(fetcher: &HorizonFetcher<S>) -> Result<Value> {
    let stats = fetcher.get_network_stats().await;
    fetcher.clear_cache();
    Ok(stats?.to_json())
}

/// Builds a fetcher from the environment and returns the volume as plain JSON.
pub async fn get_asset_volume(asset_code: &str, hours: u32, asset_issuer: Option<&str>) -> Result<Value> {
    let fetcher = HorizonFetcher::from_env()?;
    one_shot_volume(&fetcher, asset_code, hours, asset_issuer).await
}

/// Builds a fetcher from the environment and returns network stats as plain JSON.
pub async fn get_network_overview() -> Result<Value> {
    let fetcher = HorizonFetcher::from_env()?;
    one_shot_network_stats(&fetcher).await
}
