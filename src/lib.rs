pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod paginator;
pub mod retry;
pub mod stats;
pub mod volume;


pub use api::{HorizonClient, Page, PageOrder, RecordSource};
pub use cache::ResultCache;
pub use config::Config;
pub use error::{FeedError, Result};
pub use fetcher::{get_asset_volume, get_network_overview, HorizonFetcher};
pub use models::{AssetFilter, NetworkStats, TransactionRecord, VolumeData};
pub use paginator::{PageQuery, Paginator};
pub use retry::RetryExecutor;
pub use stats::NetworkStatsCollector;
pub use volume::VolumeAggregator;
