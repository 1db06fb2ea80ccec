use crate::api::{PageOrder, RecordSource};
use crate::error::{FeedError, Result};
use crate::models::{bucket_label, AssetFilter, OperationRecord, TransactionRecord, VolumeData};
use crate::paginator::{PageQuery, Paginator};
use crate::retry::RetryExecutor;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const SECONDS_PER_HOUR: i64 = 3600;

/// Longest window a volume query may span (90 days).
pub const MAX_WINDOW_HOURS: u32 = 24 * 90;

/// Number of hour buckets covering `[start, end)`, rounded up.
pub fn bucket_count(start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
    let seconds = (end - start).num_seconds().max(0);
    ((seconds + SECONDS_PER_HOUR - 1) / SECONDS_PER_HOUR) as usize
}

/// Spreads each transaction's `total_amount` into the hour it was created in.
/// Transactions outside `[start, start + buckets hours)` are ignored.
pub fn bucket_volume(transactions: &[TransactionRecord], start: DateTime<Utc>, buckets: usize) -> Vec<f64> {
    let mut volume = vec![0.0; buckets];

    for tx in transactions {
        let offset = (tx.created_at - start).num_seconds();
        if offset < 0 {
            continue;
        }
        let index = (offset / SECONDS_PER_HOUR) as usize;
        if let Some(bucket) = volume.get_mut(index) {
            *bucket += tx.total_amount;
        }
    }

    volume
}

/// Turns transaction and operation pages into hourly volume for one asset.
pub struct VolumeAggregator<'a, S: ?Sized> {
    source: &'a S,
    retry: &'a RetryExecutor,
    page_limit: u32,
    max_pages: usize,
}

impl<'a, S> VolumeAggregator<'a, S>
where
    S: RecordSource + ?Sized,
{
    pub fn new(source: &'a S, retry: &'a RetryExecutor, page_limit: u32, max_pages: usize) -> Self {
        Self {
            source,
            retry,
            page_limit,
            max_pages,
        }
    }

    pub async fn aggregate(
        &self,
        asset_code: &str,
        asset_issuer: Option<&str>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<VolumeData> {
        if window_end <= window_start {
            return Err(FeedError::ConfigError(format!(
                "Volume window must end after it starts ({} .. {})",
                window_start, window_end
            )));
        }

        let hours = bucket_count(window_start, window_end);
        if hours > MAX_WINDOW_HOURS as usize {
            return Err(FeedError::ConfigError(format!(
                "Volume window spans {}h, the limit is {}h",
                hours, MAX_WINDOW_HOURS
            )));
        }

        let asset = AssetFilter::new(asset_code, asset_issuer);
        let transactions = self.collect_window(&asset, window_start, window_end).await?;

        let buckets = bucket_volume(&transactions, window_start, hours);
        let total_volume = buckets.iter().sum();

        let volume_by_hour: BTreeMap<String, f64> = buckets
            .into_iter()
            .enumerate()
            .map(|(index, volume)| (bucket_label(index), volume))
            .collect();

        info!(
            "Aggregated {} volume: {:.7} across {} transactions in {}h",
            asset_code,
            total_volume,
            transactions.len(),
            hours
        );

        Ok(VolumeData {
            asset_code: asset_code.to_string(),
            asset_issuer: asset_issuer.map(str::to_string),
            time_period_hours: hours as u32,
            total_volume,
            transaction_count: transactions.len() as u64,
            start_time: window_start,
            end_time: window_end,
            volume_by_hour,
        })
    }

    /// Every successful transaction created in `[window_start, window_end)`, newest first,
    /// with `total_amount` set to how much of `asset` its operations moved.
    ///
    /// Horizon has no server-side time filter, so this walks transactions newest first
    /// and stops at the first page that reaches back past `window_start`.
    pub async fn collect_window(
        &self,
        asset: &AssetFilter,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>> {
        let query = PageQuery::Transactions {
            limit: self.page_limit,
            order: PageOrder::Desc,
        };
        let mut pages = Paginator::new(self.source, self.retry, query, self.max_pages);
        let mut in_window = Vec::new();

        while let Some(page) = pages.next_page().await? {
            let mut reached_older = false;

            for record in &page.records {
                let mut tx = match TransactionRecord::from_record(record) {
                    Ok(tx) => tx,
                    Err(e) => {
                        warn!("Skipping transaction record: {}", e);
                        continue;
                    }
                };

                if tx.created_at >= window_end {
                    continue;
                }
                if tx.created_at < window_start {
                    reached_older = true;
                    break;
                }
                if !tx.successful {
                    debug!("Skipping failed transaction {}", tx.hash);
                    continue;
                }

                tx.total_amount = self.transaction_volume(asset, &tx.hash).await?;
                in_window.push(tx);
            }

            if reached_older {
                break;
            }
        }

        Ok(in_window)
    }

    async fn transaction_volume(&self, asset: &AssetFilter, transaction_hash: &str) -> Result<f64> {
        let query = PageQuery::Operations {
            transaction_hash: transaction_hash.to_string(),
            limit: self.page_limit,
        };
        let mut pages = Paginator::new(self.source, self.retry, query, self.max_pages);
        let mut amount = 0.0;

        while let Some(page) = pages.next_page().await? {
            for record in &page.records {
                match OperationRecord::from_record(record) {
                    Ok(operation) => amount += asset.amount_moved(&operation),
                    Err(e) => warn!("Skipping operation record in {}: {}", transaction_hash, e),
                }
            }
        }

        Ok(amount)
    }
}
