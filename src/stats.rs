use crate::api::{PageOrder, RecordSource};
use crate::error::{FeedError, Result};
use crate::models::NetworkStats;
use crate::retry::RetryExecutor;
use tracing::info;

/// Latest ledger plus fee statistics, one request each.
pub struct NetworkStatsCollector<'a, S: ?Sized> {
    source: &'a S,
    retry: &'a RetryExecutor,
}

impl<'a, S> NetworkStatsCollector<'a, S>
where
    S: RecordSource + ?Sized,
{
    pub fn new(source: &'a S, retry: &'a RetryExecutor) -> Self {
        Self { source, retry }
    }

    pub async fn collect(&self) -> Result<NetworkStats> {
        let source = self.source;

        let ledgers = self
            .retry
            .execute("ledgers", move || source.list_ledgers(None, 1, PageOrder::Desc))
            .await?;
        let latest = ledgers
            .records
            .first()
            .ok_or_else(|| FeedError::malformed("ledger", "no ledgers returned"))?;

        let fee_stats = self.retry.execute("fee_stats", move || source.fee_stats()).await?;

        let stats = NetworkStats::from_records(latest, &fee_stats)?;
        info!(
            "Network stats: ledger {} with {} transactions / {} operations",
            stats.latest_ledger, stats.transaction_count, stats.operation_count
        );
        Ok(stats)
    }
}
