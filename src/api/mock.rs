use crate::api::{Page, PageOrder, RecordSource};
use crate::error::{FeedError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory `RecordSource` with canned pages and call counters.
#[derive(Default)]
pub struct MockSource {
    transaction_pages: Vec<Vec<Value>>,
    dangling_last_cursor: bool,
    operations: HashMap<String, Vec<Value>>,
    ledgers: Vec<Value>,
    fee_stats: Value,
    root_ok: bool,
    transient_failures: AtomicU32,
    pub transaction_calls: AtomicUsize,
    pub operation_calls: AtomicUsize,
    pub ledger_calls: AtomicUsize,
    pub fee_stats_calls: AtomicUsize,
    pub cursors_seen: Mutex<Vec<Option<String>>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            fee_stats: json!({}),
            root_ok: true,
            ..Self::default()
        }
    }

    /// Each inner vec becomes one transactions page; pages are chained by cursors `c1`, `c2`, ...
    pub fn with_transaction_pages(mut self, pages: Vec<Vec<Value>>) -> Self {
        self.transaction_pages = pages;
        self
    }

    /// Gives the last page a `next` cursor too, the way Horizon does.
    pub fn with_dangling_cursor(mut self) -> Self {
        self.dangling_last_cursor = true;
        self
    }

    pub fn with_operations(mut self, transaction_hash: &str, operations: Vec<Value>) -> Self {
        self.operations.insert(transaction_hash.to_string(), operations);
        self
    }

    pub fn with_ledgers(mut self, ledgers: Vec<Value>) -> Self {
        self.ledgers = ledgers;
        self
    }

    pub fn with_fee_stats(mut self, fee_stats: Value) -> Self {
        self.fee_stats = fee_stats;
        self
    }

    pub fn with_root_failure(mut self) -> Self {
        self.root_ok = false;
        self
    }

    /// The first `count` calls (of any kind) fail with a 503.
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn maybe_fail(&self) -> Result<()> {
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(FeedError::ApiError {
                status: 503,
                message: "mock outage".to_string(),
            });
        }
        Ok(())
    }
}

pub fn transaction(id: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "hash": id,
        "created_at": created_at,
        "source_account": "GABC123",
        "operation_count": 1,
        "fee_charged": "100",
        "memo": "test",
        "successful": true
    })
}

pub fn payment(asset_code: Option<&str>, amount: &str) -> Value {
    match asset_code {
        Some(code) => json!({
            "type": "payment",
            "asset_type": "credit_alphanum4",
            "asset_code": code,
            "asset_issuer": "GISSUER",
            "amount": amount
        }),
        None => json!({ "type": "payment", "asset_type": "native", "amount": amount }),
    }
}

#[async_trait]
impl RecordSource for MockSource {
    async fn list_transactions(&self, cursor: Option<&str>, _limit: u32, _order: PageOrder) -> Result<Page> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        self.cursors_seen
            .lock()
            .unwrap()
            .push(cursor.map(|c| c.to_string()));

        let index = match cursor {
            None => 0,
            Some(c) => c.trim_start_matches('c').parse::<usize>().unwrap_or(usize::MAX),
        };

        let records = self.transaction_pages.get(index).cloned().unwrap_or_default();
        let has_more = index + 1 < self.transaction_pages.len();
        let next_cursor = if has_more || (self.dangling_last_cursor && !records.is_empty()) {
            Some(format!("c{}", index + 1))
        } else {
            None
        };

        Ok(Page::new(records, next_cursor))
    }

    async fn list_operations(&self, transaction_hash: &str, _cursor: Option<&str>, _limit: u32) -> Result<Page> {
        self.operation_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        let records = self.operations.get(transaction_hash).cloned().unwrap_or_default();
        Ok(Page::new(records, None))
    }

    async fn list_ledgers(&self, _cursor: Option<&str>, limit: u32, _order: PageOrder) -> Result<Page> {
        self.ledger_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        let records = self.ledgers.iter().take(limit as usize).cloned().collect();
        Ok(Page::new(records, None))
    }

    async fn fee_stats(&self) -> Result<Value> {
        self.fee_stats_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        Ok(self.fee_stats.clone())
    }

    async fn root(&self) -> Result<Value> {
        if self.root_ok {
            Ok(json!({ "horizon_version": "2.0.0" }))
        } else {
            Err(FeedError::ApiError {
                status: 502,
                message: "bad gateway".to_string(),
            })
        }
    }
}
