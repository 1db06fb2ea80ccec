use crate::api::{Page, PageOrder, RecordSource};
use crate::error::Result;
use crate::retry::RetryExecutor;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Which paged collection to walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageQuery {
    Transactions { limit: u32, order: PageOrder },
    Operations { transaction_hash: String, limit: u32 },
    Ledgers { limit: u32, order: PageOrder },
}

impl PageQuery {
    pub fn name(&self) -> &'static str {
        match self {
            PageQuery::Transactions { .. } => "transactions",
            PageQuery::Operations { .. } => "operations",
            PageQuery::Ledgers { .. } => "ledgers",
        }
    }

    async fn fetch<S>(&self, source: &S, cursor: Option<&str>) -> Result<Page>
    where
        S: RecordSource + ?Sized,
    {
        match self {
            PageQuery::Transactions { limit, order } => source.list_transactions(cursor, *limit, *order).await,
            PageQuery::Operations { transaction_hash, limit } => {
                source.list_operations(transaction_hash, cursor, *limit).await
            }
            PageQuery::Ledgers { limit, order } => source.list_ledgers(cursor, *limit, *order).await,
        }
    }
}

/// Walks a cursor-linked collection one page at a time.
///
/// Stops at the first page without a cursor, at an empty page (Horizon links a `next`
/// page even when there is nothing left), when the server hands back any cursor already
/// requested, or after `max_pages` pages. Any fetch error ends the walk.
pub struct Paginator<'a, S: ?Sized> {
    source: &'a S,
    retry: &'a RetryExecutor,
    query: PageQuery,
    max_pages: usize,
    cursor: Option<String>,
    requested: HashSet<String>,
    pages_fetched: usize,
    finished: bool,
}

impl<'a, S> Paginator<'a, S>
where
    S: RecordSource + ?Sized,
{
    pub fn new(source: &'a S, retry: &'a RetryExecutor, query: PageQuery, max_pages: usize) -> Self {
        Self {
            source,
            retry,
            query,
            max_pages,
            cursor: None,
            requested: HashSet::new(),
            pages_fetched: 0,
            finished: false,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.finished {
            return Ok(None);
        }

        if self.pages_fetched >= self.max_pages {
            warn!(
                "Stopping {} pagination at the {}-page safety limit",
                self.query.name(),
                self.max_pages
            );
            self.finished = true;
            return Ok(None);
        }

        let query = &self.query;
        let source = self.source;
        let cursor = self.cursor.as_deref();

        let page = match self.retry.execute(query.name(), move || query.fetch(source, cursor)).await {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        self.pages_fetched += 1;
        debug!(
            "Fetched {} page {} ({} records)",
            self.query.name(),
            self.pages_fetched,
            page.records.len()
        );

        match &page.next_cursor {
            Some(next) if !page.records.is_empty() && !self.requested.contains(next) => {
                self.requested.insert(next.clone());
                self.cursor = Some(next.clone());
            }
            Some(next) if !page.records.is_empty() => {
                warn!("{} cursor {} was already followed, stopping", self.query.name(), next);
                self.finished = true;
            }
            _ => self.finished = true,
        }

        Ok(Some(page))
    }

    /// Drains the remaining pages.
    pub async fn collect_pages(mut self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await? {
            pages.push(page);
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockSource;
    use crate::error::FeedError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves one record per page, linking each cursor to the next one in `links`.
    struct LinkedSource {
        links: Vec<(Option<&'static str>, &'static str)>,
        requested: Mutex<Vec<Option<String>>>,
    }

    impl LinkedSource {
        fn new(links: Vec<(Option<&'static str>, &'static str)>) -> Self {
            Self { links, requested: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl RecordSource for LinkedSource {
        async fn list_transactions(&self, cursor: Option<&str>, _limit: u32, _order: PageOrder) -> Result<Page> {
            self.requested.lock().unwrap().push(cursor.map(str::to_string));
            let next = self
                .links
                .iter()
                .find(|(from, _)| *from == cursor)
                .map(|(_, to)| to.to_string());
            Ok(Page::new(vec![json!({ "id": cursor.unwrap_or("first") })], next))
        }

        async fn list_operations(&self, _hash: &str, _cursor: Option<&str>, _limit: u32) -> Result<Page> {
            Ok(Page::default())
        }

        async fn list_ledgers(&self, _cursor: Option<&str>, _limit: u32, _order: PageOrder) -> Result<Page> {
            Ok(Page::default())
        }

        async fn fee_stats(&self) -> Result<Value> {
            Ok(json!({}))
        }

        async fn root(&self) -> Result<Value> {
            Ok(json!({}))
        }
    }

    fn transactions_query() -> PageQuery {
        PageQuery::Transactions { limit: 200, order: PageOrder::Desc }
    }

    fn quick_retry() -> RetryExecutor {
        RetryExecutor::new(3, Duration::from_millis(1), Duration::from_millis(4))
    }

    #[tokio::test]
    async fn test_yields_every_page_in_order_then_stops() {
        let source = MockSource::new().with_transaction_pages(vec![
            vec![json!({ "id": "1" })],
            vec![json!({ "id": "2" })],
            vec![json!({ "id": "3" })],
        ]);
        let retry = quick_retry();

        let pages = Paginator::new(&source, &retry, transactions_query(), 50)
            .collect_pages()
            .await
            .unwrap();

        let ids: Vec<_> = pages.iter().map(|p| p.records[0]["id"].clone()).collect();
        assert_eq!(ids, vec![json!("1"), json!("2"), json!("3")]);
        assert_eq!(MockSource::calls(&source.transaction_calls), 3);
        assert_eq!(
            *source.cursors_seen.lock().unwrap(),
            vec![None, Some("c1".to_string()), Some("c2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_page_ends_walk_despite_next_link() {
        let source = MockSource::new()
            .with_transaction_pages(vec![vec![json!({ "id": "1" })], vec![json!({ "id": "2" })]])
            .with_dangling_cursor();
        let retry = quick_retry();

        let pages = Paginator::new(&source, &retry, transactions_query(), 50)
            .collect_pages()
            .await
            .unwrap();

        // two full pages plus the empty one Horizon serves after them
        assert_eq!(pages.len(), 3);
        assert!(pages[2].records.is_empty());
    }

    #[tokio::test]
    async fn test_page_limit_bounds_the_walk() {
        let many: Vec<_> = (0..10).map(|i| vec![json!({ "id": i.to_string() })]).collect();
        let source = MockSource::new().with_transaction_pages(many);
        let retry = quick_retry();

        let mut paginator = Paginator::new(&source, &retry, transactions_query(), 4);
        let mut seen = 0;
        while paginator.next_page().await.unwrap().is_some() {
            seen += 1;
        }

        assert_eq!(seen, 4);
        assert_eq!(paginator.pages_fetched(), 4);
        assert_eq!(MockSource::calls(&source.transaction_calls), 4);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_the_sequence() {
        let source = MockSource::new()
            .with_transaction_pages(vec![vec![json!({ "id": "1" })]])
            .with_transient_failures(10);
        let retry = quick_retry();

        let mut paginator = Paginator::new(&source, &retry, transactions_query(), 50);
        let result = paginator.next_page().await;

        assert!(matches!(result, Err(FeedError::RemoteFetch { attempts: 3, .. })));
        assert!(paginator.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repeated_cursor_ends_walk() {
        let source = LinkedSource::new(vec![(None, "a"), (Some("a"), "a")]);
        let retry = quick_retry();

        let pages = Paginator::new(&source, &retry, transactions_query(), 50)
            .collect_pages()
            .await
            .unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(*source.requested.lock().unwrap(), vec![None, Some("a".to_string())]);
    }

    #[tokio::test]
    async fn test_cursor_cycle_never_refetches_a_page() {
        let source = LinkedSource::new(vec![(None, "a"), (Some("a"), "b"), (Some("b"), "a")]);
        let retry = quick_retry();

        let pages = Paginator::new(&source, &retry, transactions_query(), 50)
            .collect_pages()
            .await
            .unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(
            *source.requested.lock().unwrap(),
            vec![None, Some("a".to_string()), Some("b".to_string())]
        );
    }
}
