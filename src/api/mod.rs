pub mod horizon;

#[cfg(test)]
pub(crate) mod mock;

pub use horizon::HorizonClient;

use crate::error::{FeedError, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOrder {
    Asc,
    Desc,
}

impl PageOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageOrder::Asc => "asc",
            PageOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for PageOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of raw records plus the cursor for the page after it.
/// A page without a cursor is the last one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HalPage {
    #[serde(rename = "_embedded", default)]
    embedded: Option<HalEmbedded>,
    #[serde(rename = "_links", default)]
    links: Option<HalLinks>,
}

#[derive(Debug, Deserialize)]
struct HalEmbedded {
    #[serde(default)]
    records: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct HalLinks {
    next: Option<HalLink>,
}

#[derive(Debug, Deserialize)]
struct HalLink {
    href: String,
}

impl Page {
    pub fn new(records: Vec<Value>, next_cursor: Option<String>) -> Self {
        Self { records, next_cursor }
    }

    /// Builds a page from a Horizon HAL collection body.
    pub fn from_hal(body: Value) -> Result<Self> {
        let page: HalPage = serde_json::from_value(body)?;

        let records = page.embedded.map(|e| e.records).unwrap_or_default();
        let next_cursor = page
            .links
            .and_then(|links| links.next)
            .and_then(|next| cursor_from_href(&next.href));

        Ok(Self { records, next_cursor })
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Pulls the `cursor` query parameter out of a `_links.next.href`.
pub fn cursor_from_href(href: &str) -> Option<String> {
    let cursor = match Url::parse(href) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "cursor")
            .map(|(_, value)| value.into_owned()),
        // relative or templated links
        Err(_) => href
            .split(['?', '&'])
            .find_map(|part| part.strip_prefix("cursor="))
            .map(|value| value.to_string()),
    };

    cursor.filter(|c| !c.is_empty())
}

/// The remote ledger-data capabilities the pipeline consumes.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn list_transactions(&self, cursor: Option<&str>, limit: u32, order: PageOrder) -> Result<Page>;

    async fn list_operations(&self, transaction_hash: &str, cursor: Option<&str>, limit: u32) -> Result<Page>;

    async fn list_ledgers(&self, cursor: Option<&str>, limit: u32, order: PageOrder) -> Result<Page>;

    async fn fee_stats(&self) -> Result<Value>;

    /// Liveness probe.
    async fn root(&self) -> Result<Value>;
}

pub(crate) fn expect_object(kind: &'static str, value: Value) -> Result<Value> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(FeedError::malformed(kind, "expected a JSON object"))
    }
}
