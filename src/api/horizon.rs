use crate::api::{expect_object, Page, PageOrder, RecordSource};
use crate::config::Config;
use crate::error::{FeedError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};
use urlencoding::encode;

#[derive(Clone)]
pub struct HorizonClient {
    client: Client,
    base_url: String,
}

impl HorizonClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.horizon_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("Fetching from Horizon: {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FeedError::ApiError {
                status: status.as_u16(),
                message: format!("Horizon returned {}: {}", status, error_text),
            });
        }

        let text = response.text().await?;
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                error!("Horizon raw response: {}", text);
                Err(FeedError::JsonError(e))
            }
        }
    }

    async fn get_page(&self, url: &str) -> Result<Page> {
        let body = self.get_json(url).await?;
        Page::from_hal(body)
    }
}

fn with_cursor(mut url: String, cursor: Option<&str>) -> String {
    if let Some(cursor) = cursor {
        url.push_str("&cursor=");
        url.push_str(&encode(cursor));
    }
    url
}

#[async_trait]
impl RecordSource for HorizonClient {
    async fn list_transactions(&self, cursor: Option<&str>, limit: u32, order: PageOrder) -> Result<Page> {
        let url = format!("{}/transactions?limit={}&order={}", self.base_url, limit, order);
        self.get_page(&with_cursor(url, cursor)).await
    }

    async fn list_operations(&self, transaction_hash: &str, cursor: Option<&str>, limit: u32) -> Result<Page> {
        let url = format!(
            "{}/transactions/{}/operations?limit={}&order=asc",
            self.base_url,
            encode(transaction_hash),
            limit
        );
        self.get_page(&with_cursor(url, cursor)).await
    }

    async fn list_ledgers(&self, cursor: Option<&str>, limit: u32, order: PageOrder) -> Result<Page> {
        let url = format!("{}/ledgers?limit={}&order={}", self.base_url, limit, order);
        self.get_page(&with_cursor(url, cursor)).await
    }

    async fn fee_stats(&self) -> Result<Value> {
        let body = self.get_json(&format!("{}/fee_stats", self.base_url)).await?;
        expect_object("fee_stats", body)
    }

    async fn root(&self) -> Result<Value> {
        let body = self.get_json(&format!("{}/", self.base_url)).await?;
        expect_object("root", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let config = Config::with_horizon_url("https://custom-horizon.example.com/");
        let client = HorizonClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://custom-horizon.example.com");
    }

    #[test]
    fn test_cursor_is_appended_and_encoded() {
        let url = "https://h.example/transactions?limit=10&order=desc".to_string();

        assert_eq!(with_cursor(url.clone(), None), url);
        assert_eq!(
            with_cursor(url.clone(), Some("12 34")),
            format!("{}&cursor=12%2034", url)
        );
    }
}
