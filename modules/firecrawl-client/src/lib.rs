pub mod error;

pub use error::{FirecrawlError, Result};

use std::time::Duration;

use serde::Deserialize;

const BASE_URL: &str = "https://api.firecrawl.dev/v1";

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

pub struct FirecrawlClient {
    client: reqwest::Client,
    api_key: String,
}

impl FirecrawlClient {
    pub fn new(api_key: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
        }
    }

    /// Scrape a page's main content. Returns the `data` object
    /// (markdown + html + metadata) from the Firecrawl response.
    pub async fn scrape(&self, url: &str) -> Result<serde_json::Value> {
        tracing::info!(url, "Firecrawl scrape");

        let body = serde_json::json!({
            "url": url,
            "formats": ["markdown", "html"],
            "onlyMainContent": true,
        });

        let resp = self
            .client
            .post(format!("{}/scrape", BASE_URL))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FirecrawlError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ScrapeResponse = resp.json().await?;
        if !parsed.success {
            return Err(FirecrawlError::Rejected(
                parsed.error.unwrap_or_else(|| "Unknown Firecrawl error".to_string()),
            ));
        }

        let data = parsed.data.unwrap_or_else(|| serde_json::json!({}));
        tracing::info!(url, "Firecrawl scrape complete");
        Ok(data)
    }
}
