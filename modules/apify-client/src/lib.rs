pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{FacebookPagesInput, InstagramProfileInput, StartUrl};

use std::time::Duration;

use serde::Serialize;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor name for apify/facebook-pages-scraper.
const FACEBOOK_PAGES_SCRAPER: &str = "apify~facebook-pages-scraper";

/// Actor name for apify/instagram-profile-scraper.
const INSTAGRAM_PROFILE_SCRAPER: &str = "apify~instagram-profile-scraper";

/// Actor runs are synchronous (`run-sync-get-dataset-items`) and can take
/// a while on slow pages, so the client carries a long timeout.
const ACTOR_TIMEOUT: Duration = Duration::from_secs(120);

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(ACTOR_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, token }
    }

    /// Run an actor synchronously and return its dataset items.
    async fn run_sync<I: Serialize>(
        &self,
        actor: &str,
        input: &I,
    ) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/acts/{}/run-sync-get-dataset-items", BASE_URL, actor);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<serde_json::Value> = resp.json().await?;
        Ok(items)
    }

    /// Scrape a Facebook page: posts, reviews, and page metadata.
    /// Returns the first dataset item (the page record).
    pub async fn scrape_facebook_page(
        &self,
        page_url: &str,
        max_posts: u32,
        max_reviews: u32,
    ) -> Result<serde_json::Value> {
        tracing::info!(page_url, max_posts, max_reviews, "Starting Facebook page scrape");

        let input = FacebookPagesInput {
            start_urls: vec![StartUrl {
                url: page_url.to_string(),
            }],
            max_posts,
            max_reviews,
        };

        let items = self.run_sync(FACEBOOK_PAGES_SCRAPER, &input).await?;
        tracing::info!(page_url, count = items.len(), "Facebook page scrape complete");

        items.into_iter().next().ok_or(ApifyError::EmptyDataset)
    }

    /// Scrape an Instagram profile. Returns the first dataset item
    /// (the profile record with recent posts).
    pub async fn scrape_instagram_profile(&self, username: &str) -> Result<serde_json::Value> {
        tracing::info!(username, "Starting Instagram profile scrape");

        let input = InstagramProfileInput {
            usernames: vec![username.to_string()],
        };

        let items = self.run_sync(INSTAGRAM_PROFILE_SCRAPER, &input).await?;
        tracing::info!(username, count = items.len(), "Instagram profile scrape complete");

        items.into_iter().next().ok_or(ApifyError::EmptyDataset)
    }
}
