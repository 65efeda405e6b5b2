use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use apify_client::ApifyClient;
use firecrawl_client::FirecrawlClient;
use places_client::{PlacesClient, PlacesError};
use sitesmith_common::{JobCreateRequest, ScrapedSource};

use crate::sources::Source;
use crate::traits::Connector;

/// Failure record reason for sources the caller did not supply input for.
pub const NOT_PROVIDED: &str = "Not provided";

/// Base backoff for transient upstream failures. Actual delay is
/// base * 2^attempt, capped at MAX_RETRY_DELAY, plus random jitter (0-1s).
const RETRY_BASE: Duration = Duration::from_secs(2);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Max posts/reviews requested from the Facebook page scraper.
const FACEBOOK_MAX_POSTS: u32 = 10;
const FACEBOOK_MAX_REVIEWS: u32 = 10;

// --- Retry helper ---

/// Upstream errors that a retry could plausibly clear.
pub(crate) trait TransientError: std::fmt::Display {
    fn is_transient(&self) -> bool;
}

impl TransientError for apify_client::ApifyError {
    fn is_transient(&self) -> bool {
        self.is_transient()
    }
}

impl TransientError for firecrawl_client::FirecrawlError {
    fn is_transient(&self) -> bool {
        self.is_transient()
    }
}

impl TransientError for places_client::PlacesError {
    fn is_transient(&self) -> bool {
        self.is_transient()
    }
}

/// Run `op` up to `max_attempts` times, sleeping with exponential backoff
/// and jitter between transient failures. Non-transient errors (absence,
/// configuration, upstream semantic failures) return immediately.
async fn run_with_retries<T, E, F, Fut>(source: Source, max_attempts: u32, op: F) -> Result<T, E>
where
    E: TransientError,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                let backoff = (RETRY_BASE * 2u32.pow(attempt)).min(MAX_RETRY_DELAY);
                let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
                warn!(
                    source = source.as_str(),
                    attempt = attempt + 1,
                    backoff_secs = backoff.as_secs(),
                    error = %e,
                    "Transient scrape failure, retrying after backoff"
                );
                tokio::time::sleep(backoff + jitter).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// --- Google Places ---

pub struct GooglePlacesConnector {
    client: Option<PlacesClient>,
}

impl GooglePlacesConnector {
    pub fn new(client: Option<PlacesClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Connector for GooglePlacesConnector {
    fn source(&self) -> Source {
        Source::Google
    }

    async fn fetch(&self, request: &JobCreateRequest) -> ScrapedSource {
        let source = self.source().as_str();

        let Some(ref location) = request.location else {
            return ScrapedSource::failed(source, NOT_PROVIDED);
        };
        let Some(ref client) = self.client else {
            return ScrapedSource::failed(source, "Google Places API key not configured");
        };

        let query = format!("{} {}", request.business_name, location);
        match run_with_retries(Source::Google, 3, || client.lookup(&query)).await {
            Ok(details) => {
                tracing::info!(source, query, "Google Places scraped");
                ScrapedSource::ok(source, details)
            }
            Err(PlacesError::NotFound) => {
                ScrapedSource::failed(source, "Business not found on Google")
            }
            Err(PlacesError::MissingDetails) => {
                ScrapedSource::failed(source, "Failed to get place details")
            }
            Err(e) => ScrapedSource::failed(source, e.to_string()),
        }
    }
}

// --- Website (Firecrawl) ---

pub struct WebsiteConnector {
    client: Option<FirecrawlClient>,
}

impl WebsiteConnector {
    pub fn new(client: Option<FirecrawlClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Connector for WebsiteConnector {
    fn source(&self) -> Source {
        Source::Website
    }

    async fn fetch(&self, request: &JobCreateRequest) -> ScrapedSource {
        let source = self.source().as_str();

        let Some(ref url) = request.website_url else {
            return ScrapedSource::failed(source, NOT_PROVIDED);
        };
        let Some(ref client) = self.client else {
            return ScrapedSource::failed(source, "Firecrawl API key not configured");
        };

        match run_with_retries(Source::Website, 3, || client.scrape(url)).await {
            Ok(data) => {
                tracing::info!(source, url, "Website scraped");
                ScrapedSource::ok(source, data)
            }
            Err(e) => ScrapedSource::failed(source, e.to_string()),
        }
    }
}

// --- Facebook (Apify) ---

pub struct FacebookConnector {
    client: Option<Arc<ApifyClient>>,
}

impl FacebookConnector {
    pub fn new(client: Option<Arc<ApifyClient>>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Connector for FacebookConnector {
    fn source(&self) -> Source {
        Source::Facebook
    }

    async fn fetch(&self, request: &JobCreateRequest) -> ScrapedSource {
        let source = self.source().as_str();

        let Some(ref url) = request.facebook_url else {
            return ScrapedSource::failed(source, NOT_PROVIDED);
        };
        let Some(ref client) = self.client else {
            return ScrapedSource::failed(source, "Apify API token not configured");
        };

        let result = run_with_retries(Source::Facebook, 2, || {
            client.scrape_facebook_page(url, FACEBOOK_MAX_POSTS, FACEBOOK_MAX_REVIEWS)
        })
        .await;

        match result {
            Ok(data) => {
                tracing::info!(source, url, "Facebook page scraped");
                ScrapedSource::ok(source, data)
            }
            Err(apify_client::ApifyError::EmptyDataset) => {
                ScrapedSource::failed(source, "No data returned from Facebook scrape")
            }
            Err(e) => ScrapedSource::failed(source, e.to_string()),
        }
    }
}

// --- Instagram (Apify) ---

pub struct InstagramConnector {
    client: Option<Arc<ApifyClient>>,
}

impl InstagramConnector {
    pub fn new(client: Option<Arc<ApifyClient>>) -> Self {
        Self { client }
    }
}

/// Normalize an Instagram handle or profile URL to a bare username.
/// Accepts `@acme`, `acme`, and `https://instagram.com/acme/...`.
pub fn instagram_username(handle_or_url: &str) -> Option<String> {
    let trimmed = handle_or_url.trim();

    let username = if trimmed.contains("instagram.com") {
        let parsed = url::Url::parse(trimmed).ok()?;
        parsed
            .path_segments()?
            .find(|segment| !segment.is_empty())?
            .to_string()
    } else {
        trimmed.trim_start_matches('@').to_string()
    };

    if username.is_empty() {
        None
    } else {
        Some(username)
    }
}

#[async_trait]
impl Connector for InstagramConnector {
    fn source(&self) -> Source {
        Source::Instagram
    }

    async fn fetch(&self, request: &JobCreateRequest) -> ScrapedSource {
        let source = self.source().as_str();

        let Some(ref handle_or_url) = request.instagram_url else {
            return ScrapedSource::failed(source, NOT_PROVIDED);
        };
        let Some(ref client) = self.client else {
            return ScrapedSource::failed(source, "Apify API token not configured");
        };

        let Some(username) = instagram_username(handle_or_url) else {
            return ScrapedSource::failed(source, "Invalid Instagram handle");
        };

        let result =
            run_with_retries(Source::Instagram, 2, || client.scrape_instagram_profile(&username))
                .await;

        match result {
            Ok(data) => {
                tracing::info!(source, username, "Instagram profile scraped");
                ScrapedSource::ok(source, data)
            }
            Err(apify_client::ApifyError::EmptyDataset) => {
                ScrapedSource::failed(source, "No data returned from Instagram scrape")
            }
            Err(e) => ScrapedSource::failed(source, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesmith_common::JobCreateRequest;

    fn request_with_instagram(value: Option<&str>) -> JobCreateRequest {
        JobCreateRequest {
            business_name: "Acme Coffee".to_string(),
            location: None,
            website_url: None,
            facebook_url: None,
            instagram_url: value.map(String::from),
            client_email: None,
            template_preference: None,
        }
    }

    #[test]
    fn test_instagram_username_from_handle() {
        assert_eq!(instagram_username("@acmecoffee"), Some("acmecoffee".to_string()));
        assert_eq!(instagram_username("acmecoffee"), Some("acmecoffee".to_string()));
    }

    #[test]
    fn test_instagram_username_from_url() {
        assert_eq!(
            instagram_username("https://instagram.com/acmecoffee"),
            Some("acmecoffee".to_string())
        );
        assert_eq!(
            instagram_username("https://www.instagram.com/acmecoffee/?hl=en"),
            Some("acmecoffee".to_string())
        );
    }

    #[test]
    fn test_instagram_username_invalid() {
        assert_eq!(instagram_username("@"), None);
        assert_eq!(instagram_username(""), None);
    }

    #[tokio::test]
    async fn test_absent_input_short_circuits() {
        let connector = InstagramConnector::new(None);
        let record = connector.fetch(&request_with_instagram(None)).await;
        assert!(!record.success);
        assert_eq!(record.error.as_deref(), Some(NOT_PROVIDED));
    }

    #[tokio::test]
    async fn test_missing_credential_reported() {
        let connector = InstagramConnector::new(None);
        let record = connector.fetch(&request_with_instagram(Some("@acme"))).await;
        assert!(!record.success);
        assert_eq!(
            record.error.as_deref(),
            Some("Apify API token not configured")
        );
    }
}
