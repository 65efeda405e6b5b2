use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::info;

use apify_client::ApifyClient;
use firecrawl_client::FirecrawlClient;
use places_client::PlacesClient;
use sitesmith_common::{Config, JobCreateRequest, ScrapeResult};

use crate::connectors::{
    FacebookConnector, GooglePlacesConnector, InstagramConnector, WebsiteConnector,
};
use crate::traits::{Connector, ProgressSink};

/// Fan-out/fan-in over the configured source connectors. All connectors
/// run concurrently; one failing never blocks the others, and the result
/// lists sources in the canonical order regardless of completion order.
pub struct ScrapeStage {
    connectors: Vec<Arc<dyn Connector>>,
}

impl ScrapeStage {
    pub fn from_config(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.scrape_timeout_seconds);

        let places = config
            .google_places_api_key
            .as_deref()
            .map(|key| PlacesClient::new(key, timeout));
        let firecrawl = config
            .firecrawl_api_key
            .as_deref()
            .map(|key| FirecrawlClient::new(key, timeout));
        let apify = config
            .apify_api_token
            .clone()
            .map(|token| Arc::new(ApifyClient::new(token)));

        Self::with_connectors(vec![
            Arc::new(GooglePlacesConnector::new(places)),
            Arc::new(WebsiteConnector::new(firecrawl)),
            Arc::new(FacebookConnector::new(apify.clone())),
            Arc::new(InstagramConnector::new(apify)),
        ])
    }

    /// Assemble a stage from explicit connectors. Result ordering follows
    /// the order given here.
    pub fn with_connectors(connectors: Vec<Arc<dyn Connector>>) -> Self {
        Self { connectors }
    }

    /// Source tags in the order results will be assembled.
    pub fn sources(&self) -> Vec<crate::sources::Source> {
        self.connectors.iter().map(|c| c.source()).collect()
    }

    /// Run every connector concurrently and merge the outcomes.
    pub async fn scrape_all(
        &self,
        request: &JobCreateRequest,
        progress: &dyn ProgressSink,
    ) -> ScrapeResult {
        progress
            .report("scraping", "Scraping data sources...", 10)
            .await;

        let fetches = self.connectors.iter().map(|c| c.fetch(request));
        let sources = join_all(fetches).await;

        let mut raw_data = serde_json::Map::new();
        for record in &sources {
            if record.success {
                if let Some(ref data) = record.data {
                    if !payload_is_empty(data) {
                        raw_data.insert(record.source.clone(), data.clone());
                    }
                }
            }
        }

        let successful = sources.iter().filter(|s| s.success).count();
        info!(
            successful,
            total = sources.len(),
            "Scrape fan-in complete"
        );
        progress
            .report(
                "scraping",
                &format!("Scraped {}/{} sources", successful, sources.len()),
                30,
            )
            .await;

        ScrapeResult { sources, raw_data }
    }
}

/// A payload counts as empty when it carries no usable content:
/// null, empty object, empty array, or empty string.
fn payload_is_empty(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sitesmith_common::ScrapedSource;
    use std::time::Instant;

    use crate::sources::Source;
    use crate::traits::LogProgress;

    struct FakeConnector {
        source: Source,
        delay: Duration,
        record: ScrapedSource,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        fn source(&self) -> Source {
            self.source
        }

        async fn fetch(&self, _request: &JobCreateRequest) -> ScrapedSource {
            tokio::time::sleep(self.delay).await;
            self.record.clone()
        }
    }

    fn request() -> JobCreateRequest {
        JobCreateRequest {
            business_name: "Acme Coffee".to_string(),
            location: Some("San Francisco, CA".to_string()),
            website_url: None,
            facebook_url: None,
            instagram_url: None,
            client_email: None,
            template_preference: None,
        }
    }

    fn fake(source: Source, delay_ms: u64, record: ScrapedSource) -> Arc<dyn Connector> {
        Arc::new(FakeConnector {
            source,
            delay: Duration::from_millis(delay_ms),
            record,
        })
    }

    #[tokio::test]
    async fn test_wall_time_bounded_by_slowest_connector() {
        let stage = ScrapeStage::with_connectors(vec![
            fake(Source::Google, 50, ScrapedSource::ok("google", serde_json::json!({"name": "Acme"}))),
            fake(Source::Website, 100, ScrapedSource::ok("website", serde_json::json!({"markdown": "# Acme"}))),
            fake(Source::Facebook, 150, ScrapedSource::failed("facebook", "boom")),
            fake(Source::Instagram, 200, ScrapedSource::ok("instagram", serde_json::json!({"bio": "coffee"}))),
        ]);

        let started = Instant::now();
        let result = stage.scrape_all(&request(), &LogProgress).await;
        let elapsed = started.elapsed();

        // Concurrent: ~max(delays), not the 500ms sum.
        assert!(elapsed < Duration::from_millis(450), "took {elapsed:?}");
        assert_eq!(result.sources.len(), 4);
    }

    #[tokio::test]
    async fn test_sources_in_canonical_order_despite_completion_order() {
        // Slowest first: completion order is the reverse of listing order.
        let stage = ScrapeStage::with_connectors(vec![
            fake(Source::Google, 120, ScrapedSource::ok("google", serde_json::json!({"a": 1}))),
            fake(Source::Website, 80, ScrapedSource::ok("website", serde_json::json!({"b": 2}))),
            fake(Source::Facebook, 40, ScrapedSource::ok("facebook", serde_json::json!({"c": 3}))),
            fake(Source::Instagram, 1, ScrapedSource::ok("instagram", serde_json::json!({"d": 4}))),
        ]);

        let result = stage.scrape_all(&request(), &LogProgress).await;
        let order: Vec<&str> = result.sources.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(order, vec!["google", "website", "facebook", "instagram"]);
        assert_eq!(result.raw_data.len(), 4);
    }

    #[tokio::test]
    async fn test_raw_data_excludes_failures_and_empty_payloads() {
        let stage = ScrapeStage::with_connectors(vec![
            fake(Source::Google, 1, ScrapedSource::ok("google", serde_json::json!({"name": "Acme"}))),
            fake(Source::Website, 1, ScrapedSource::ok("website", serde_json::json!({}))),
            fake(Source::Facebook, 1, ScrapedSource::failed("facebook", "Not provided")),
            fake(Source::Instagram, 1, ScrapedSource::failed("instagram", "Not provided")),
        ]);

        let result = stage.scrape_all(&request(), &LogProgress).await;
        assert_eq!(result.sources.len(), 4);
        assert_eq!(result.raw_data.len(), 1);
        assert!(result.raw_data.contains_key("google"));
    }

    #[test]
    fn test_from_config_builds_canonical_source_order() {
        let config = Config {
            app_version: "0.0.0".to_string(),
            environment: "test".to_string(),
            anthropic_api_key: None,
            firecrawl_api_key: None,
            apify_api_token: None,
            google_places_api_key: None,
            scrape_timeout_seconds: 60,
            twentyfirst_api_key: None,
            vercel_token: None,
            vercel_team_id: None,
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
        };
        let stage = ScrapeStage::from_config(&config);
        assert_eq!(stage.sources(), Source::ALL.to_vec());
    }

    #[test]
    fn test_payload_is_empty() {
        assert!(payload_is_empty(&serde_json::json!(null)));
        assert!(payload_is_empty(&serde_json::json!({})));
        assert!(payload_is_empty(&serde_json::json!([])));
        assert!(payload_is_empty(&serde_json::json!("")));
        assert!(!payload_is_empty(&serde_json::json!({"k": "v"})));
        assert!(!payload_is_empty(&serde_json::json!(0)));
    }
}
