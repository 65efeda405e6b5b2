use std::env;

/// Application configuration loaded from environment variables.
///
/// Every outbound credential is optional: a missing key degrades the
/// matching connector or feature to a "not configured" outcome instead
/// of preventing startup, and the health endpoint reports which keys
/// are present.
#[derive(Debug, Clone)]
pub struct Config {
    // App
    pub app_version: String,
    pub environment: String,

    // AI provider
    pub anthropic_api_key: Option<String>,

    // Scraping
    pub firecrawl_api_key: Option<String>,
    pub apify_api_token: Option<String>,
    pub google_places_api_key: Option<String>,
    pub scrape_timeout_seconds: u64,

    // Site generation (premium component backend, optional)
    pub twentyfirst_api_key: Option<String>,

    // Hosting
    pub vercel_token: Option<String>,
    pub vercel_team_id: Option<String>,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            firecrawl_api_key: optional_env("FIRECRAWL_API_KEY"),
            apify_api_token: optional_env("APIFY_API_TOKEN"),
            google_places_api_key: optional_env("GOOGLE_PLACES_API_KEY"),
            scrape_timeout_seconds: env::var("SCRAPE_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            twentyfirst_api_key: optional_env("TWENTYFIRST_API_KEY"),
            vercel_token: optional_env("VERCEL_TOKEN"),
            vercel_team_id: optional_env("VERCEL_TEAM_ID"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
        }
    }
}

/// Read an env var, treating unset and empty as absent.
fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
