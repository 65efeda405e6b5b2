use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StartUrl {
    pub url: String,
}

/// Input for the apify/facebook-pages-scraper actor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacebookPagesInput {
    pub start_urls: Vec<StartUrl>,
    pub max_posts: u32,
    pub max_reviews: u32,
}

/// Input for the apify/instagram-profile-scraper actor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramProfileInput {
    pub usernames: Vec<String>,
}
