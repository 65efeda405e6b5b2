use thiserror::Error;

pub type Result<T> = std::result::Result<T, FirecrawlError>;

#[derive(Debug, Error)]
pub enum FirecrawlError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Scrape rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for FirecrawlError {
    fn from(err: reqwest::Error) -> Self {
        FirecrawlError::Network(err.to_string())
    }
}

impl FirecrawlError {
    pub fn is_transient(&self) -> bool {
        match self {
            FirecrawlError::Network(_) => true,
            FirecrawlError::Api { status, .. } => *status >= 500 || *status == 429,
            FirecrawlError::Rejected(_) => false,
        }
    }
}
