use thiserror::Error;

pub type Result<T> = std::result::Result<T, VercelError>;

#[derive(Debug, Error)]
pub enum VercelError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Deployment failed: {0}")]
    DeployFailed(String),

    #[error("Deployment did not become ready within {0} status checks")]
    Timeout(u32),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for VercelError {
    fn from(err: reqwest::Error) -> Self {
        VercelError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for VercelError {
    fn from(err: serde_json::Error) -> Self {
        VercelError::Parse(err.to_string())
    }
}
