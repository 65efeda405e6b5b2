use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlacesError>;

#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("No place matched the query")]
    NotFound,

    #[error("Place details missing from response")]
    MissingDetails,
}

impl From<reqwest::Error> for PlacesError {
    fn from(err: reqwest::Error) -> Self {
        PlacesError::Network(err.to_string())
    }
}

impl PlacesError {
    pub fn is_transient(&self) -> bool {
        match self {
            PlacesError::Network(_) => true,
            PlacesError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
