use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitesmithError {
    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Deployment failed: {0}")]
    Deployment(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job already exists: {0}")]
    DuplicateJob(String),

    #[error("Website not yet generated")]
    SiteNotGenerated,

    #[error("Already deployed")]
    AlreadyDeployed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
