use anyhow::Result;
use async_trait::async_trait;

use sitesmith_common::{JobCreateRequest, ScrapedSource};

use crate::sources::Source;

// --- Inference seam ---

/// Single capability interface over the AI backend. Extraction, gap-fill
/// and site generation all go through this; prompt content stays in the
/// calling module.
#[async_trait]
pub trait Inference: Send + Sync {
    async fn infer(&self, system: &str, user: &str, max_tokens: u32) -> Result<String>;
}

#[async_trait]
impl Inference for ai_client::Claude {
    async fn infer(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        self.chat_completion(system, user, max_tokens).await
    }
}

// --- Connector seam ---

/// A fetcher for one external data source. `fetch` never errs: every
/// failure mode (absent input, missing credential, upstream error,
/// exhausted retries) is folded into a failure record.
#[async_trait]
pub trait Connector: Send + Sync {
    fn source(&self) -> Source;
    async fn fetch(&self, request: &JobCreateRequest) -> ScrapedSource;
}

// --- Progress seam ---

/// Receives pipeline progress events in emission order.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, stage: &str, message: &str, percent: u8);
}

/// Sink that only logs, for callers that don't track progress.
pub struct LogProgress;

#[async_trait]
impl ProgressSink for LogProgress {
    async fn report(&self, stage: &str, message: &str, percent: u8) {
        tracing::info!(stage, percent, "{message}");
    }
}
