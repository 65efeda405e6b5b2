use anyhow::Result;
use tracing::info;

use sitesmith_common::{ExtractedBusinessData, GeneratedSite, JobCreateRequest, ScrapeResult};

use crate::generator::SiteGenerator;
use crate::normalizer::{Normalizer, GAP_FILL_THRESHOLD};
use crate::scrape::ScrapeStage;
use crate::traits::ProgressSink;

/// Everything the pipeline produced for one job.
pub struct PipelineOutput {
    pub scrape_result: ScrapeResult,
    pub extracted_data: ExtractedBusinessData,
    pub generated_site: GeneratedSite,
}

/// Drives the generation pipeline end to end:
/// scrape all sources concurrently, extract and normalize with AI,
/// fill gaps when the profile is weak, then render the site.
pub struct Orchestrator {
    scrape: ScrapeStage,
    normalizer: Normalizer,
    generator: SiteGenerator,
}

impl Orchestrator {
    pub fn new(scrape: ScrapeStage, normalizer: Normalizer, generator: SiteGenerator) -> Self {
        Self {
            scrape,
            normalizer,
            generator,
        }
    }

    pub async fn run(
        &self,
        request: &JobCreateRequest,
        progress: &dyn ProgressSink,
    ) -> Result<PipelineOutput> {
        info!(business = %request.business_name, "Starting orchestration");

        // Step 1: scrape all sources
        progress
            .report("scraping", "Starting data collection...", 5)
            .await;
        let scrape_result = self.scrape.scrape_all(request, progress).await;

        let successful: Vec<&str> = scrape_result
            .sources
            .iter()
            .filter(|s| s.success)
            .map(|s| s.source.as_str())
            .collect();
        info!(
            successful = ?successful,
            total = scrape_result.sources.len(),
            "Scraping complete"
        );

        // Step 2: extract and normalize
        progress
            .report("extracting", "Analyzing data with AI...", 35)
            .await;
        let mut extracted_data = self
            .normalizer
            .extract(&scrape_result, &request.business_name, progress)
            .await;

        info!(
            quality_score = extracted_data.data_quality_score,
            services = extracted_data.services.len(),
            testimonials = extracted_data.testimonials.len(),
            "Extraction complete"
        );

        // Step 3: fill gaps when the profile is weak
        if extracted_data.data_quality_score < GAP_FILL_THRESHOLD
            || !extracted_data.missing_fields.is_empty()
        {
            progress.report("extracting", "Enhancing data...", 55).await;
            extracted_data = self.normalizer.fill_gaps(extracted_data, progress).await;
        }

        // Step 4: render the site
        progress
            .report("generating", "Creating website design...", 65)
            .await;
        let generated_site = self.generator.generate(&extracted_data, progress).await?;

        info!(
            sections = ?generated_site.sections_included,
            time_ms = generated_site.generation_time_ms,
            "Generation complete"
        );

        progress.report("completed", "Website ready!", 100).await;

        Ok(PipelineOutput {
            scrape_result,
            extracted_data,
            generated_site,
        })
    }
}
