use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use sitesmith_common::{Job, JobCreateRequest, JobProgress, JobStatus, SitesmithError};

use crate::deployer::Deployer;
use crate::notify::UpdateHub;
use crate::orchestrator::Orchestrator;
use crate::store::JobStore;
use crate::traits::ProgressSink;

/// Owns the job lifecycle: accepts requests, runs the pipeline as a
/// background task, maps stage progress onto the forward-only status
/// machine, absorbs stage failures into a terminal `failed` status, and
/// handles the caller-triggered deploy transition.
pub struct JobRunner {
    store: Arc<JobStore>,
    hub: Arc<UpdateHub>,
    orchestrator: Orchestrator,
    deployer: Option<Deployer>,
}

/// Pipeline statuses in transition order. Failed is terminal and never
/// left; a lower-ranked status never replaces a higher one.
fn status_rank(status: JobStatus) -> u8 {
    match status {
        JobStatus::Pending => 0,
        JobStatus::Scraping => 1,
        JobStatus::Extracting => 2,
        JobStatus::Generating => 3,
        JobStatus::Deploying => 4,
        JobStatus::Completed => 5,
        JobStatus::Failed => 6,
    }
}

/// Status a progress stage tag advances the job to. `completed` is not
/// mapped here: the runner sets it explicitly, after results are stored.
fn status_for_stage(stage: &str) -> Option<JobStatus> {
    match stage {
        "scraping" => Some(JobStatus::Scraping),
        "extracting" => Some(JobStatus::Extracting),
        "generating" => Some(JobStatus::Generating),
        "deploying" => Some(JobStatus::Deploying),
        _ => None,
    }
}

/// Progress sink that appends to the job's log, advances its status,
/// persists the record and pushes the snapshot to subscribers.
struct StoreProgress<'a> {
    store: &'a JobStore,
    hub: &'a UpdateHub,
    job_id: Uuid,
}

#[async_trait]
impl ProgressSink for StoreProgress<'_> {
    async fn report(&self, stage: &str, message: &str, percent: u8) {
        let Some(mut job) = self.store.get(&self.job_id).await else {
            return;
        };

        job.current_stage = Some(stage.to_string());
        job.progress.push(JobProgress {
            stage: stage.to_string(),
            message: message.to_string(),
            progress_percent: percent,
            timestamp: Utc::now(),
        });

        if let Some(next) = status_for_stage(stage) {
            if status_rank(next) > status_rank(job.status) && job.status != JobStatus::Failed {
                job.status = next;
            }
        }

        let job = self.store.update(job).await;
        self.hub.publish(&job).await;
    }
}

impl JobRunner {
    pub fn new(
        store: Arc<JobStore>,
        hub: Arc<UpdateHub>,
        orchestrator: Orchestrator,
        deployer: Option<Deployer>,
    ) -> Self {
        Self {
            store,
            hub,
            orchestrator,
            deployer,
        }
    }

    /// Accept a request: validate, store the pending job, and kick off
    /// the pipeline as a background task. Returns without blocking on
    /// pipeline completion.
    pub async fn create_job(self: &Arc<Self>, request: JobCreateRequest) -> Result<Job, SitesmithError> {
        request.validate().map_err(SitesmithError::Validation)?;

        let job = Job::new(Uuid::new_v4(), request);
        let job = self.store.create(job).await?;

        let runner = Arc::clone(self);
        let job_id = job.id;
        tokio::spawn(async move {
            runner.process(job_id).await;
        });

        info!(%job_id, business_name = %job.request.business_name, "Job created");
        Ok(job)
    }

    /// Run the pipeline for one job. Every exit path leaves the job in a
    /// terminal status with a final snapshot published — a job is never
    /// silently stuck mid-stage.
    pub async fn process(&self, job_id: Uuid) {
        let Some(job) = self.store.get(&job_id).await else {
            return;
        };

        let sink = StoreProgress {
            store: self.store.as_ref(),
            hub: self.hub.as_ref(),
            job_id,
        };

        match self.orchestrator.run(&job.request, &sink).await {
            Ok(output) => {
                if let Some(mut job) = self.store.get(&job_id).await {
                    job.scrape_result = Some(output.scrape_result);
                    job.extracted_data = Some(output.extracted_data);
                    job.generated_site = Some(output.generated_site);
                    job.status = JobStatus::Completed;
                    self.store.update(job).await;
                }
                sink.report("completed", "Website generated successfully!", 100)
                    .await;
            }
            Err(e) => {
                error!(%job_id, error = %e, "Job failed");
                if let Some(mut job) = self.store.get(&job_id).await {
                    job.status = JobStatus::Failed;
                    job.error = Some(e.to_string());
                    let job = self.store.update(job).await;
                    self.hub.publish(&job).await;
                }
            }
        }
    }

    /// Caller-triggered deploy transition. Gated on the site existing
    /// and no prior deployment; a remote failure moves the job to
    /// `failed` and surfaces the reason.
    pub async fn deploy(
        &self,
        job_id: Uuid,
        custom_domain: Option<&str>,
    ) -> Result<Job, SitesmithError> {
        let job = self
            .store
            .get(&job_id)
            .await
            .ok_or_else(|| SitesmithError::JobNotFound(job_id.to_string()))?;

        let Some(site) = job.generated_site.clone() else {
            return Err(SitesmithError::SiteNotGenerated);
        };
        if job.deployment.is_some() {
            return Err(SitesmithError::AlreadyDeployed);
        }
        let Some(ref deployer) = self.deployer else {
            return Err(SitesmithError::Config(
                "Vercel token not configured".to_string(),
            ));
        };

        let mut job = job;
        job.status = JobStatus::Deploying;
        let job = self.store.update(job).await;
        self.hub.publish(&job).await;

        match deployer
            .deploy(&site.html, &job.request.business_name, custom_domain)
            .await
        {
            Ok(deployment) => {
                let mut job = self
                    .store
                    .get(&job_id)
                    .await
                    .ok_or_else(|| SitesmithError::JobNotFound(job_id.to_string()))?;
                info!(%job_id, url = %deployment.url, "Deployment successful");
                job.deployment = Some(deployment);
                job.status = JobStatus::Completed;
                let job = self.store.update(job).await;
                self.hub.publish(&job).await;
                Ok(job)
            }
            Err(e) => {
                error!(%job_id, error = %e, "Deployment failed");
                if let Some(mut job) = self.store.get(&job_id).await {
                    job.status = JobStatus::Failed;
                    job.error = Some(format!("Deployment failed: {e}"));
                    let job = self.store.update(job).await;
                    self.hub.publish(&job).await;
                }
                Err(SitesmithError::Deployment(e.to_string()))
            }
        }
    }
}
