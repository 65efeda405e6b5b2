use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use sitesmith_common::{Job, JobStatus, SitesmithError};

/// In-memory job store. The single shared state between concurrent job
/// tasks, API readers and the notification fan-out; every read hands out
/// a complete cloned snapshot and every write replaces the whole record,
/// so readers never observe a half-updated job. A durable backend can be
/// substituted behind the same operations.
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new job. Duplicate ids are rejected.
    pub async fn create(&self, job: Job) -> Result<Job, SitesmithError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(SitesmithError::DuplicateJob(job.id.to_string()));
        }
        jobs.insert(job.id, job.clone());
        Ok(job)
    }

    /// Current snapshot of a job, if it exists.
    pub async fn get(&self, id: &Uuid) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Replace the stored record, stamping `updated_at`. Last writer wins
    /// on the whole record; there is no field-level merge.
    pub async fn update(&self, mut job: Job) -> Job {
        job.updated_at = chrono::Utc::now();
        self.jobs.write().await.insert(job.id, job.clone());
        job
    }

    /// Remove a record, reporting whether one existed.
    pub async fn delete(&self, id: &Uuid) -> bool {
        self.jobs.write().await.remove(id).is_some()
    }

    /// Jobs sorted by creation time descending, sliced by 1-indexed page.
    pub async fn list(
        &self,
        page: usize,
        page_size: usize,
        status: Option<JobStatus>,
    ) -> Vec<Job> {
        let jobs = self.jobs.read().await;
        let mut filtered: Vec<Job> = jobs
            .values()
            .filter(|j| status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();

        filtered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let start = page.saturating_sub(1).saturating_mul(page_size);
        filtered.into_iter().skip(start).take(page_size).collect()
    }

    /// Total number of jobs matching the filter.
    pub async fn count(&self, status: Option<JobStatus>) -> usize {
        let jobs = self.jobs.read().await;
        jobs.values()
            .filter(|j| status.is_none_or(|s| j.status == s))
            .count()
    }
}
