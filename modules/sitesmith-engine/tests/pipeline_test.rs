//! End-to-end pipeline tests against mock connectors and a scripted
//! inference backend. No network access required.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use sitesmith_common::{Job, JobCreateRequest, JobStatus, ScrapedSource};
use sitesmith_engine::{
    Connector, Inference, JobRunner, JobStore, Normalizer, Orchestrator, ScrapeStage,
    SiteGenerator, Source, UpdateHub,
};

// ---------------------------------------------------------------------------
// Scripted inference backend
// ---------------------------------------------------------------------------

/// Returns canned responses in order; `None` entries fail the call.
struct ScriptedInference {
    responses: Mutex<Vec<Option<String>>>,
    calls: AtomicUsize,
}

impl ScriptedInference {
    fn new(responses: Vec<Option<&str>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().rev().map(|r| r.map(String::from)).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Inference for ScriptedInference {
    async fn infer(&self, _system: &str, _user: &str, _max_tokens: u32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().unwrap().pop() {
            Some(Some(text)) => Ok(text),
            _ => Err(anyhow!("inference unavailable")),
        }
    }
}

// ---------------------------------------------------------------------------
// Mock connectors
// ---------------------------------------------------------------------------

struct FixedConnector {
    source: Source,
    record: ScrapedSource,
}

impl FixedConnector {
    fn ok(source: Source, data: serde_json::Value) -> Arc<dyn Connector> {
        Arc::new(Self {
            record: ScrapedSource::ok(source.as_str(), data),
            source,
        })
    }

    fn failed(source: Source, error: &str) -> Arc<dyn Connector> {
        Arc::new(Self {
            record: ScrapedSource::failed(source.as_str(), error),
            source,
        })
    }
}

#[async_trait]
impl Connector for FixedConnector {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self, _request: &JobCreateRequest) -> ScrapedSource {
        self.record.clone()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

const STRONG_EXTRACTION: &str = r#"{
  "business_name": "Acme Coffee",
  "tagline": "The best beans in town",
  "business_type": "restaurant",
  "data_quality_score": 85,
  "sources_used": ["google"],
  "missing_fields": []
}"#;

const SITE_HTML: &str = "<!DOCTYPE html><html><body>Acme Coffee</body></html>";

fn request() -> JobCreateRequest {
    JobCreateRequest {
        business_name: "Acme Coffee".to_string(),
        location: Some("SF".to_string()),
        website_url: None,
        facebook_url: None,
        instagram_url: None,
        client_email: None,
        template_preference: None,
    }
}

fn all_sources_ok() -> Vec<Arc<dyn Connector>> {
    vec![
        FixedConnector::ok(Source::Google, serde_json::json!({"name": "Acme Coffee"})),
        FixedConnector::ok(Source::Website, serde_json::json!({"markdown": "# Acme"})),
        FixedConnector::ok(Source::Facebook, serde_json::json!({"likes": 1200})),
        FixedConnector::ok(Source::Instagram, serde_json::json!({"bio": "coffee"})),
    ]
}

fn build_runner(
    connectors: Vec<Arc<dyn Connector>>,
    inference: Arc<ScriptedInference>,
) -> (Arc<JobRunner>, Arc<JobStore>, Arc<UpdateHub>) {
    let store = Arc::new(JobStore::new());
    let hub = Arc::new(UpdateHub::new());

    let orchestrator = Orchestrator::new(
        ScrapeStage::with_connectors(connectors),
        Normalizer::new(inference.clone()),
        SiteGenerator::new(inference, false),
    );

    let runner = Arc::new(JobRunner::new(store.clone(), hub.clone(), orchestrator, None));
    (runner, store, hub)
}

async fn seed_job(store: &JobStore, request: JobCreateRequest) -> Job {
    store
        .create(Job::new(uuid::Uuid::new_v4(), request))
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Pipeline happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pipeline_completes_with_all_results() {
    let inference = ScriptedInference::new(vec![Some(STRONG_EXTRACTION), Some(SITE_HTML)]);
    let (runner, store, _) = build_runner(all_sources_ok(), inference.clone());

    let job = seed_job(&store, request()).await;
    runner.process(job.id).await;

    let done = store.get(&job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert!(done.error.is_none());

    let scrape = done.scrape_result.as_ref().unwrap();
    assert_eq!(scrape.sources.len(), 4);
    assert_eq!(scrape.raw_data.len(), 4);

    let data = done.extracted_data.as_ref().unwrap();
    assert_eq!(data.business_name, "Acme Coffee");
    assert_eq!(data.data_quality_score, 85);

    let site = done.generated_site.as_ref().unwrap();
    assert_eq!(site.html, SITE_HTML);

    // Strong profile: extraction + generation only, no gap-fill call.
    assert_eq!(inference.call_count(), 2);
}

#[tokio::test]
async fn test_progress_stages_in_pipeline_order() {
    let inference = ScriptedInference::new(vec![Some(STRONG_EXTRACTION), Some(SITE_HTML)]);
    let (runner, store, _) = build_runner(all_sources_ok(), inference);

    let job = seed_job(&store, request()).await;
    runner.process(job.id).await;

    let done = store.get(&job.id).await.unwrap();
    let stages: Vec<&str> = done.progress.iter().map(|p| p.stage.as_str()).collect();
    assert_eq!(
        stages,
        vec![
            "scraping",
            "scraping",
            "scraping",
            "extracting",
            "extracting",
            "extracting",
            "generating",
            "generating",
            "generating",
            "completed",
            "completed",
        ]
    );

    // Percent never decreases within one stage.
    for pair in done.progress.windows(2) {
        if pair[0].stage == pair[1].stage {
            assert!(pair[1].progress_percent >= pair[0].progress_percent);
        }
    }
}

#[tokio::test]
async fn test_subscriber_observes_forward_only_statuses() {
    let inference = ScriptedInference::new(vec![Some(STRONG_EXTRACTION), Some(SITE_HTML)]);
    let (runner, store, hub) = build_runner(all_sources_ok(), inference);

    let job = seed_job(&store, request()).await;
    let (_, mut rx) = hub.subscribe(job.id).await;

    runner.process(job.id).await;

    let mut snapshots = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        snapshots.push(snapshot);
    }
    assert!(!snapshots.is_empty());
    assert_eq!(snapshots.last().unwrap().status, JobStatus::Completed);

    fn rank(status: JobStatus) -> u8 {
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
    for pair in snapshots.windows(2) {
        assert!(rank(pair[1].status) >= rank(pair[0].status));
    }
}

// ---------------------------------------------------------------------------
// Degraded paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_all_sources_failing_still_completes_with_minimal_profile() {
    // One source attempted and failing, three not provided; extraction
    // and gap-fill responses unusable. The pipeline must still finish.
    let connectors = vec![
        FixedConnector::failed(Source::Google, "Business not found on Google"),
        FixedConnector::failed(Source::Website, "Not provided"),
        FixedConnector::failed(Source::Facebook, "Not provided"),
        FixedConnector::failed(Source::Instagram, "Not provided"),
    ];
    let inference = ScriptedInference::new(vec![
        Some("no json at all"),
        Some("still no json"),
        Some(SITE_HTML),
    ]);
    let (runner, store, _) = build_runner(connectors, inference.clone());

    let job = seed_job(&store, request()).await;
    runner.process(job.id).await;

    let done = store.get(&job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);

    let scrape = done.scrape_result.as_ref().unwrap();
    assert!(scrape.raw_data.is_empty());
    let not_provided = scrape
        .sources
        .iter()
        .filter(|s| s.error.as_deref() == Some("Not provided"))
        .count();
    assert_eq!(not_provided, 3);

    let data = done.extracted_data.as_ref().unwrap();
    assert_eq!(data.business_name, "Acme Coffee");
    assert_eq!(data.data_quality_score, 0);
    assert_eq!(data.missing_fields, vec!["all".to_string()]);

    // Extraction, gap-fill attempt, generation.
    assert_eq!(inference.call_count(), 3);
}

#[tokio::test]
async fn test_weak_profile_triggers_gap_fill() {
    let weak = r#"{"business_name": "Acme Coffee", "data_quality_score": 40, "missing_fields": ["tagline"]}"#;
    let gap = r#"{"tagline": "Roasted daily"}"#;
    let inference = ScriptedInference::new(vec![Some(weak), Some(gap), Some(SITE_HTML)]);
    let (runner, store, _) = build_runner(all_sources_ok(), inference.clone());

    let job = seed_job(&store, request()).await;
    runner.process(job.id).await;

    let done = store.get(&job.id).await.unwrap();
    let data = done.extracted_data.as_ref().unwrap();
    assert_eq!(data.tagline.as_deref(), Some("Roasted daily"));
    assert_eq!(data.data_quality_score, 55);
    assert!(data.missing_fields.is_empty());
    assert_eq!(inference.call_count(), 3);
}

#[tokio::test]
async fn test_generation_failure_fails_job_with_message() {
    // Extraction succeeds, generation call errs.
    let inference = ScriptedInference::new(vec![Some(STRONG_EXTRACTION), None]);
    let (runner, store, hub) = build_runner(all_sources_ok(), inference);

    let job = seed_job(&store, request()).await;
    let (_, mut rx) = hub.subscribe(job.id).await;
    runner.process(job.id).await;

    let done = store.get(&job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Failed);
    assert!(done.error.is_some());
    assert!(done.generated_site.is_none());

    // Subscribers still get the terminal snapshot.
    let mut last = None;
    while let Ok(snapshot) = rx.try_recv() {
        last = Some(snapshot);
    }
    assert_eq!(last.unwrap().status, JobStatus::Failed);
}

// ---------------------------------------------------------------------------
// Deploy gating
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_deploy_rejected_without_generated_site() {
    let inference = ScriptedInference::new(vec![]);
    let (runner, store, _) = build_runner(all_sources_ok(), inference);

    let job = seed_job(&store, request()).await;
    let result = runner.deploy(job.id, None).await;
    assert!(matches!(
        result,
        Err(sitesmith_common::SitesmithError::SiteNotGenerated)
    ));
}

#[tokio::test]
async fn test_deploy_rejected_when_already_deployed() {
    let inference = ScriptedInference::new(vec![Some(STRONG_EXTRACTION), Some(SITE_HTML)]);
    let (runner, store, _) = build_runner(all_sources_ok(), inference);

    let job = seed_job(&store, request()).await;
    runner.process(job.id).await;

    let mut done = store.get(&job.id).await.unwrap();
    done.deployment = Some(sitesmith_common::DeploymentResult {
        deployment_id: "dpl_1".to_string(),
        url: "https://acme.vercel.app".to_string(),
        production_url: "https://acme.vercel.app".to_string(),
        status: "READY".to_string(),
        dns_records: None,
    });
    store.update(done).await;

    let result = runner.deploy(job.id, None).await;
    assert!(matches!(
        result,
        Err(sitesmith_common::SitesmithError::AlreadyDeployed)
    ));
}

#[tokio::test]
async fn test_deploy_unknown_job_rejected() {
    let inference = ScriptedInference::new(vec![]);
    let (runner, _, _) = build_runner(all_sources_ok(), inference);

    let result = runner.deploy(uuid::Uuid::new_v4(), None).await;
    assert!(matches!(
        result,
        Err(sitesmith_common::SitesmithError::JobNotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Job creation surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_job_validates_and_spawns() {
    let inference = ScriptedInference::new(vec![Some(STRONG_EXTRACTION), Some(SITE_HTML)]);
    let (runner, store, _) = build_runner(all_sources_ok(), inference);

    let mut bad = request();
    bad.business_name = String::new();
    assert!(runner.create_job(bad).await.is_err());

    let job = runner.create_job(request()).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    // Background task drives the job to a terminal state.
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let current = store.get(&job.id).await.unwrap();
        if matches!(current.status, JobStatus::Completed | JobStatus::Failed) {
            assert_eq!(current.status, JobStatus::Completed);
            break;
        }
        assert!(std::time::Instant::now() < deadline, "job never reached a terminal state");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
