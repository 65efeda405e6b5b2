use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use sitesmith_common::{
    DeployRequest, ErrorResponse, HealthResponse, JobCreateRequest, JobListResponse, JobResponse,
    JobStatus, SitesmithError,
};

use crate::AppState;

// --- Query structs ---

#[derive(Deserialize)]
pub struct ListJobsQuery {
    page: Option<usize>,
    page_size: Option<usize>,
    status: Option<String>,
}

// --- Helpers ---

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
            detail: None,
            code: Some(status.as_u16().to_string()),
        }),
    )
        .into_response()
}

// --- Handlers ---

/// Reports whether each required external credential is configured.
/// Does not probe remote reachability.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = &state.config;
    let services = BTreeMap::from([
        ("anthropic".to_string(), config.anthropic_api_key.is_some()),
        ("firecrawl".to_string(), config.firecrawl_api_key.is_some()),
        ("apify".to_string(), config.apify_api_token.is_some()),
        ("vercel".to_string(), config.vercel_token.is_some()),
    ]);

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: config.app_version.clone(),
        environment: config.environment.clone(),
        services,
    })
}

/// Create a job and start the pipeline in the background. Returns the
/// pending job immediately; completion is observed via polling or the
/// WebSocket subscription.
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JobCreateRequest>,
) -> impl IntoResponse {
    match state.runner.create_job(request).await {
        Ok(job) => Json(JobResponse::with_message(job, "Job created successfully")).into_response(),
        Err(SitesmithError::Validation(message)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, &message)
        }
        Err(e) => {
            warn!(error = %e, "Failed to create job");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create job")
        }
    }
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(job_id) = Uuid::parse_str(&id) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid job id");
    };

    match state.store.get(&job_id).await {
        Some(job) => Json(JobResponse::new(job)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Job not found"),
    }
}

pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListJobsQuery>,
) -> impl IntoResponse {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);

    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => match JobStatus::parse(raw) {
            Some(status) => Some(status),
            None => return error_response(StatusCode::BAD_REQUEST, "Unknown status filter"),
        },
    };

    let jobs = state.store.list(page, page_size, status).await;
    let total = state.store.count(status).await;

    Json(JobListResponse {
        jobs,
        total,
        page,
        page_size,
    })
    .into_response()
}

/// The generated HTML, rendered directly. Rejected until the site exists.
pub async fn get_job_preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(job_id) = Uuid::parse_str(&id) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid job id");
    };

    let Some(job) = state.store.get(&job_id).await else {
        return error_response(StatusCode::NOT_FOUND, "Job not found");
    };

    match job.generated_site {
        Some(site) => Html(site.html).into_response(),
        None => error_response(StatusCode::BAD_REQUEST, "Website not yet generated"),
    }
}

/// Deploy the generated website. Gated on the site existing and no
/// prior deployment; a remote failure surfaces as a 500 with the reason
/// and leaves the job in the failed state.
pub async fn deploy_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<DeployRequest>,
) -> impl IntoResponse {
    let Ok(job_id) = Uuid::parse_str(&id) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid job id");
    };

    match state
        .runner
        .deploy(job_id, request.custom_domain.as_deref())
        .await
    {
        Ok(job) => Json(JobResponse::with_message(job, "Deployed successfully")).into_response(),
        Err(SitesmithError::JobNotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "Job not found")
        }
        Err(SitesmithError::SiteNotGenerated) => {
            error_response(StatusCode::BAD_REQUEST, "Website not yet generated")
        }
        Err(SitesmithError::AlreadyDeployed) => {
            error_response(StatusCode::BAD_REQUEST, "Already deployed")
        }
        Err(e) => {
            warn!(%job_id, error = %e, "Deployment failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}
