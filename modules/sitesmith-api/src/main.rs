use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use sitesmith_common::Config;
use sitesmith_engine::{
    Deployer, JobRunner, JobStore, Normalizer, Orchestrator, ScrapeStage, SiteGenerator, UpdateHub,
};

mod rest;
mod ws;

const CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";

pub struct AppState {
    pub store: Arc<JobStore>,
    pub hub: Arc<UpdateHub>,
    pub runner: Arc<JobRunner>,
    pub config: Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sitesmith=info".parse()?))
        .init();

    let config = Config::from_env();
    info!(version = %config.app_version, "Starting sitesmith API");

    let store = Arc::new(JobStore::new());
    let hub = Arc::new(UpdateHub::new());

    let claude = Arc::new(Claude::new(
        config.anthropic_api_key.clone().unwrap_or_default(),
        CLAUDE_MODEL,
    ));

    let orchestrator = Orchestrator::new(
        ScrapeStage::from_config(&config),
        Normalizer::new(claude.clone()),
        SiteGenerator::new(claude, config.twentyfirst_api_key.is_some()),
    );

    let deployer = config
        .vercel_token
        .as_deref()
        .map(|token| Deployer::new(token, config.vercel_team_id.as_deref()));

    let runner = Arc::new(JobRunner::new(
        store.clone(),
        hub.clone(),
        orchestrator,
        deployer,
    ));

    let state = Arc::new(AppState {
        store,
        hub,
        runner,
        config: config.clone(),
    });

    let app = Router::new()
        // Health check
        .route("/api/health", get(rest::health))
        // Jobs
        .route("/api/jobs", post(rest::create_job).get(rest::list_jobs))
        .route("/api/jobs/{id}", get(rest::get_job))
        .route("/api/jobs/{id}/preview", get(rest::get_job_preview))
        .route("/api/jobs/{id}/deploy", post(rest::deploy_job))
        // Live job updates
        .route("/ws/jobs/{id}", get(ws::ws_job_updates))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("sitesmith API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
