pub mod error;
pub mod types;

pub use error::{Result, VercelError};
pub use types::{Deployment, DeploymentFile, Project, ReadyState};

use std::time::Duration;

const BASE_URL: &str = "https://api.vercel.com";

pub struct VercelClient {
    client: reqwest::Client,
    token: String,
    team_id: Option<String>,
}

impl VercelClient {
    pub fn new(token: &str, team_id: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            token: token.to_string(),
            team_id: team_id.map(String::from),
        }
    }

    /// Create the project if it does not exist and return its id.
    /// An already-existing project is fetched instead; if that lookup
    /// fails too, the slug itself is used as the identifier.
    pub async fn ensure_project(&self, slug: &str) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/v9/projects", BASE_URL))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "name": slug, "framework": null }))
            .send()
            .await?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await?;

        if status.is_success() {
            if let Some(id) = body.get("id").and_then(|v| v.as_str()) {
                tracing::info!(project_id = id, "Project created");
                return Ok(id.to_string());
            }
        }

        let error_code = body
            .pointer("/error/code")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        if error_code == "project_already_exists" {
            let get_resp = self
                .client
                .get(format!("{}/v9/projects/{}", BASE_URL, slug))
                .bearer_auth(&self.token)
                .send()
                .await?;
            if get_resp.status().is_success() {
                let project: Project = get_resp.json().await?;
                tracing::info!(project_id = %project.id, "Using existing project");
                return Ok(project.id);
            }
        }

        tracing::warn!(slug, "Could not resolve project id, using slug");
        Ok(slug.to_string())
    }

    /// Submit a production deployment with inline files.
    pub async fn create_deployment(
        &self,
        slug: &str,
        project_id: &str,
        files: &[DeploymentFile],
    ) -> Result<Deployment> {
        let mut payload = serde_json::json!({
            "name": slug,
            "project": project_id,
            "target": "production",
            "files": files,
            "projectSettings": { "framework": null },
        });
        if let Some(ref team_id) = self.team_id {
            payload["teamId"] = serde_json::json!(team_id);
        }

        let resp = self
            .client
            .post(format!("{}/v13/deployments", BASE_URL))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(VercelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// Fetch the current state of a deployment.
    pub async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment> {
        let resp = self
            .client
            .get(format!("{}/v13/deployments/{}", BASE_URL, deployment_id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(VercelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// Poll a deployment on a fixed interval until it is ready.
    /// Fails fast on an error state and times out after `max_attempts`.
    pub async fn wait_for_ready(
        &self,
        deployment_id: &str,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<Deployment> {
        poll_until_ready(|| self.get_deployment(deployment_id), interval, max_attempts).await
    }

    /// Register a custom domain on a project.
    pub async fn add_domain(&self, project_id: &str, domain: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/v10/projects/{}/domains", BASE_URL, project_id))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "name": domain }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(VercelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(domain, project_id, "Custom domain registered");
        Ok(())
    }
}

/// Drive a status poll to completion: succeed on the ready state, fail
/// fast on an error state, and give up with a timeout error once
/// `max_attempts` polls returned an in-flight state.
async fn poll_until_ready<F, Fut>(
    mut poll: F,
    interval: Duration,
    max_attempts: u32,
) -> Result<Deployment>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Deployment>>,
{
    for _ in 0..max_attempts {
        let deployment = poll().await?;

        match deployment.state() {
            ReadyState::Ready => return Ok(deployment),
            ReadyState::Error => {
                return Err(VercelError::DeployFailed(
                    deployment
                        .error_message
                        .unwrap_or_else(|| "Unknown error".to_string()),
                ));
            }
            ReadyState::InProgress => {
                tracing::debug!(
                    deployment_id = %deployment.id,
                    state = deployment.ready_state.as_deref().unwrap_or(""),
                    "Deployment still in progress"
                );
                tokio::time::sleep(interval).await;
            }
        }
    }

    Err(VercelError::Timeout(max_attempts))
}
