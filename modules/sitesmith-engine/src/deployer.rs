use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use sitesmith_common::{DeploymentResult, DnsRecord};
use vercel_client::{DeploymentFile, VercelClient};

/// Deployment status poll cadence and bound.
const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLL_ATTEMPTS: u32 = 60;

/// Hosting provider slug length limit.
const SLUG_MAX_LEN: usize = 50;

/// Publishes a generated site to Vercel: ensure project, upload a small
/// fixed file set, submit the deployment, poll until ready, and
/// optionally register a custom domain (non-fatal on failure).
pub struct Deployer {
    client: VercelClient,
}

impl Deployer {
    pub fn new(token: &str, team_id: Option<&str>) -> Self {
        Self {
            client: VercelClient::new(token, team_id),
        }
    }

    pub async fn deploy(
        &self,
        html: &str,
        project_name: &str,
        custom_domain: Option<&str>,
    ) -> Result<DeploymentResult> {
        let slug = slugify(project_name);
        info!(project = %slug, "Starting deployment");

        let project_id = self
            .client
            .ensure_project(&slug)
            .await
            .context("Failed to create or resolve project")?;

        let files = build_files(html, &slug);

        let deployment = self
            .client
            .create_deployment(&slug, &project_id, &files)
            .await
            .context("Failed to submit deployment")?;

        let deployment = self
            .client
            .wait_for_ready(&deployment.id, POLL_INTERVAL, MAX_POLL_ATTEMPTS)
            .await
            .context("Deployment did not become ready")?;

        let dns_records = match custom_domain {
            Some(domain) => match self.client.add_domain(&project_id, domain).await {
                Ok(()) => Some(vec![
                    DnsRecord {
                        record_type: "A".to_string(),
                        name: "@".to_string(),
                        value: "76.76.21.21".to_string(),
                    },
                    DnsRecord {
                        record_type: "CNAME".to_string(),
                        name: "www".to_string(),
                        value: "cname.vercel-dns.com".to_string(),
                    },
                ]),
                Err(e) => {
                    // The site is live on the default domain regardless.
                    warn!(domain, error = %e, "Domain configuration failed");
                    None
                }
            },
            None => None,
        };

        info!(
            deployment_id = %deployment.id,
            url = deployment.url.as_deref().unwrap_or(""),
            "Deployment complete"
        );

        Ok(DeploymentResult {
            deployment_id: deployment.id,
            url: format!("https://{}", deployment.url.unwrap_or_default()),
            production_url: format!("https://{}.vercel.app", slug),
            status: deployment.ready_state.unwrap_or_else(|| "READY".to_string()),
            dns_records,
        })
    }
}

/// Derive a URL-safe project slug: lowercase, non-alphanumeric runs
/// collapsed to single dashes, trimmed, length-capped.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let collapsed = regex::Regex::new(r"[^a-z0-9]+")
        .expect("valid regex")
        .replace_all(&lowered, "-");
    let trimmed = collapsed.trim_matches('-');
    trimmed.chars().take(SLUG_MAX_LEN).collect()
}

/// The fixed deployment file set: the page itself, routing/security
/// config, a robots policy, and a single-URL sitemap.
pub(crate) fn build_files(html: &str, slug: &str) -> Vec<DeploymentFile> {
    let config = serde_json::json!({
        "version": 2,
        "routes": [
            { "handle": "filesystem" },
            { "src": "/(.*)", "dest": "/index.html" },
        ],
        "headers": [
            {
                "source": "/(.*)",
                "headers": [
                    { "key": "X-Content-Type-Options", "value": "nosniff" },
                    { "key": "X-Frame-Options", "value": "DENY" },
                ],
            },
        ],
    });

    let robots = format!(
        "User-agent: *\nAllow: /\nSitemap: https://{slug}.vercel.app/sitemap.xml"
    );

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://{slug}.vercel.app/</loc>
    <changefreq>weekly</changefreq>
    <priority>1.0</priority>
  </url>
</urlset>"#
    );

    vec![
        DeploymentFile::new("index.html", html.as_bytes()),
        DeploymentFile::new("vercel.json", config.to_string().as_bytes()),
        DeploymentFile::new("robots.txt", robots.as_bytes()),
        DeploymentFile::new("sitemap.xml", sitemap.as_bytes()),
    ]
}
