use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Scraping,
    Extracting,
    Generating,
    Deploying,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Scraping => "scraping",
            JobStatus::Extracting => "extracting",
            JobStatus::Generating => "generating",
            JobStatus::Deploying => "deploying",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(JobStatus::Pending),
            "scraping" => Some(JobStatus::Scraping),
            "extracting" => Some(JobStatus::Extracting),
            "generating" => Some(JobStatus::Generating),
            "deploying" => Some(JobStatus::Deploying),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Restaurant,
    Trades,
    Professional,
    Retail,
    Creative,
    Health,
    #[default]
    General,
}

impl BusinessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessType::Restaurant => "restaurant",
            BusinessType::Trades => "trades",
            BusinessType::Professional => "professional",
            BusinessType::Retail => "retail",
            BusinessType::Creative => "creative",
            BusinessType::Health => "health",
            BusinessType::General => "general",
        }
    }

    /// Parse a model-supplied type string; anything unmapped is General.
    pub fn parse_lossy(raw: &str) -> Self {
        match raw {
            "restaurant" => BusinessType::Restaurant,
            "trades" => BusinessType::Trades,
            "professional" => BusinessType::Professional,
            "retail" => BusinessType::Retail,
            "creative" => BusinessType::Creative,
            "health" => BusinessType::Health,
            _ => BusinessType::General,
        }
    }
}

impl std::fmt::Display for BusinessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Requests ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreateRequest {
    pub business_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub facebook_url: Option<String>,
    /// Instagram handle or profile URL — `@acme`, `acme`, or
    /// `https://instagram.com/acme` are all accepted.
    #[serde(default)]
    pub instagram_url: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub template_preference: Option<String>,
}

impl JobCreateRequest {
    /// Per-field validation; there is no cross-field validation.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.business_name.trim();
        if name.is_empty() {
            return Err("business_name must not be empty".to_string());
        }
        if name.len() > 200 {
            return Err("business_name must be at most 200 characters".to_string());
        }
        if let Some(ref location) = self.location {
            if location.len() > 200 {
                return Err("location must be at most 200 characters".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployRequest {
    #[serde(default)]
    pub custom_domain: Option<String>,
}

// --- Business Profile ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialMedia {
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub youtube: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub quote: String,
    pub author: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessHours {
    #[serde(default)]
    pub monday: Option<String>,
    #[serde(default)]
    pub tuesday: Option<String>,
    #[serde(default)]
    pub wednesday: Option<String>,
    #[serde(default)]
    pub thursday: Option<String>,
    #[serde(default)]
    pub friday: Option<String>,
    #[serde(default)]
    pub saturday: Option<String>,
    #[serde(default)]
    pub sunday: Option<String>,
}

/// Normalized business data merged from all scraped sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedBusinessData {
    pub business_name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description_short: Option<String>,
    #[serde(default)]
    pub description_long: Option<String>,
    #[serde(default)]
    pub business_type: BusinessType,
    #[serde(default)]
    pub year_established: Option<String>,

    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub unique_selling_points: Vec<String>,

    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub social_media: SocialMedia,
    #[serde(default)]
    pub hours: Option<BusinessHours>,

    #[serde(default)]
    pub testimonials: Vec<Testimonial>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,

    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub logo_url: Option<String>,

    // Quality tracking
    #[serde(default)]
    pub data_quality_score: u8,
    #[serde(default)]
    pub sources_used: Vec<String>,
    #[serde(default)]
    pub missing_fields: Vec<String>,
}

impl ExtractedBusinessData {
    /// Minimal profile used when extraction cannot produce anything better.
    pub fn minimal(business_name: &str) -> Self {
        Self {
            business_name: business_name.to_string(),
            tagline: None,
            description_short: None,
            description_long: None,
            business_type: BusinessType::General,
            year_established: None,
            services: Vec::new(),
            unique_selling_points: Vec::new(),
            contact: ContactInfo::default(),
            social_media: SocialMedia::default(),
            hours: None,
            testimonials: Vec::new(),
            rating: None,
            review_count: None,
            images: Vec::new(),
            logo_url: None,
            data_quality_score: 0,
            sources_used: Vec::new(),
            missing_fields: vec!["all".to_string()],
        }
    }

    /// Whether a named profile field currently holds a value. Returns
    /// `None` for field names outside the schema, so callers can treat
    /// unknown names as a no-op.
    pub fn field_is_populated(&self, name: &str) -> Option<bool> {
        let populated = match name {
            "business_name" => !self.business_name.is_empty(),
            "tagline" => self.tagline.as_deref().is_some_and(|v| !v.is_empty()),
            "description_short" => self
                .description_short
                .as_deref()
                .is_some_and(|v| !v.is_empty()),
            "description_long" => self
                .description_long
                .as_deref()
                .is_some_and(|v| !v.is_empty()),
            "year_established" => self
                .year_established
                .as_deref()
                .is_some_and(|v| !v.is_empty()),
            "services" => !self.services.is_empty(),
            "unique_selling_points" => !self.unique_selling_points.is_empty(),
            "contact" => self.contact != ContactInfo::default(),
            "phone" => self.contact.phone.as_deref().is_some_and(|v| !v.is_empty()),
            "email" => self.contact.email.as_deref().is_some_and(|v| !v.is_empty()),
            "address" => self
                .contact
                .address
                .as_deref()
                .is_some_and(|v| !v.is_empty()),
            "website" => self
                .contact
                .website
                .as_deref()
                .is_some_and(|v| !v.is_empty()),
            "social_media" => self.social_media != SocialMedia::default(),
            "hours" => self.hours.as_ref().is_some_and(|h| *h != BusinessHours::default()),
            "testimonials" => !self.testimonials.is_empty(),
            "rating" => self.rating.is_some(),
            "review_count" => self.review_count.is_some(),
            "images" => !self.images.is_empty(),
            "logo_url" => self.logo_url.as_deref().is_some_and(|v| !v.is_empty()),
            _ => return None,
        };
        Some(populated)
    }
}

// --- Scraping ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedSource {
    /// Source tag: "google", "website", "facebook", or "instagram".
    pub source: String,
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScrapedSource {
    pub fn ok(source: &str, data: serde_json::Value) -> Self {
        Self {
            source: source.to_string(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(source: &str, error: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// One record per configured source, in the canonical source order.
    pub sources: Vec<ScrapedSource>,
    /// Payloads of sources that succeeded with non-empty data.
    pub raw_data: serde_json::Map<String, serde_json::Value>,
}

// --- Generation ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSite {
    /// Self-contained HTML document, deployable as-is.
    pub html: String,
    #[serde(default)]
    pub css: Option<String>,
    #[serde(default)]
    pub js: Option<String>,
    #[serde(default)]
    pub assets: Vec<String>,

    // Metadata
    pub template_used: String,
    pub sections_included: Vec<String>,
    pub generation_time_ms: u64,
}

// --- Deployment ---

/// A DNS record the caller must configure for a custom domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub deployment_id: String,
    pub url: String,
    pub production_url: String,
    pub status: String,
    #[serde(default)]
    pub dns_records: Option<Vec<DnsRecord>>,
}

// --- Jobs ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub stage: String,
    pub message: String,
    pub progress_percent: u8,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Input
    pub request: JobCreateRequest,

    // Progress
    #[serde(default)]
    pub progress: Vec<JobProgress>,
    #[serde(default)]
    pub current_stage: Option<String>,

    // Results, populated stage by stage
    #[serde(default)]
    pub scrape_result: Option<ScrapeResult>,
    #[serde(default)]
    pub extracted_data: Option<ExtractedBusinessData>,
    #[serde(default)]
    pub generated_site: Option<GeneratedSite>,
    #[serde(default)]
    pub deployment: Option<DeploymentResult>,

    // Error handling
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_details: Option<serde_json::Value>,
}

impl Job {
    pub fn new(id: Uuid, request: JobCreateRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            request,
            progress: Vec::new(),
            current_stage: None,
            scrape_result: None,
            extracted_data: None,
            generated_site: None,
            deployment: None,
            error: None,
            error_details: None,
        }
    }
}

// --- API Responses ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub job: Job,
    pub message: String,
}

impl JobResponse {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            message: "Success".to_string(),
        }
    }

    pub fn with_message(job: Job, message: impl Into<String>) -> Self {
        Self {
            job,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    /// Credential presence per required external service.
    pub services: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
