use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use ai_client::util::strip_code_fence;
use sitesmith_common::{BusinessType, ExtractedBusinessData, GeneratedSite};

use crate::traits::{Inference, ProgressSink};

const GENERATION_MAX_TOKENS: u32 = 8192;

const GENERATION_SYSTEM_PROMPT: &str = r#"You are an expert web designer creating beautiful, modern websites.

Design principles:
1. Clean, professional aesthetic with plenty of whitespace
2. Modern color schemes appropriate to the business type
3. Mobile-first responsive design using Tailwind CSS
4. Clear visual hierarchy and typography
5. Subtle animations for engagement
6. Fast-loading (use Tailwind CDN, minimal JS)

Include:
- Sticky navigation with smooth scroll
- Hero section with gradient/image background
- Services/features in card grid
- About section with key info
- Testimonials (if available)
- Contact section with all details
- Footer with links and copyright

Return ONLY the complete HTML document, no explanations."#;

const PREMIUM_SYSTEM_PROMPT: &str = r#"You are an expert web designer creating beautiful, modern websites using 21st.dev premium components.

Your designs should be:
1. Visually stunning with modern aesthetics
2. Mobile-responsive using Tailwind CSS
3. Professional and polished
4. Fast-loading with minimal JavaScript
5. Accessible and SEO-friendly

Use the 21st.dev component library for premium UI elements like:
- Hero sections with gradient backgrounds
- Modern card layouts
- Animated statistics counters
- Testimonial carousels
- Contact forms with validation

Return complete, valid HTML that works standalone with Tailwind CSS CDN."#;

/// Color palette keyed by business type: (primary, secondary, accent).
fn color_scheme(business_type: BusinessType) -> (&'static str, &'static str, &'static str) {
    match business_type {
        BusinessType::Restaurant => ("#dc2626", "#991b1b", "#fbbf24"),
        BusinessType::Trades => ("#2563eb", "#1e40af", "#f97316"),
        BusinessType::Professional => ("#1e3a5a", "#0f172a", "#d4af37"),
        BusinessType::Health => ("#0d9488", "#065f46", "#6ee7b7"),
        BusinessType::Creative => ("#7c3aed", "#5b21b6", "#f472b6"),
        BusinessType::Retail => ("#059669", "#047857", "#fbbf24"),
        BusinessType::General => ("#3b82f6", "#1d4ed8", "#f59e0b"),
    }
}

/// Renders a canonical business profile into one self-contained HTML
/// document via the AI backend. A premium component backend, when
/// configured, is attempted first with a transparent fallback.
pub struct SiteGenerator {
    inference: Arc<dyn Inference>,
    premium_enabled: bool,
}

impl SiteGenerator {
    pub fn new(inference: Arc<dyn Inference>, premium_enabled: bool) -> Self {
        Self {
            inference,
            premium_enabled,
        }
    }

    pub async fn generate(
        &self,
        data: &ExtractedBusinessData,
        progress: &dyn ProgressSink,
    ) -> Result<GeneratedSite> {
        let started = Instant::now();

        progress
            .report("generating", "Generating website design...", 65)
            .await;

        let sections = determine_sections(data);

        let html = if self.premium_enabled {
            match self.generate_premium(data, &sections).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(error = %e, "Premium generation failed, falling back to standard template");
                    self.generate_standard(data, &sections).await?
                }
            }
        } else {
            self.generate_standard(data, &sections).await?
        };

        progress.report("generating", "Website generated!", 90).await;

        let generation_time_ms = started.elapsed().as_millis() as u64;
        info!(
            sections = ?sections,
            time_ms = generation_time_ms,
            "Site generation complete"
        );

        Ok(GeneratedSite {
            html,
            css: None,
            js: None,
            assets: Vec::new(),
            template_used: if self.premium_enabled {
                "21st_dev".to_string()
            } else {
                "tailwind_modern".to_string()
            },
            sections_included: sections,
            generation_time_ms,
        })
    }

    async fn generate_premium(
        &self,
        data: &ExtractedBusinessData,
        sections: &[String],
    ) -> Result<String> {
        let prompt = build_premium_prompt(data, sections);
        let html = self
            .inference
            .infer(PREMIUM_SYSTEM_PROMPT, &prompt, GENERATION_MAX_TOKENS)
            .await
            .context("Premium generation call failed")?;
        Ok(strip_code_fence(&html).to_string())
    }

    async fn generate_standard(
        &self,
        data: &ExtractedBusinessData,
        sections: &[String],
    ) -> Result<String> {
        let prompt = build_generation_prompt(data, sections);
        let html = self
            .inference
            .infer(GENERATION_SYSTEM_PROMPT, &prompt, GENERATION_MAX_TOKENS)
            .await
            .context("Site generation call failed")?;
        Ok(strip_code_fence(&html).to_string())
    }
}

/// Base section list with conditional insertions driven by data
/// availability: testimonials slot in before contact, features right
/// after the hero.
pub(crate) fn determine_sections(data: &ExtractedBusinessData) -> Vec<String> {
    let mut sections: Vec<String> = ["navigation", "hero", "services", "about", "contact", "footer"]
        .into_iter()
        .map(String::from)
        .collect();

    if !data.testimonials.is_empty() {
        sections.insert(4, "testimonials".to_string());
    }

    if !data.unique_selling_points.is_empty() {
        sections.insert(2, "features".to_string());
    }

    sections
}

// --- Prompt assembly ---

fn build_premium_prompt(data: &ExtractedBusinessData, sections: &[String]) -> String {
    let profile = serde_json::to_string_pretty(data).unwrap_or_default();
    format!(
        r#"Create a stunning, modern website for this business:

BUSINESS DATA:
{profile}

SECTIONS TO INCLUDE: {sections:?}

DESIGN REQUIREMENTS:
- Use a color scheme appropriate for a {} business
- Create visual hierarchy with the business name and tagline prominent
- Services should be in an attractive card grid
- Include social proof (rating, review count) if available
- Make the contact section easy to find and use
- Add subtle micro-interactions and hover effects

Generate a complete, beautiful HTML page using Tailwind CSS CDN.
The result should look like a premium $5000+ website."#,
        data.business_type
    )
}

fn build_generation_prompt(data: &ExtractedBusinessData, sections: &[String]) -> String {
    let (primary, secondary, accent) = color_scheme(data.business_type);

    format!(
        r#"Create a complete, beautiful HTML website for this business:

BUSINESS: {name}
TYPE: {business_type}
TAGLINE: {tagline}
SHORT DESC: {description_short}
LONG DESC: {description_long}

SERVICES:
{services}

UNIQUE SELLING POINTS:
{usps}

TESTIMONIALS:
{testimonials}

CONTACT:
{contact}

HOURS:
{hours}

SOCIAL:
{social}

RATING: {rating} ({review_count} reviews)

COLOR SCHEME: primary {primary}, secondary {secondary}, accent {accent}

SECTIONS TO INCLUDE: {sections:?}

Generate a complete HTML document with:
1. DOCTYPE and proper head with meta tags
2. Tailwind CSS via CDN
3. Custom color configuration
4. All sections with real content (no placeholders)
5. Responsive design
6. Modern, professional styling

Return ONLY the HTML, no markdown formatting or explanations."#,
        name = data.business_name,
        business_type = data.business_type,
        tagline = data
            .tagline
            .clone()
            .unwrap_or_else(|| format!("Welcome to {}", data.business_name)),
        description_short = data.description_short.as_deref().unwrap_or(""),
        description_long = data.description_long.as_deref().unwrap_or(""),
        services = services_text(data),
        usps = usps_text(data),
        testimonials = testimonials_text(data),
        contact = contact_text(data),
        hours = hours_text(data),
        social = social_text(data),
        rating = data
            .rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        review_count = data.review_count.unwrap_or(0),
    )
}

fn services_text(data: &ExtractedBusinessData) -> String {
    if data.services.is_empty() {
        return "No services specified".to_string();
    }
    data.services
        .iter()
        .map(|s| format!("- {}: {}", s.name, s.description.as_deref().unwrap_or("N/A")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn usps_text(data: &ExtractedBusinessData) -> String {
    if data.unique_selling_points.is_empty() {
        return "No USPs specified".to_string();
    }
    data.unique_selling_points
        .iter()
        .map(|usp| format!("- {usp}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn testimonials_text(data: &ExtractedBusinessData) -> String {
    if data.testimonials.is_empty() {
        return "No testimonials available".to_string();
    }
    data.testimonials
        .iter()
        .map(|t| {
            format!(
                "- \"{}\" - {} ({}/5 on {})",
                t.quote,
                t.author,
                t.rating.map(|r| r.to_string()).unwrap_or_else(|| "?".to_string()),
                t.source.as_deref().unwrap_or("unknown")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn contact_text(data: &ExtractedBusinessData) -> String {
    let mut lines = Vec::new();
    if let Some(ref phone) = data.contact.phone {
        lines.push(format!("Phone: {phone}"));
    }
    if let Some(ref email) = data.contact.email {
        lines.push(format!("Email: {email}"));
    }
    if let Some(ref address) = data.contact.address {
        lines.push(format!("Address: {address}"));
    }
    if lines.is_empty() {
        "No contact info".to_string()
    } else {
        lines.join("\n")
    }
}

fn hours_text(data: &ExtractedBusinessData) -> String {
    let Some(ref hours) = data.hours else {
        return "Hours not specified".to_string();
    };
    let days = [
        ("monday", &hours.monday),
        ("tuesday", &hours.tuesday),
        ("wednesday", &hours.wednesday),
        ("thursday", &hours.thursday),
        ("friday", &hours.friday),
        ("saturday", &hours.saturday),
        ("sunday", &hours.sunday),
    ];
    let lines: Vec<String> = days
        .iter()
        .filter_map(|(day, value)| value.as_ref().map(|v| format!("{day}: {v}")))
        .collect();
    if lines.is_empty() {
        "Hours not specified".to_string()
    } else {
        lines.join("\n")
    }
}

fn social_text(data: &ExtractedBusinessData) -> String {
    let links = [
        ("facebook", &data.social_media.facebook),
        ("instagram", &data.social_media.instagram),
        ("twitter", &data.social_media.twitter),
        ("linkedin", &data.social_media.linkedin),
        ("youtube", &data.social_media.youtube),
    ];
    let lines: Vec<String> = links
        .iter()
        .filter_map(|(platform, value)| value.as_ref().map(|v| format!("{platform}: {v}")))
        .collect();
    if lines.is_empty() {
        "No social media".to_string()
    } else {
        lines.join("\n")
    }
}
