use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use ai_client::util::{strip_code_fence, truncate_to_char_boundary};
use sitesmith_common::{
    BusinessHours, BusinessType, ContactInfo, ExtractedBusinessData, ScrapeResult, Service,
    SocialMedia, Testimonial,
};

use crate::traits::{Inference, ProgressSink};

/// Per-source payload cap when embedding scraped data in the prompt.
const SOURCE_PAYLOAD_CAP: usize = 8000;

/// Gap-fill runs when the quality score is below this or fields are missing.
pub const GAP_FILL_THRESHOLD: u8 = 70;

/// Quality bonus applied after a successful gap-fill merge.
const GAP_FILL_BONUS: u8 = 15;

const EXTRACT_MAX_TOKENS: u32 = 4096;
const GAP_FILL_MAX_TOKENS: u32 = 2048;

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a business data extraction specialist. Your task is to analyze scraped data from multiple sources and extract normalized, structured business information.

Key responsibilities:
1. Extract factual information accurately (names, addresses, phone numbers)
2. Identify the business type from context
3. Consolidate reviews and testimonials
4. Note which data sources were used
5. Calculate a data quality score (0-100) based on completeness
6. List any missing critical fields

NEVER invent factual data like phone numbers, addresses, or specific claims.
You CAN enhance descriptions, create taglines, and generate USPs based on available information.

Always return valid JSON matching the requested schema."#;

const GAP_FILL_SYSTEM_PROMPT: &str = r#"You are a professional copywriter for small business websites. Your task is to generate realistic content to fill gaps in business data.

Rules:
1. NEVER invent factual claims not supported by existing data
2. For services, expand with typical services for the business type
3. Keep tone professional but friendly
4. Generate content that sounds authentic and natural
5. If business is a "plumber", you can list typical plumbing services
6. USPs should be based on context clues from the data

Return only the fields that need to be generated, as valid JSON."#;

/// Turns heterogeneous raw source payloads into one canonical business
/// profile, with a best-effort second pass that fills weak fields.
pub struct Normalizer {
    inference: Arc<dyn Inference>,
}

impl Normalizer {
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self { inference }
    }

    /// Extract and normalize business data from the scraped sources.
    /// Never errs: an unusable model response degrades to the minimal
    /// profile instead of failing the stage.
    pub async fn extract(
        &self,
        scrape: &ScrapeResult,
        business_name: &str,
        progress: &dyn ProgressSink,
    ) -> ExtractedBusinessData {
        progress
            .report("extracting", "Analyzing scraped data with AI...", 40)
            .await;

        let prompt = build_extraction_prompt(scrape, business_name);

        let response = match self
            .inference
            .infer(EXTRACTION_SYSTEM_PROMPT, &prompt, EXTRACT_MAX_TOKENS)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Extraction call failed, using minimal profile");
                return ExtractedBusinessData::minimal(business_name);
            }
        };

        let Some(extracted) = parse_json_response(&response) else {
            warn!("Extraction response unparseable, using minimal profile");
            return ExtractedBusinessData::minimal(business_name);
        };

        progress
            .report("extracting", "Data extracted successfully", 50)
            .await;

        profile_from_value(&extracted, scrape)
    }

    /// Fill gaps in a weak profile with AI-authored narrative content.
    /// No-op once the profile is strong; never errs — on any failure the
    /// input is returned unchanged.
    pub async fn fill_gaps(
        &self,
        data: ExtractedBusinessData,
        progress: &dyn ProgressSink,
    ) -> ExtractedBusinessData {
        if data.data_quality_score >= GAP_FILL_THRESHOLD && data.missing_fields.is_empty() {
            return data;
        }

        progress
            .report("extracting", "Filling data gaps with AI...", 55)
            .await;

        let prompt = build_gap_fill_prompt(&data);

        match self
            .inference
            .infer(GAP_FILL_SYSTEM_PROMPT, &prompt, GAP_FILL_MAX_TOKENS)
            .await
        {
            Ok(text) => match parse_json_response(&text) {
                Some(gap) => {
                    let merged = merge_gap_data(data, &gap);
                    info!(
                        quality_score = merged.data_quality_score,
                        "Gap filling complete"
                    );
                    progress.report("extracting", "Data gaps filled", 60).await;
                    merged
                }
                None => {
                    warn!("Gap-fill response unparseable, keeping original data");
                    data
                }
            },
            Err(e) => {
                warn!(error = %e, "Gap filling failed, keeping original data");
                data
            }
        }
    }
}

// --- Prompt assembly ---

fn build_extraction_prompt(scrape: &ScrapeResult, business_name: &str) -> String {
    let mut sources_text = String::new();
    for (source, data) in &scrape.raw_data {
        let pretty = serde_json::to_string_pretty(data).unwrap_or_default();
        sources_text.push_str(&format!(
            "\n\n=== {} DATA ===\n{}",
            source.to_uppercase(),
            truncate_to_char_boundary(&pretty, SOURCE_PAYLOAD_CAP)
        ));
    }

    format!(
        r#"Extract and normalize business information for "{business_name}".

SCRAPED DATA FROM MULTIPLE SOURCES:
{sources_text}

Return a JSON object with this exact structure:
{{
  "business_name": "Official business name",
  "tagline": "Short catchy tagline",
  "description_short": "1-2 sentence description",
  "description_long": "2-3 paragraph detailed description",
  "business_type": "restaurant|trades|professional|retail|creative|health|general",
  "year_established": "Year or null",
  "services": [
    {{"name": "Service name", "description": "Description", "icon": "emoji"}}
  ],
  "unique_selling_points": ["USP 1", "USP 2", "USP 3"],
  "contact": {{
    "phone": "Phone number",
    "email": "Email address",
    "address": "Full address",
    "website": "Website URL"
  }},
  "social_media": {{
    "facebook": "Facebook URL",
    "instagram": "Instagram URL",
    "twitter": "Twitter URL",
    "linkedin": "LinkedIn URL"
  }},
  "hours": {{
    "monday": "9am - 5pm",
    "tuesday": "9am - 5pm"
  }},
  "testimonials": [
    {{"quote": "Review text", "author": "Name", "rating": 5, "source": "Google"}}
  ],
  "rating": 4.5,
  "review_count": 47,
  "data_quality_score": 75,
  "sources_used": ["google", "website"],
  "missing_fields": ["email", "hours"]
}}

IMPORTANT:
- Only include data that is actually found in the sources
- Do not invent factual claims (phone numbers, addresses, etc.)
- You CAN enhance descriptions and create taglines based on available info
- Mark missing fields in the missing_fields array
- Return ONLY valid JSON, no explanation"#
    )
}

fn build_gap_fill_prompt(data: &ExtractedBusinessData) -> String {
    let current = serde_json::to_string_pretty(data).unwrap_or_default();
    format!(
        "Business: {}\nType: {}\nCurrent data: {}\n\nMissing or weak fields: {:?}\n\n\
         Generate content for the missing/weak fields only.\n\
         Return a JSON object with just those fields filled in.",
        data.business_name, data.business_type, current, data.missing_fields
    )
}

// --- Response parsing ---

/// Parse a model response into a JSON object, tolerating a fenced code
/// block and salvaging trailing prose or truncation by trimming to the
/// last closing brace. Returns `None` when nothing usable remains.
pub(crate) fn parse_json_response(content: &str) -> Option<Value> {
    let cleaned = strip_code_fence(content);

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return value.is_object().then_some(value);
    }

    warn!(
        head = truncate_to_char_boundary(cleaned, 500),
        "JSON parse error, attempting salvage"
    );

    let last_brace = cleaned.rfind('}')?;
    let salvaged = &cleaned[..=last_brace];
    match serde_json::from_str::<Value>(salvaged) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

// --- Defensive field mapping ---

fn get_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn get_string_array(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Services may arrive as objects or bare name strings.
pub(crate) fn parse_services(value: Option<&Value>) -> Vec<Service> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => Some(Service {
                name: get_string(item, "name").unwrap_or_else(|| "Service".to_string()),
                description: get_string(item, "description"),
                price: get_string(item, "price"),
                icon: get_string(item, "icon"),
            }),
            Value::String(name) if !name.is_empty() => Some(Service {
                name: name.clone(),
                description: None,
                price: None,
                icon: None,
            }),
            _ => None,
        })
        .collect()
}

fn parse_testimonials(value: Option<&Value>) -> Vec<Testimonial> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            item.as_object()?;
            Some(Testimonial {
                quote: get_string(item, "quote")
                    .or_else(|| get_string(item, "text"))
                    .unwrap_or_default(),
                author: get_string(item, "author")
                    .or_else(|| get_string(item, "author_name"))
                    .unwrap_or_else(|| "Customer".to_string()),
                rating: item.get("rating").and_then(Value::as_f64),
                source: get_string(item, "source"),
                date: get_string(item, "date"),
            })
        })
        .collect()
}

fn parse_hours(value: Option<&Value>) -> Option<BusinessHours> {
    let hours = value?;
    hours.as_object()?;

    let parsed = BusinessHours {
        monday: get_string(hours, "monday"),
        tuesday: get_string(hours, "tuesday"),
        wednesday: get_string(hours, "wednesday"),
        thursday: get_string(hours, "thursday"),
        friday: get_string(hours, "friday"),
        saturday: get_string(hours, "saturday"),
        sunday: get_string(hours, "sunday"),
    };
    (parsed != BusinessHours::default()).then_some(parsed)
}

fn profile_from_value(extracted: &Value, scrape: &ScrapeResult) -> ExtractedBusinessData {
    let business_type = extracted
        .get("business_type")
        .and_then(Value::as_str)
        .map(BusinessType::parse_lossy)
        .unwrap_or_default();

    let contact = extracted
        .get("contact")
        .map(|c| ContactInfo {
            phone: get_string(c, "phone"),
            email: get_string(c, "email"),
            address: get_string(c, "address"),
            website: get_string(c, "website"),
        })
        .unwrap_or_default();

    let social_media = extracted
        .get("social_media")
        .map(|s| SocialMedia {
            facebook: get_string(s, "facebook"),
            instagram: get_string(s, "instagram"),
            twitter: get_string(s, "twitter"),
            linkedin: get_string(s, "linkedin"),
            youtube: get_string(s, "youtube"),
        })
        .unwrap_or_default();

    let sources_used = {
        let listed = get_string_array(extracted, "sources_used");
        if listed.is_empty() {
            scrape.raw_data.keys().cloned().collect()
        } else {
            listed
        }
    };

    let quality = extracted
        .get("data_quality_score")
        .and_then(Value::as_u64)
        .unwrap_or(50)
        .min(100) as u8;

    ExtractedBusinessData {
        business_name: get_string(extracted, "business_name")
            .unwrap_or_else(|| "Business".to_string()),
        tagline: get_string(extracted, "tagline"),
        description_short: get_string(extracted, "description_short"),
        description_long: get_string(extracted, "description_long"),
        business_type,
        year_established: get_string(extracted, "year_established"),
        services: parse_services(extracted.get("services")),
        unique_selling_points: get_string_array(extracted, "unique_selling_points"),
        contact,
        social_media,
        hours: parse_hours(extracted.get("hours")),
        testimonials: parse_testimonials(extracted.get("testimonials")),
        rating: extracted.get("rating").and_then(Value::as_f64),
        review_count: extracted
            .get("review_count")
            .and_then(Value::as_u64)
            .map(|n| n.min(u32::MAX as u64) as u32),
        images: get_string_array(extracted, "images"),
        logo_url: get_string(extracted, "logo_url"),
        data_quality_score: quality,
        sources_used,
        missing_fields: get_string_array(extracted, "missing_fields"),
    }
}

// --- Gap-fill merge ---

/// Merge AI-authored gap data under a strict do-not-overwrite rule:
/// text fields fill only when empty, the services list is replaced only
/// by a strictly longer one, USPs fill only when empty. The quality
/// score takes a fixed bonus (capped at 100) and `missing_fields` drops
/// the names that are now populated; unknown names are left alone.
pub(crate) fn merge_gap_data(
    mut data: ExtractedBusinessData,
    gap: &Value,
) -> ExtractedBusinessData {
    if data.tagline.as_deref().unwrap_or("").is_empty() {
        if let Some(tagline) = get_string(gap, "tagline") {
            data.tagline = Some(tagline);
        }
    }
    if data.description_short.as_deref().unwrap_or("").is_empty() {
        if let Some(desc) = get_string(gap, "description_short") {
            data.description_short = Some(desc);
        }
    }
    if data.description_long.as_deref().unwrap_or("").is_empty() {
        if let Some(desc) = get_string(gap, "description_long") {
            data.description_long = Some(desc);
        }
    }

    let gap_services = parse_services(gap.get("services"));
    if gap_services.len() > data.services.len() {
        data.services = gap_services;
    }

    if data.unique_selling_points.is_empty() {
        let usps = get_string_array(gap, "unique_selling_points");
        if !usps.is_empty() {
            data.unique_selling_points = usps;
        }
    }

    data.data_quality_score = data.data_quality_score.saturating_add(GAP_FILL_BONUS).min(100);

    let missing = std::mem::take(&mut data.missing_fields);
    data.missing_fields = missing
        .into_iter()
        .filter(|field| data.field_is_populated(field) != Some(true))
        .collect();

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::traits::LogProgress;

    /// Scripted inference backend: pops canned responses in order;
    /// `None` entries fail the call.
    struct MockInference {
        responses: Mutex<Vec<Option<String>>>,
        calls: AtomicUsize,
    }

    impl MockInference {
        fn new(responses: Vec<Option<&str>>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .rev()
                        .map(|r| r.map(String::from))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Inference for MockInference {
        async fn infer(&self, _system: &str, _user: &str, _max_tokens: u32) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.lock().unwrap().pop() {
                Some(Some(text)) => Ok(text),
                _ => Err(anyhow!("inference unavailable")),
            }
        }
    }

    fn empty_scrape() -> ScrapeResult {
        ScrapeResult {
            sources: Vec::new(),
            raw_data: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_extract_parses_fenced_response() {
        let response = r#"```json
{"business_name": "Acme Coffee", "business_type": "restaurant", "data_quality_score": 82}
```"#;
        let mock = MockInference::new(vec![Some(response)]);
        let normalizer = Normalizer::new(Arc::new(mock));

        let data = normalizer
            .extract(&empty_scrape(), "Acme Coffee", &LogProgress)
            .await;

        assert_eq!(data.business_name, "Acme Coffee");
        assert_eq!(data.business_type, BusinessType::Restaurant);
        assert_eq!(data.data_quality_score, 82);
    }

    #[tokio::test]
    async fn test_extract_salvages_trailing_prose() {
        let response = r#"{"business_name": "Acme Coffee", "data_quality_score": 64}
Note: some fields could not be determined."#;
        let mock = MockInference::new(vec![Some(response)]);
        let normalizer = Normalizer::new(Arc::new(mock));

        let data = normalizer
            .extract(&empty_scrape(), "Acme Coffee", &LogProgress)
            .await;

        assert_eq!(data.business_name, "Acme Coffee");
        assert_eq!(data.data_quality_score, 64);
    }

    #[tokio::test]
    async fn test_extract_garbage_degrades_to_minimal_profile() {
        let mock = MockInference::new(vec![Some("I could not find anything useful.")]);
        let normalizer = Normalizer::new(Arc::new(mock));

        let data = normalizer
            .extract(&empty_scrape(), "Acme Coffee", &LogProgress)
            .await;

        assert_eq!(data.business_name, "Acme Coffee");
        assert_eq!(data.data_quality_score, 0);
        assert_eq!(data.missing_fields, vec!["all".to_string()]);
    }

    #[tokio::test]
    async fn test_extract_call_failure_degrades_to_minimal_profile() {
        let mock = MockInference::new(vec![None]);
        let normalizer = Normalizer::new(Arc::new(mock));

        let data = normalizer
            .extract(&empty_scrape(), "Acme Coffee", &LogProgress)
            .await;

        assert_eq!(data.data_quality_score, 0);
        assert_eq!(data.missing_fields, vec!["all".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_business_type_falls_back_to_general() {
        let response = r#"{"business_name": "Acme", "business_type": "spaceship_repair"}"#;
        let mock = MockInference::new(vec![Some(response)]);
        let normalizer = Normalizer::new(Arc::new(mock));

        let data = normalizer.extract(&empty_scrape(), "Acme", &LogProgress).await;
        assert_eq!(data.business_type, BusinessType::General);
    }

    #[tokio::test]
    async fn test_fill_gaps_short_circuits_on_strong_profile() {
        let mock = Arc::new(MockInference::new(vec![]));
        let normalizer = Normalizer::new(mock.clone());

        let mut data = ExtractedBusinessData::minimal("Acme");
        data.data_quality_score = 85;
        data.missing_fields.clear();

        let result = normalizer.fill_gaps(data.clone(), &LogProgress).await;
        assert_eq!(result, data);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fill_gaps_failure_returns_input_unchanged() {
        let mock = Arc::new(MockInference::new(vec![None]));
        let normalizer = Normalizer::new(mock.clone());

        let data = ExtractedBusinessData::minimal("Acme");
        let result = normalizer.fill_gaps(data.clone(), &LogProgress).await;

        assert_eq!(result, data);
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_merge_does_not_overwrite_existing_text() {
        let mut data = ExtractedBusinessData::minimal("Acme");
        data.tagline = Some("Original tagline".to_string());
        data.data_quality_score = 40;

        let gap = serde_json::json!({
            "tagline": "Generated tagline",
            "description_short": "Generated description",
        });

        let merged = merge_gap_data(data, &gap);
        assert_eq!(merged.tagline.as_deref(), Some("Original tagline"));
        assert_eq!(
            merged.description_short.as_deref(),
            Some("Generated description")
        );
    }

    #[test]
    fn test_merge_replaces_services_only_when_strictly_longer() {
        let mut data = ExtractedBusinessData::minimal("Acme");
        data.services = vec![
            Service {
                name: "Espresso".to_string(),
                description: None,
                price: None,
                icon: None,
            },
            Service {
                name: "Pour over".to_string(),
                description: None,
                price: None,
                icon: None,
            },
        ];

        let same_length = serde_json::json!({
            "services": [{"name": "A"}, {"name": "B"}]
        });
        let merged = merge_gap_data(data.clone(), &same_length);
        assert_eq!(merged.services[0].name, "Espresso");

        let longer = serde_json::json!({
            "services": [{"name": "A"}, {"name": "B"}, {"name": "C"}]
        });
        let merged = merge_gap_data(data, &longer);
        assert_eq!(merged.services.len(), 3);
        assert_eq!(merged.services[0].name, "A");
    }

    #[test]
    fn test_merge_quality_bonus_capped_and_monotonic() {
        let mut data = ExtractedBusinessData::minimal("Acme");
        data.data_quality_score = 95;

        let before = data.data_quality_score;
        let merged = merge_gap_data(data, &serde_json::json!({}));
        assert_eq!(merged.data_quality_score, 100);
        assert!(merged.data_quality_score >= before);
    }

    #[test]
    fn test_merge_recomputes_missing_fields() {
        let mut data = ExtractedBusinessData::minimal("Acme");
        data.missing_fields = vec![
            "tagline".to_string(),
            "phone".to_string(),
            "mystery_field".to_string(),
        ];

        let gap = serde_json::json!({"tagline": "Now present"});
        let merged = merge_gap_data(data, &gap);

        // tagline got filled, phone is still absent, and the unknown
        // name is retained untouched.
        assert_eq!(
            merged.missing_fields,
            vec!["phone".to_string(), "mystery_field".to_string()]
        );
    }

    #[test]
    fn test_parse_json_response_variants() {
        assert!(parse_json_response(r#"{"a": 1}"#).is_some());
        assert!(parse_json_response("```json\n{\"a\": 1}\n```").is_some());
        assert!(parse_json_response("[1, 2, 3]").is_none());
        assert!(parse_json_response("no json here").is_none());
    }

    #[test]
    fn test_services_accept_strings_and_objects() {
        let value = serde_json::json!([
            "Plumbing",
            {"name": "Drain cleaning", "description": "Full service", "icon": "🔧"},
            42,
        ]);
        let services = parse_services(Some(&value));
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "Plumbing");
        assert_eq!(services[1].description.as_deref(), Some("Full service"));
    }

    #[test]
    fn test_testimonial_aliases() {
        let extracted = serde_json::json!({
            "business_name": "Acme",
            "testimonials": [
                {"text": "Great!", "author_name": "Ann", "rating": 5},
                {"quote": "Loved it"},
            ]
        });
        let data = profile_from_value(&extracted, &empty_scrape());
        assert_eq!(data.testimonials[0].quote, "Great!");
        assert_eq!(data.testimonials[0].author, "Ann");
        assert_eq!(data.testimonials[1].author, "Customer");
    }
}
