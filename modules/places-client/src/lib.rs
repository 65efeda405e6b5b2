pub mod error;

pub use error::{PlacesError, Result};

use std::time::Duration;

use serde::Deserialize;

const BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Detail fields requested for a matched place.
const DETAIL_FIELDS: &str = "name,formatted_address,formatted_phone_number,opening_hours,\
reviews,photos,website,types,editorial_summary,rating,user_ratings_total";

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    #[serde(default)]
    candidates: Vec<PlaceCandidate>,
}

#[derive(Debug, Deserialize)]
struct PlaceCandidate {
    place_id: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    result: Option<serde_json::Value>,
}

pub struct PlacesClient {
    client: reqwest::Client,
    api_key: String,
}

impl PlacesClient {
    pub fn new(api_key: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self.client.get(url).query(params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(PlacesError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// Resolve a free-text business query to a place id.
    pub async fn find_place(&self, query: &str) -> Result<String> {
        tracing::info!(query, "Places find-place lookup");

        let url = format!("{}/findplacefromtext/json", BASE_URL);
        let response: FindPlaceResponse = self
            .get_json(
                &url,
                &[
                    ("input", query),
                    ("inputtype", "textquery"),
                    ("fields", "place_id,name,formatted_address"),
                    ("key", &self.api_key),
                ],
            )
            .await?;

        response
            .candidates
            .into_iter()
            .next()
            .map(|c| c.place_id)
            .ok_or(PlacesError::NotFound)
    }

    /// Fetch full details for a place id.
    pub async fn place_details(&self, place_id: &str) -> Result<serde_json::Value> {
        tracing::info!(place_id, "Places details lookup");

        let url = format!("{}/details/json", BASE_URL);
        let response: DetailsResponse = self
            .get_json(
                &url,
                &[
                    ("place_id", place_id),
                    ("fields", DETAIL_FIELDS),
                    ("key", &self.api_key),
                ],
            )
            .await?;

        response.result.ok_or(PlacesError::MissingDetails)
    }

    /// Find-place + details in one call.
    pub async fn lookup(&self, query: &str) -> Result<serde_json::Value> {
        let place_id = self.find_place(query).await?;
        self.place_details(&place_id).await
    }
}
