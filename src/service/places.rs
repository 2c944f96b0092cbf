// service/places.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::service::error::ServiceError;

/// A candidate activity as returned by the external places provider. The
/// `payload` keeps the raw provider object so clients can render a card
/// without another upstream call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePlace {
    pub external_place_id: String,
    pub name: String,
    pub category: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i64>,
    pub payload: JsonValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: u32,
    pub category: Option<String>,
}

impl PlaceQuery {
    /// Cache key with coordinates truncated to ~100m so nearby requests for
    /// the same area share an entry.
    pub fn cache_key(&self) -> String {
        format!(
            "places:search:{:.3}:{:.3}:{}:{}",
            self.latitude,
            self.longitude,
            self.radius_m,
            self.category.as_deref().unwrap_or("any")
        )
    }
}

#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn search_nearby(&self, query: &PlaceQuery) -> Result<Vec<CandidatePlace>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct PlacesSearchResponse {
    results: Vec<PlaceResult>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PlaceResult {
    place_id: String,
    name: String,
    category: Option<String>,
    rating: Option<f64>,
    user_ratings_total: Option<i64>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    location: Option<JsonValue>,
}

/// Production provider backed by the HTTP places API.
pub struct HttpPlacesProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPlacesProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.places_api_url.clone(),
            api_key: config.places_api_key.clone(),
        }
    }
}

#[async_trait]
impl PlacesProvider for HttpPlacesProvider {
    async fn search_nearby(&self, query: &PlaceQuery) -> Result<Vec<CandidatePlace>, ServiceError> {
        let url = format!("{}/places/search", self.base_url);

        let mut request = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .query(&[
                ("lat", query.latitude.to_string()),
                ("lng", query.longitude.to_string()),
                ("radius", query.radius_m.to_string()),
            ]);

        if let Some(category) = &query.category {
            request = request.query(&[("category", category.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::Provider(format!(
                "places search returned {}",
                response.status()
            )));
        }

        let body: PlacesSearchResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Provider(e.to_string()))?;

        let candidates = body
            .results
            .into_iter()
            .map(|result| {
                let payload = serde_json::to_value(&result).unwrap_or(JsonValue::Null);
                CandidatePlace {
                    external_place_id: result.place_id,
                    name: result.name,
                    category: result.category,
                    rating: result.rating,
                    user_ratings_total: result.user_ratings_total,
                    payload,
                }
            })
            .collect();

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_truncates_coordinates() {
        let query = PlaceQuery {
            latitude: 52.520008,
            longitude: 13.404954,
            radius_m: 2000,
            category: Some("museum".to_string()),
        };

        assert_eq!(query.cache_key(), "places:search:52.520:13.405:2000:museum");
    }

    #[test]
    fn cache_key_defaults_category() {
        let query = PlaceQuery {
            latitude: 0.0,
            longitude: 0.0,
            radius_m: 500,
            category: None,
        };

        assert_eq!(query.cache_key(), "places:search:0.000:0.000:500:any");
    }

    #[test]
    fn provider_response_maps_into_candidates() {
        let raw = serde_json::json!({
            "results": [{
                "place_id": "p-1",
                "name": "City Park",
                "category": "park",
                "rating": 4.5,
                "user_ratings_total": 320
            }]
        });

        let parsed: PlacesSearchResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].place_id, "p-1");
        assert_eq!(parsed.results[0].rating, Some(4.5));
    }
}
