use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

use crate::models::trackingmodel::{InteractionEvent, TrackingRecord};

#[derive(Validate, Debug, Clone, Deserialize)]
pub struct RefreshRequestDto {
    pub user_id: Uuid,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,

    #[validate(range(min = 100, max = 50000, message = "Radius must be between 100m and 50km"))]
    pub radius_m: Option<u32>,

    #[validate(length(min = 1, max = 64, message = "Category must be between 1-64 characters"))]
    pub category: Option<String>,
}

#[derive(Validate, Debug, Clone, Deserialize)]
pub struct InteractionDto {
    pub user_id: Uuid,

    pub event: InteractionEvent,

    #[validate(length(max = 255, message = "Reason must be at most 255 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserQueryDto {
    pub user_id: Uuid,
}

/// Client-facing projection of a tracking record; internal bookkeeping
/// columns stay server-side.
#[derive(Debug, Serialize)]
pub struct RecommendationDto {
    pub external_place_id: String,
    pub place_name: String,
    pub category: Option<String>,
    pub payload: JsonValue,
    pub status: String,
    pub confidence_score: f64,
    pub refresh_count: i32,
    pub last_shown_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RecommendationDto {
    pub fn from_record(record: &TrackingRecord) -> Self {
        RecommendationDto {
            external_place_id: record.external_place_id.to_owned(),
            place_name: record.place_name.to_owned(),
            category: record.category.to_owned(),
            payload: record.payload.to_owned(),
            status: record.status.to_str().to_string(),
            confidence_score: record.confidence_score,
            refresh_count: record.refresh_count,
            last_shown_at: record.last_shown_at,
            expires_at: record.expires_at,
        }
    }

    pub fn from_records(records: &[TrackingRecord]) -> Vec<Self> {
        records.iter().map(Self::from_record).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponseDto {
    pub status: String,
    pub admitted: bool,
    pub seconds_until_refresh: i64,
    pub results: Vec<RecommendationDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_request_validates_coordinates() {
        let dto = RefreshRequestDto {
            user_id: Uuid::new_v4(),
            latitude: 95.0,
            longitude: 13.4,
            radius_m: None,
            category: None,
        };
        assert!(dto.validate().is_err());

        let dto = RefreshRequestDto { latitude: 52.5, ..dto };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn refresh_request_rejects_tiny_radius() {
        let dto = RefreshRequestDto {
            user_id: Uuid::new_v4(),
            latitude: 0.0,
            longitude: 0.0,
            radius_m: Some(10),
            category: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn interaction_dto_parses_event() {
        let dto: InteractionDto = serde_json::from_value(serde_json::json!({
            "user_id": Uuid::new_v4(),
            "event": "blocked",
            "reason": "too far away"
        }))
        .unwrap();

        assert_eq!(dto.event, InteractionEvent::Blocked);
        assert!(dto.validate().is_ok());
    }
}
