use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "recommendation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    Viewed,
    Accepted,
    Declined,
    Expired,
    NotInterested,
}

impl RecommendationStatus {
    pub fn to_str(&self) -> &str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::Viewed => "viewed",
            RecommendationStatus::Accepted => "accepted",
            RecommendationStatus::Declined => "declined",
            RecommendationStatus::Expired => "expired",
            RecommendationStatus::NotInterested => "not_interested",
        }
    }
}

/// User-facing interaction events accepted by the interaction endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionEvent {
    Viewed,
    Accepted,
    Declined,
    Blocked,
}

/// One row per (user, external place). The payload column keeps the provider
/// snapshot so the client can re-render a card without a second fetch.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrackingRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub external_place_id: String,
    pub place_name: String,
    pub category: Option<String>,
    pub payload: JsonValue,
    pub status: RecommendationStatus,
    pub confidence_score: f64,
    pub last_shown_at: DateTime<Utc>,
    pub refresh_count: i32,
    pub block_reason: Option<String>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Explicit "never show this place again" entry. Kept separate from the
/// tracking row: a user can block a place from search results that was never
/// surfaced as a recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlockedPlace {
    pub id: Uuid,
    pub user_id: Uuid,
    pub external_place_id: String,
    pub place_name: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
