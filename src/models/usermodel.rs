use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "subscription_tier", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Plus,
    Premium,
}

impl SubscriptionTier {
    pub fn to_str(&self) -> &str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Plus => "plus",
            SubscriptionTier::Premium => "premium",
        }
    }

    /// Minimum gap between accepted feed refreshes for this tier.
    pub fn refresh_cooldown(&self) -> Duration {
        match self {
            SubscriptionTier::Free => Duration::hours(4),
            SubscriptionTier::Plus => Duration::hours(1),
            SubscriptionTier::Premium => Duration::zero(),
        }
    }
}

/// The slice of the user row this service reads and writes. Account
/// management, auth and billing live in other services.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub referral_code: Option<String>,
    pub referred_by: Option<Uuid>,
    pub referral_count: i32,
    pub subscription_tier: SubscriptionTier,
    pub last_refresh_at: Option<DateTime<Utc>>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_table_per_tier() {
        assert_eq!(SubscriptionTier::Free.refresh_cooldown(), Duration::hours(4));
        assert_eq!(SubscriptionTier::Plus.refresh_cooldown(), Duration::hours(1));
        assert!(SubscriptionTier::Premium.refresh_cooldown().is_zero());
    }

    #[test]
    fn tier_labels() {
        assert_eq!(SubscriptionTier::Free.to_str(), "free");
        assert_eq!(SubscriptionTier::Plus.to_str(), "plus");
        assert_eq!(SubscriptionTier::Premium.to_str(), "premium");
    }
}
