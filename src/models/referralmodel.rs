use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "referral_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Completed,
    Expired,
    Invalid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "reward_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    InviterBonus,
    InviteeWelcome,
    Milestone3,
    Milestone10,
    Milestone25,
    Milestone100,
}

impl RewardType {
    pub fn to_str(&self) -> &str {
        match self {
            RewardType::InviterBonus => "inviter_bonus",
            RewardType::InviteeWelcome => "invitee_welcome",
            RewardType::Milestone3 => "milestone_3",
            RewardType::Milestone10 => "milestone_10",
            RewardType::Milestone25 => "milestone_25",
            RewardType::Milestone100 => "milestone_100",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "reward_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Pending,
    Granted,
    Revoked,
    Expired,
}

/// One row per (referrer, referred) pair; the unique index on that pair is
/// what makes a second redemption fail rather than silently duplicate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub referral_code: String,
    pub status: ReferralStatus,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Reward grants are keyed by (user_id, referral_id, reward_type) so a
/// retried completion inserts nothing the second time around.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReferralReward {
    pub id: Uuid,
    pub user_id: Uuid,
    pub referral_id: Uuid,
    pub reward_type: RewardType,
    pub description: String,
    pub plus_days: i32,
    pub status: RewardStatus,
    pub granted_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReferralStats {
    pub referral_code: String,
    pub referral_link: String,
    pub total_referrals: i64,
    pub completed_referrals: i64,
    pub rewards: Vec<ReferralReward>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_type_labels() {
        assert_eq!(RewardType::InviterBonus.to_str(), "inviter_bonus");
        assert_eq!(RewardType::Milestone10.to_str(), "milestone_10");
    }

    #[test]
    fn referral_status_roundtrips_through_serde() {
        let status: ReferralStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(status, ReferralStatus::Completed);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"completed\"");
    }
}
