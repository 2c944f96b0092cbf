use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, referraldb::ReferralExt, userdb::UserExt},
    models::{
        referralmodel::{Referral, ReferralReward, ReferralStats, RewardType},
        usermodel::User,
    },
    service::error::ServiceError,
    utils::referral_code::{generate_referral_code, generate_referral_link},
};

/// Entitlement granted to the referred user when their referral completes.
const INVITEE_WELCOME_PLUS_DAYS: i32 = 7;

const CODE_ALLOCATION_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardTrigger {
    /// Fires on every positive multiple of `n`.
    EveryMultipleOf(i32),
    /// Fires exactly once, when the count lands on `n`.
    Exactly(i32),
}

impl RewardTrigger {
    pub fn matches(&self, referral_count: i32) -> bool {
        if referral_count <= 0 {
            return false;
        }

        match self {
            RewardTrigger::EveryMultipleOf(n) => referral_count % n == 0,
            RewardTrigger::Exactly(n) => referral_count == *n,
        }
    }
}

pub struct RewardRule {
    pub trigger: RewardTrigger,
    pub reward_type: RewardType,
    pub plus_days: i32,
    pub description: &'static str,
}

/// Referrer-side reward schedule, evaluated once per completed referral
/// against the referrer's new count. Adding a tier is a row here plus the
/// matching database enum label, nothing else.
pub const REWARD_RULES: &[RewardRule] = &[
    RewardRule {
        trigger: RewardTrigger::EveryMultipleOf(3),
        reward_type: RewardType::InviterBonus,
        plus_days: 30,
        description: "Bonus for every third completed referral",
    },
    RewardRule {
        trigger: RewardTrigger::Exactly(10),
        reward_type: RewardType::Milestone10,
        plus_days: 90,
        description: "Milestone reward for reaching 10 referrals",
    },
    RewardRule {
        trigger: RewardTrigger::Exactly(25),
        reward_type: RewardType::Milestone25,
        plus_days: 180,
        description: "Milestone reward for reaching 25 referrals",
    },
    RewardRule {
        trigger: RewardTrigger::Exactly(100),
        reward_type: RewardType::Milestone100,
        plus_days: 365,
        description: "Milestone reward for reaching 100 referrals",
    },
];

pub fn rewards_for_count(referral_count: i32) -> Vec<&'static RewardRule> {
    REWARD_RULES
        .iter()
        .filter(|rule| rule.trigger.matches(referral_count))
        .collect()
}

/// Outcome of an onboarding-completion event. Completion is called
/// speculatively at every onboarding finish, so "nothing to do" is a normal
/// result rather than an error.
#[derive(Debug)]
pub enum ReferralCompletion {
    NoPendingReferral,
    Completed {
        referral: Referral,
        new_referral_count: i32,
        rewards: Vec<ReferralReward>,
    },
}

#[derive(Clone)]
pub struct ReferralService {
    db_client: Arc<DBClient>,
}

impl ReferralService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Redeem a referral code for a freshly signed-up user. The unique index
    /// on (referrer_id, referred_id) is the duplicate guard; this method only
    /// translates the violation into a typed error.
    pub async fn redeem_code(
        &self,
        referred_user_id: Uuid,
        code: &str,
        source: Option<&str>,
    ) -> Result<Referral, ServiceError> {
        let code = code.trim().to_uppercase();

        let referred = self
            .db_client
            .get_user(referred_user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(referred_user_id))?;

        let referrer = self
            .db_client
            .get_user_by_referral_code(&code)
            .await?
            .ok_or_else(|| ServiceError::InvalidReferralCode(code.clone()))?;

        if referrer.id == referred.id {
            return Err(ServiceError::SelfReferral);
        }

        let now = Utc::now();
        match self
            .db_client
            .create_referral(referrer.id, referred.id, &code, source, now)
            .await
        {
            Ok(referral) => {
                tracing::info!(
                    "referral {} created: {} referred {}",
                    referral.id,
                    referrer.id,
                    referred.id
                );
                Ok(referral)
            }
            Err(e) => {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return Err(ServiceError::DuplicateReferral);
                    }
                }
                Err(ServiceError::Database(e))
            }
        }
    }

    /// Settle the referral for a user that just finished onboarding. The
    /// pending -> completed transition happens at most once per relationship,
    /// so the count increment and the reward grants below it run at most once
    /// too; the per-(user, referral, type) uniqueness guard covers crashed
    /// and retried completions on top of that.
    pub async fn complete_referral(
        &self,
        referred_user_id: Uuid,
    ) -> Result<ReferralCompletion, ServiceError> {
        let pending = match self
            .db_client
            .get_pending_referral_for_referred(referred_user_id)
            .await?
        {
            Some(referral) => referral,
            None => return Ok(ReferralCompletion::NoPendingReferral),
        };

        let now = Utc::now();
        let completed = match self.db_client.complete_referral_once(pending.id, now).await? {
            Some(referral) => referral,
            // A concurrent completion won; nothing left to do here.
            None => return Ok(ReferralCompletion::NoPendingReferral),
        };

        let referrer = self
            .db_client
            .increment_referral_count(completed.referrer_id)
            .await?;
        let new_count = referrer.referral_count;

        let mut rewards = Vec::new();

        if let Some(reward) = self
            .db_client
            .insert_reward(
                referred_user_id,
                completed.id,
                RewardType::InviteeWelcome,
                "Welcome bonus for joining through a friend",
                INVITEE_WELCOME_PLUS_DAYS,
                now,
            )
            .await?
        {
            rewards.push(reward);
        }

        for rule in rewards_for_count(new_count) {
            if let Some(reward) = self
                .db_client
                .insert_reward(
                    referrer.id,
                    completed.id,
                    rule.reward_type,
                    rule.description,
                    rule.plus_days,
                    now,
                )
                .await?
            {
                rewards.push(reward);
            }
        }

        for reward in &rewards {
            tracing::debug!(
                "granted {} ({} plus-day(s)) to user {}",
                reward.reward_type.to_str(),
                reward.plus_days,
                reward.user_id
            );
        }

        tracing::info!(
            "referral {} completed; referrer {} now at {} referrals, {} reward(s) granted",
            completed.id,
            referrer.id,
            new_count,
            rewards.len()
        );

        Ok(ReferralCompletion::Completed {
            referral: completed,
            new_referral_count: new_count,
            rewards,
        })
    }

    /// Fetch the user's code, generating one when absent. Codes are six
    /// characters from a small alphabet, so collisions are rare but real;
    /// the unique index decides, and we retry with a fresh code.
    pub async fn ensure_referral_code(&self, user_id: Uuid) -> Result<User, ServiceError> {
        let user = self
            .db_client
            .get_user(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;

        if user.referral_code.is_some() {
            return Ok(user);
        }

        for _ in 0..CODE_ALLOCATION_ATTEMPTS {
            let code = generate_referral_code();
            match self.db_client.set_referral_code(user_id, &code).await {
                Ok(Some(user)) => return Ok(user),
                Ok(None) => {
                    // Someone else assigned a code between our read and write.
                    let user = self
                        .db_client
                        .get_user(user_id)
                        .await?
                        .ok_or(ServiceError::UserNotFound(user_id))?;
                    if user.referral_code.is_some() {
                        return Ok(user);
                    }
                }
                Err(e) => {
                    if let sqlx::Error::Database(db_err) = &e {
                        if db_err.is_unique_violation() {
                            continue;
                        }
                    }
                    return Err(ServiceError::Database(e));
                }
            }
        }

        Err(ServiceError::Conflict(
            "could not allocate a unique referral code".to_string(),
        ))
    }

    pub async fn referral_stats(
        &self,
        user_id: Uuid,
        app_url: &str,
    ) -> Result<ReferralStats, ServiceError> {
        let user = self.ensure_referral_code(user_id).await?;
        let referral_code = user.referral_code.unwrap_or_default();

        let (total, completed) = self
            .db_client
            .count_referrals_for_referrer(user_id)
            .await?;
        let rewards = self.db_client.get_rewards_for_user(user_id, 20).await?;

        Ok(ReferralStats {
            referral_link: generate_referral_link(app_url, &referral_code),
            referral_code,
            total_referrals: total,
            completed_referrals: completed,
            rewards,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[test]
    fn every_third_referral_earns_a_bonus() {
        let types = |count: i32| -> Vec<RewardType> {
            rewards_for_count(count).iter().map(|r| r.reward_type).collect()
        };

        assert_eq!(types(3), vec![RewardType::InviterBonus]);
        assert_eq!(types(4), Vec::<RewardType>::new());
        assert_eq!(types(6), vec![RewardType::InviterBonus]);
        assert_eq!(types(9), vec![RewardType::InviterBonus]);
    }

    #[test]
    fn milestones_fire_on_exact_counts_only() {
        let types = |count: i32| -> Vec<RewardType> {
            rewards_for_count(count).iter().map(|r| r.reward_type).collect()
        };

        // 10 is not a multiple of 3, so the milestone stands alone.
        assert_eq!(types(10), vec![RewardType::Milestone10]);
        assert_eq!(types(11), Vec::<RewardType>::new());
        assert_eq!(types(20), Vec::<RewardType>::new());
        assert_eq!(types(25), vec![RewardType::Milestone25]);
        assert_eq!(types(100), vec![RewardType::Milestone100]);
    }

    #[test]
    fn milestone_and_recurring_bonus_can_stack() {
        // 99 = 33 * 3; 100 is the milestone. Both never fire together for
        // the shipped thresholds, but a multiple-of-3 milestone would stack.
        let at_99: Vec<RewardType> =
            rewards_for_count(99).iter().map(|r| r.reward_type).collect();
        assert_eq!(at_99, vec![RewardType::InviterBonus]);
    }

    #[test]
    fn zero_and_negative_counts_never_match() {
        assert!(rewards_for_count(0).is_empty());
        assert!(rewards_for_count(-3).is_empty());
        assert!(!RewardTrigger::EveryMultipleOf(3).matches(0));
    }

    #[test]
    fn reward_schedule_entitlement_lengths() {
        let days: Vec<i32> = REWARD_RULES.iter().map(|r| r.plus_days).collect();
        assert_eq!(days, vec![30, 90, 180, 365]);
    }

    #[tokio::test]
    async fn referral_service_constructs() {
        let pool = PgPool::connect_lazy("postgres://localhost/wanderplan").unwrap();
        let db_client = Arc::new(DBClient::new(pool));
        let svc = ReferralService::new(db_client);

        let _ = svc.referral_stats(Uuid::nil(), "https://wanderplan.app");
    }
}
