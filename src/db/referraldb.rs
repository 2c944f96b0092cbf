// db/referraldb.rs
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::referralmodel::{Referral, ReferralReward, RewardType};

const REFERRAL_COLUMNS: &str = r#"
    id, referrer_id, referred_id, referral_code, status, source,
    created_at, completed_at
"#;

const REWARD_COLUMNS: &str = r#"
    id, user_id, referral_id, reward_type, description, plus_days, status,
    granted_at, expires_at, created_at
"#;

#[async_trait]
pub trait ReferralExt {
    /// Insert the pending relationship and stamp the referred user's
    /// back-reference in one transaction. The unique index on
    /// (referrer_id, referred_id) surfaces a duplicate redemption as a
    /// unique-violation database error.
    async fn create_referral(
        &self,
        referrer_id: Uuid,
        referred_id: Uuid,
        referral_code: &str,
        source: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Referral, sqlx::Error>;

    async fn get_pending_referral_for_referred(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, sqlx::Error>;

    /// pending -> completed, at most once per relationship. Returns None when
    /// the row was already completed (or a concurrent caller won the race).
    async fn complete_referral_once(
        &self,
        referral_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Referral>, sqlx::Error>;

    /// Grant a reward under the (user_id, referral_id, reward_type)
    /// uniqueness guard. Returns None when the same grant already exists, so
    /// a retried completion cannot double-grant.
    async fn insert_reward(
        &self,
        user_id: Uuid,
        referral_id: Uuid,
        reward_type: RewardType,
        description: &str,
        plus_days: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<ReferralReward>, sqlx::Error>;

    async fn count_referrals_for_referrer(
        &self,
        referrer_id: Uuid,
    ) -> Result<(i64, i64), sqlx::Error>;

    async fn get_rewards_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ReferralReward>, sqlx::Error>;
}

#[async_trait]
impl ReferralExt for DBClient {
    async fn create_referral(
        &self,
        referrer_id: Uuid,
        referred_id: Uuid,
        referral_code: &str,
        source: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Referral, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let referral = sqlx::query_as::<_, Referral>(&format!(
            r#"
            INSERT INTO referrals (
                id, referrer_id, referred_id, referral_code, status, source, created_at
            )
            VALUES ($1, $2, $3, $4, 'pending'::referral_status, $5, $6)
            RETURNING {REFERRAL_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(referrer_id)
        .bind(referred_id)
        .bind(referral_code)
        .bind(source)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET referred_by = $2,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(referred_id)
        .bind(referrer_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(referral)
    }

    async fn get_pending_referral_for_referred(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, sqlx::Error> {
        sqlx::query_as::<_, Referral>(&format!(
            r#"
            SELECT {REFERRAL_COLUMNS}
            FROM referrals
            WHERE referred_id = $1 AND status = 'pending'::referral_status
            "#
        ))
        .bind(referred_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn complete_referral_once(
        &self,
        referral_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Referral>, sqlx::Error> {
        sqlx::query_as::<_, Referral>(&format!(
            r#"
            UPDATE referrals
            SET status = 'completed'::referral_status,
                completed_at = $2
            WHERE id = $1 AND status = 'pending'::referral_status
            RETURNING {REFERRAL_COLUMNS}
            "#
        ))
        .bind(referral_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_reward(
        &self,
        user_id: Uuid,
        referral_id: Uuid,
        reward_type: RewardType,
        description: &str,
        plus_days: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<ReferralReward>, sqlx::Error> {
        let expires_at = now + Duration::days(plus_days as i64);

        sqlx::query_as::<_, ReferralReward>(&format!(
            r#"
            INSERT INTO referral_rewards (
                id, user_id, referral_id, reward_type, description, plus_days,
                status, granted_at, expires_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'granted'::reward_status, $7, $8, $7)
            ON CONFLICT (user_id, referral_id, reward_type) DO NOTHING
            RETURNING {REWARD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(referral_id)
        .bind(reward_type)
        .bind(description)
        .bind(plus_days)
        .bind(now)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
    }

    async fn count_referrals_for_referrer(
        &self,
        referrer_id: Uuid,
    ) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'completed'::referral_status)
            FROM referrals
            WHERE referrer_id = $1
            "#,
        )
        .bind(referrer_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_rewards_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ReferralReward>, sqlx::Error> {
        sqlx::query_as::<_, ReferralReward>(&format!(
            r#"
            SELECT {REWARD_COLUMNS}
            FROM referral_rewards
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
