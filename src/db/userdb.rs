// db/userdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::User;

#[async_trait]
pub trait UserExt {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;

    async fn get_user_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Assign a referral code to a user that has none. Returns None when the
    /// user already carries a code (the existing one wins) or does not exist.
    async fn set_referral_code(
        &self,
        user_id: Uuid,
        referral_code: &str,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Cooldown admission and stamp in one statement: the row is updated only
    /// when the previous refresh is old enough, so of two concurrent refresh
    /// requests at most one sees a row come back.
    async fn begin_refresh(
        &self,
        user_id: Uuid,
        cooldown_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Atomic increment; the returned row carries the new count.
    async fn increment_referral_count(&self, user_id: Uuid) -> Result<User, sqlx::Error>;
}

const USER_COLUMNS: &str = r#"
    id, name, email,
    referral_code, referred_by, referral_count,
    subscription_tier, last_refresh_at,
    created_at, updated_at
"#;

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE referral_code = $1
            "#
        ))
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_referral_code(
        &self,
        user_id: Uuid,
        referral_code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET referral_code = $2,
                updated_at = NOW()
            WHERE id = $1 AND referral_code IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await
    }

    async fn begin_refresh(
        &self,
        user_id: Uuid,
        cooldown_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET last_refresh_at = $2,
                updated_at = $2
            WHERE id = $1
              AND (
                last_refresh_at IS NULL
                OR last_refresh_at <= $2 - make_interval(secs => $3::double precision)
              )
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(now)
        .bind(cooldown_seconds)
        .fetch_optional(&self.pool)
        .await
    }

    async fn increment_referral_count(&self, user_id: Uuid) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET referral_count = referral_count + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }
}
