// db/trackingdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::trackingmodel::{BlockedPlace, RecommendationStatus, TrackingRecord};

#[async_trait]
pub trait TrackingExt {
    /// Record that a place was surfaced to a user. First show creates the row
    /// in `pending` with refresh_count 0; every later show bumps
    /// last_shown_at and increments refresh_count in the same statement, so
    /// concurrent refreshes cannot lose an increment.
    async fn upsert_shown(
        &self,
        user_id: Uuid,
        external_place_id: &str,
        place_name: &str,
        category: Option<&str>,
        payload: &JsonValue,
        confidence_score: f64,
        now: DateTime<Utc>,
    ) -> Result<TrackingRecord, sqlx::Error>;

    async fn get_tracking_record(
        &self,
        user_id: Uuid,
        external_place_id: &str,
    ) -> Result<Option<TrackingRecord>, sqlx::Error>;

    async fn get_tracking_records(
        &self,
        user_id: Uuid,
        external_place_ids: &[String],
    ) -> Result<Vec<TrackingRecord>, sqlx::Error>;

    /// pending -> viewed. Returns None when the row is absent or no longer
    /// pending; the caller decides whether that is a 404 or a no-op.
    async fn mark_viewed(
        &self,
        user_id: Uuid,
        external_place_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TrackingRecord>, sqlx::Error>;

    /// Store an accept/decline outcome. A `not_interested` row is never
    /// overwritten here; blocking wins over any later response.
    async fn record_response(
        &self,
        user_id: Uuid,
        external_place_id: &str,
        status: RecommendationStatus,
        decline_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<TrackingRecord>, sqlx::Error>;

    /// Permanently suppress a place for a user. Writes both suppression
    /// sources in one transaction: the tracking row (when one exists) moves
    /// to `not_interested`, and a blocked_places entry is inserted.
    async fn block_place(
        &self,
        user_id: Uuid,
        external_place_id: &str,
        place_name: Option<&str>,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>;

    /// Removes the explicit block entry only. A `not_interested` tracking
    /// status survives unblocking on purpose; see the note in DESIGN.md.
    async fn unblock_place(
        &self,
        user_id: Uuid,
        external_place_id: &str,
    ) -> Result<bool, sqlx::Error>;

    async fn is_blocked(
        &self,
        user_id: Uuid,
        external_place_id: &str,
    ) -> Result<bool, sqlx::Error>;

    /// Union of both suppression sources, used to filter candidate sets.
    async fn blocked_place_ids(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error>;

    async fn get_blocked_places(&self, user_id: Uuid) -> Result<Vec<BlockedPlace>, sqlx::Error>;

    /// pending rows past their deadline move to expired. Idempotent; safe to
    /// run from the background job and inline before a refresh.
    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error>;

    async fn expire_stale_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>;
}

#[async_trait]
impl TrackingExt for DBClient {
    async fn upsert_shown(
        &self,
        user_id: Uuid,
        external_place_id: &str,
        place_name: &str,
        category: Option<&str>,
        payload: &JsonValue,
        confidence_score: f64,
        now: DateTime<Utc>,
    ) -> Result<TrackingRecord, sqlx::Error> {
        sqlx::query_as::<_, TrackingRecord>(
            r#"
            INSERT INTO place_recommendations (
                id, user_id, external_place_id, place_name, category, payload,
                status, confidence_score, last_shown_at, refresh_count,
                created_at, updated_at, expires_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6,
                'pending'::recommendation_status, $7, $8, 0,
                $8, $8, $8 + INTERVAL '7 days'
            )
            ON CONFLICT (user_id, external_place_id) DO UPDATE
            SET last_shown_at = EXCLUDED.last_shown_at,
                refresh_count = place_recommendations.refresh_count + 1,
                updated_at = EXCLUDED.updated_at
            RETURNING
                id, user_id, external_place_id, place_name, category, payload,
                status, confidence_score, last_shown_at, refresh_count,
                block_reason, viewed_at, responded_at, decline_reason,
                created_at, updated_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(external_place_id)
        .bind(place_name)
        .bind(category)
        .bind(payload)
        .bind(confidence_score)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_tracking_record(
        &self,
        user_id: Uuid,
        external_place_id: &str,
    ) -> Result<Option<TrackingRecord>, sqlx::Error> {
        sqlx::query_as::<_, TrackingRecord>(
            r#"
            SELECT
                id, user_id, external_place_id, place_name, category, payload,
                status, confidence_score, last_shown_at, refresh_count,
                block_reason, viewed_at, responded_at, decline_reason,
                created_at, updated_at, expires_at
            FROM place_recommendations
            WHERE user_id = $1 AND external_place_id = $2
            "#,
        )
        .bind(user_id)
        .bind(external_place_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_tracking_records(
        &self,
        user_id: Uuid,
        external_place_ids: &[String],
    ) -> Result<Vec<TrackingRecord>, sqlx::Error> {
        if external_place_ids.is_empty() {
            return Ok(vec![]);
        }

        sqlx::query_as::<_, TrackingRecord>(
            r#"
            SELECT
                id, user_id, external_place_id, place_name, category, payload,
                status, confidence_score, last_shown_at, refresh_count,
                block_reason, viewed_at, responded_at, decline_reason,
                created_at, updated_at, expires_at
            FROM place_recommendations
            WHERE user_id = $1 AND external_place_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(external_place_ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_viewed(
        &self,
        user_id: Uuid,
        external_place_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TrackingRecord>, sqlx::Error> {
        sqlx::query_as::<_, TrackingRecord>(
            r#"
            UPDATE place_recommendations
            SET status = 'viewed'::recommendation_status,
                viewed_at = COALESCE(viewed_at, $3),
                updated_at = $3
            WHERE user_id = $1 AND external_place_id = $2
              AND status = 'pending'::recommendation_status
            RETURNING
                id, user_id, external_place_id, place_name, category, payload,
                status, confidence_score, last_shown_at, refresh_count,
                block_reason, viewed_at, responded_at, decline_reason,
                created_at, updated_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(external_place_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_response(
        &self,
        user_id: Uuid,
        external_place_id: &str,
        status: RecommendationStatus,
        decline_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<TrackingRecord>, sqlx::Error> {
        sqlx::query_as::<_, TrackingRecord>(
            r#"
            UPDATE place_recommendations
            SET status = $3,
                responded_at = $4,
                decline_reason = $5,
                updated_at = $4
            WHERE user_id = $1 AND external_place_id = $2
              AND status <> 'not_interested'::recommendation_status
            RETURNING
                id, user_id, external_place_id, place_name, category, payload,
                status, confidence_score, last_shown_at, refresh_count,
                block_reason, viewed_at, responded_at, decline_reason,
                created_at, updated_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(external_place_id)
        .bind(status)
        .bind(now)
        .bind(decline_reason)
        .fetch_optional(&self.pool)
        .await
    }

    async fn block_place(
        &self,
        user_id: Uuid,
        external_place_id: &str,
        place_name: Option<&str>,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE place_recommendations
            SET status = 'not_interested'::recommendation_status,
                block_reason = $3,
                updated_at = $4
            WHERE user_id = $1 AND external_place_id = $2
            "#,
        )
        .bind(user_id)
        .bind(external_place_id)
        .bind(reason)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO blocked_places (id, user_id, external_place_id, place_name, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, external_place_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(external_place_id)
        .bind(place_name)
        .bind(reason)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn unblock_place(
        &self,
        user_id: Uuid,
        external_place_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM blocked_places
            WHERE user_id = $1 AND external_place_id = $2
            "#,
        )
        .bind(user_id)
        .bind(external_place_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_blocked(
        &self,
        user_id: Uuid,
        external_place_id: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM blocked_places
                WHERE user_id = $1 AND external_place_id = $2
            ) OR EXISTS(
                SELECT 1 FROM place_recommendations
                WHERE user_id = $1 AND external_place_id = $2
                  AND status = 'not_interested'::recommendation_status
            )
            "#,
        )
        .bind(user_id)
        .bind(external_place_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn blocked_place_ids(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT external_place_id FROM blocked_places WHERE user_id = $1
            UNION
            SELECT external_place_id FROM place_recommendations
            WHERE user_id = $1 AND status = 'not_interested'::recommendation_status
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_blocked_places(&self, user_id: Uuid) -> Result<Vec<BlockedPlace>, sqlx::Error> {
        sqlx::query_as::<_, BlockedPlace>(
            r#"
            SELECT id, user_id, external_place_id, place_name, reason, created_at
            FROM blocked_places
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE place_recommendations
            SET status = 'expired'::recommendation_status,
                updated_at = $1
            WHERE status = 'pending'::recommendation_status
              AND expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn expire_stale_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE place_recommendations
            SET status = 'expired'::recommendation_status,
                updated_at = $2
            WHERE user_id = $1
              AND status = 'pending'::recommendation_status
              AND expires_at < $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    // Signature-level check only; behavior against a live database is
    // covered by the deployment environment.
    #[tokio::test]
    async fn tracking_ext_is_object_callable() {
        let pool = PgPool::connect_lazy("postgres://localhost/wanderplan").unwrap();
        let db_client = DBClient::new(pool);

        let _ = db_client.get_tracking_record(Uuid::nil(), "place-1");
        let _ = db_client.expire_stale(Utc::now());
    }
}
