use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, trackingdb::TrackingExt, userdb::UserExt},
    models::trackingmodel::{
        BlockedPlace, InteractionEvent, RecommendationStatus, TrackingRecord,
    },
    service::{
        cooldown,
        error::ServiceError,
        places::{CandidatePlace, PlaceQuery, PlacesProvider},
        resurfacing::{is_resurfaceable, ResurfacingWindows},
    },
};

const W_RATING: f64 = 0.7;
const W_POPULARITY: f64 = 0.3;
/// Review counts at or above this are treated as "everyone knows this place".
const POPULARITY_SATURATION: f64 = 500.0;

/// Weighted blend of provider rating and review volume, clamped to [0, 1].
pub fn score_candidate(candidate: &CandidatePlace) -> f64 {
    let norm_rating = candidate.rating.unwrap_or(0.0).clamp(0.0, 5.0) / 5.0;
    let norm_popularity =
        (candidate.user_ratings_total.unwrap_or(0).max(0) as f64 / POPULARITY_SATURATION).min(1.0);

    (W_RATING * norm_rating + W_POPULARITY * norm_popularity).clamp(0.0, 1.0)
}

/// Dedupe, drop suppressed and quarantined places, score what is left and
/// order best-first. Pure over its inputs so the whole admission pipeline is
/// testable without a database.
pub fn filter_candidates(
    candidates: Vec<CandidatePlace>,
    blocked: &HashSet<String>,
    records: &HashMap<String, TrackingRecord>,
    now: DateTime<Utc>,
    windows: &ResurfacingWindows,
) -> Vec<(CandidatePlace, f64)> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut eligible: Vec<(CandidatePlace, f64)> = Vec::new();

    for candidate in candidates {
        if !seen.insert(candidate.external_place_id.clone()) {
            continue;
        }
        if blocked.contains(&candidate.external_place_id) {
            continue;
        }
        // A known place only comes back once its quarantine window has run
        // out; an unknown place is always fair game.
        if let Some(record) = records.get(&candidate.external_place_id) {
            if !is_resurfaceable(record, now, windows) {
                continue;
            }
        }

        let score = score_candidate(&candidate);
        eligible.push((candidate, score));
    }

    eligible.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    eligible
}

#[derive(Debug)]
pub struct RefreshOutcome {
    pub admitted: bool,
    pub seconds_until_refresh: i64,
    pub results: Vec<TrackingRecord>,
}

/// Composes the cooldown gate, the candidate source, the block list and the
/// resurfacing policy into one refresh round, and records every card it
/// hands out.
#[derive(Clone)]
pub struct RecommendationService {
    db_client: Arc<DBClient>,
    places: Arc<dyn PlacesProvider>,
    windows: ResurfacingWindows,
    cache_ttl: usize,
    max_results: usize,
}

impl RecommendationService {
    pub fn new(
        db_client: Arc<DBClient>,
        places: Arc<dyn PlacesProvider>,
        cache_ttl_seconds: usize,
        max_results: usize,
    ) -> Self {
        Self {
            db_client,
            places,
            windows: ResurfacingWindows::default(),
            cache_ttl: cache_ttl_seconds,
            max_results,
        }
    }

    /// One refresh round for a user. Admission and the `last_refresh_at`
    /// stamp are a single conditional update, so a double-tapped refresh
    /// admits at most once per cooldown window.
    pub async fn request_refresh(
        &self,
        user_id: Uuid,
        query: &PlaceQuery,
    ) -> Result<RefreshOutcome, ServiceError> {
        let user = self
            .db_client
            .get_user(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;

        let now = Utc::now();
        let cooldown_window = user.subscription_tier.refresh_cooldown();

        // Cheap read-side check first; the conditional update below is the
        // authoritative gate for requests that race past this one.
        if !cooldown::can_refresh(user.last_refresh_at, user.subscription_tier, now) {
            let seconds =
                cooldown::seconds_until_refresh(user.last_refresh_at, user.subscription_tier, now);

            tracing::debug!(
                "refresh denied for {} user {}: {}s of cooldown remaining",
                user.subscription_tier.to_str(),
                user_id,
                seconds
            );

            return Ok(RefreshOutcome {
                admitted: false,
                seconds_until_refresh: seconds,
                results: vec![],
            });
        }

        let admitted = self
            .db_client
            .begin_refresh(user_id, cooldown_window.num_seconds(), now)
            .await?;

        if admitted.is_none() {
            // Re-read so the countdown reflects whichever concurrent refresh
            // actually won the stamp.
            let user = self
                .db_client
                .get_user(user_id)
                .await?
                .ok_or(ServiceError::UserNotFound(user_id))?;
            let seconds = cooldown::seconds_until_refresh(
                user.last_refresh_at,
                user.subscription_tier,
                now,
            );

            tracing::debug!(
                "refresh lost the admission race for user {}: {}s of cooldown remaining",
                user_id,
                seconds
            );

            return Ok(RefreshOutcome {
                admitted: false,
                seconds_until_refresh: seconds,
                results: vec![],
            });
        }

        let expired = self.db_client.expire_stale_for_user(user_id, now).await?;
        if expired > 0 {
            tracing::debug!("expired {} stale recommendation(s) for user {}", expired, user_id);
        }

        let candidates = self.fetch_candidates(query).await?;

        let blocked: HashSet<String> = self
            .db_client
            .blocked_place_ids(user_id)
            .await?
            .into_iter()
            .collect();

        let ids: Vec<String> = candidates
            .iter()
            .map(|c| c.external_place_id.clone())
            .collect();
        let records: HashMap<String, TrackingRecord> = self
            .db_client
            .get_tracking_records(user_id, &ids)
            .await?
            .into_iter()
            .map(|r| (r.external_place_id.clone(), r))
            .collect();

        let eligible = filter_candidates(candidates, &blocked, &records, now, &self.windows);

        let mut results = Vec::new();
        for (candidate, score) in eligible.into_iter().take(self.max_results) {
            let record = self
                .db_client
                .upsert_shown(
                    user_id,
                    &candidate.external_place_id,
                    &candidate.name,
                    candidate.category.as_deref(),
                    &candidate.payload,
                    score,
                    now,
                )
                .await?;
            results.push(record);
        }

        tracing::info!(
            "refresh for user {}: returning {} recommendation(s)",
            user_id,
            results.len()
        );

        Ok(RefreshOutcome {
            admitted: true,
            seconds_until_refresh: 0,
            results,
        })
    }

    /// Apply a user interaction to the tracking record. Returns the record
    /// after the event where one exists; blocking a place that was never
    /// recommended succeeds with `None`.
    pub async fn record_interaction(
        &self,
        user_id: Uuid,
        external_place_id: &str,
        event: InteractionEvent,
        reason: Option<&str>,
    ) -> Result<Option<TrackingRecord>, ServiceError> {
        let now = Utc::now();

        match event {
            InteractionEvent::Viewed => {
                match self
                    .db_client
                    .mark_viewed(user_id, external_place_id, now)
                    .await?
                {
                    Some(record) => Ok(Some(record)),
                    None => self.existing_record_or_not_found(user_id, external_place_id).await,
                }
            }
            InteractionEvent::Accepted => {
                match self
                    .db_client
                    .record_response(
                        user_id,
                        external_place_id,
                        RecommendationStatus::Accepted,
                        None,
                        now,
                    )
                    .await?
                {
                    Some(record) => Ok(Some(record)),
                    None => self.existing_record_or_not_found(user_id, external_place_id).await,
                }
            }
            InteractionEvent::Declined => {
                match self
                    .db_client
                    .record_response(
                        user_id,
                        external_place_id,
                        RecommendationStatus::Declined,
                        reason,
                        now,
                    )
                    .await?
                {
                    Some(record) => Ok(Some(record)),
                    None => self.existing_record_or_not_found(user_id, external_place_id).await,
                }
            }
            InteractionEvent::Blocked => {
                let existing = self
                    .db_client
                    .get_tracking_record(user_id, external_place_id)
                    .await?;
                let place_name = existing.as_ref().map(|r| r.place_name.clone());

                self.db_client
                    .block_place(
                        user_id,
                        external_place_id,
                        place_name.as_deref(),
                        reason,
                        now,
                    )
                    .await?;

                let record = self
                    .db_client
                    .get_tracking_record(user_id, external_place_id)
                    .await?;
                Ok(record)
            }
        }
    }

    /// Remove the explicit block entry. The place can still be suppressed by
    /// a `not_interested` tracking row; the second flag reports that, so the
    /// client can tell "unblocked" from "unblocked but still hidden".
    pub async fn unblock(
        &self,
        user_id: Uuid,
        external_place_id: &str,
    ) -> Result<(bool, bool), ServiceError> {
        let removed = self
            .db_client
            .unblock_place(user_id, external_place_id)
            .await?;
        let still_suppressed = self
            .db_client
            .is_blocked(user_id, external_place_id)
            .await?;

        Ok((removed, still_suppressed))
    }

    pub async fn blocked_places(&self, user_id: Uuid) -> Result<Vec<BlockedPlace>, ServiceError> {
        let blocked = self.db_client.get_blocked_places(user_id).await?;
        Ok(blocked)
    }

    /// The guarded updates return None both for a missing row and for a row
    /// the guard refused to touch; only the former is an error.
    async fn existing_record_or_not_found(
        &self,
        user_id: Uuid,
        external_place_id: &str,
    ) -> Result<Option<TrackingRecord>, ServiceError> {
        match self
            .db_client
            .get_tracking_record(user_id, external_place_id)
            .await?
        {
            Some(record) => Ok(Some(record)),
            None => Err(ServiceError::TrackingRecordNotFound(
                user_id,
                external_place_id.to_string(),
            )),
        }
    }

    async fn fetch_candidates(
        &self,
        query: &PlaceQuery,
    ) -> Result<Vec<CandidatePlace>, ServiceError> {
        let key = query.cache_key();

        if let Some(cached) = self.get_cached_candidates(&key).await {
            return Ok(cached);
        }

        let fetched = self.places.search_nearby(query).await?;
        self.cache_candidates(&key, &fetched).await;

        Ok(fetched)
    }

    async fn get_cached_candidates(&self, key: &str) -> Option<Vec<CandidatePlace>> {
        let rc = self.db_client.redis_client.as_ref()?;
        let mut conn = ConnectionManager::clone(rc.as_ref());

        let cached: Result<Option<String>, redis::RedisError> =
            redis::cmd("GET").arg(key).query_async(&mut conn).await;

        if let Ok(Some(raw)) = cached {
            if let Ok(candidates) = serde_json::from_str::<Vec<CandidatePlace>>(&raw) {
                return Some(candidates);
            }
        }
        None
    }

    // Best-effort: a cache write failure is logged and forgotten.
    async fn cache_candidates(&self, key: &str, candidates: &[CandidatePlace]) {
        if let Some(rc) = &self.db_client.redis_client {
            let mut conn = ConnectionManager::clone(rc.as_ref());
            let payload = serde_json::to_string(candidates).unwrap_or_else(|_| "[]".to_string());

            let result: Result<(), redis::RedisError> = redis::cmd("SETEX")
                .arg(key)
                .arg(self.cache_ttl)
                .arg(&payload)
                .query_async(&mut conn)
                .await;

            if let Err(e) = result {
                tracing::warn!("failed to cache place candidates: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn candidate(id: &str, rating: Option<f64>, reviews: Option<i64>) -> CandidatePlace {
        CandidatePlace {
            external_place_id: id.to_string(),
            name: format!("Place {}", id),
            category: Some("cafe".to_string()),
            rating,
            user_ratings_total: reviews,
            payload: json!({"place_id": id}),
        }
    }

    fn record(
        id: &str,
        status: RecommendationStatus,
        last_shown_at: DateTime<Utc>,
    ) -> TrackingRecord {
        TrackingRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            external_place_id: id.to_string(),
            place_name: format!("Place {}", id),
            category: Some("cafe".to_string()),
            payload: json!({"place_id": id}),
            status,
            confidence_score: 0.5,
            last_shown_at,
            refresh_count: 1,
            block_reason: None,
            viewed_at: None,
            responded_at: None,
            decline_reason: None,
            created_at: last_shown_at,
            updated_at: last_shown_at,
            expires_at: last_shown_at + Duration::days(7),
        }
    }

    #[test]
    fn score_stays_in_unit_interval() {
        assert_eq!(score_candidate(&candidate("a", None, None)), 0.0);

        let perfect = score_candidate(&candidate("b", Some(5.0), Some(100_000)));
        assert!((perfect - 1.0).abs() < f64::EPSILON);

        let overrated = score_candidate(&candidate("c", Some(11.0), Some(-5)));
        assert!((0.0..=1.0).contains(&overrated));
    }

    #[test]
    fn higher_rating_and_volume_score_higher() {
        let busy = score_candidate(&candidate("a", Some(4.8), Some(900)));
        let quiet = score_candidate(&candidate("b", Some(3.1), Some(12)));
        assert!(busy > quiet);
    }

    #[test]
    fn filter_drops_blocked_and_duplicate_places() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let blocked: HashSet<String> = ["p2".to_string()].into_iter().collect();
        let records = HashMap::new();

        let result = filter_candidates(
            vec![
                candidate("p1", Some(4.0), Some(50)),
                candidate("p2", Some(5.0), Some(500)),
                candidate("p1", Some(4.0), Some(50)),
                candidate("p3", Some(3.0), Some(10)),
            ],
            &blocked,
            &records,
            now,
            &ResurfacingWindows::default(),
        );

        let ids: Vec<&str> = result.iter().map(|(c, _)| c.external_place_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
    }

    #[test]
    fn filter_respects_resurfacing_windows() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        let windows = ResurfacingWindows::default();
        let blocked = HashSet::new();

        let mut records = HashMap::new();
        // Declined yesterday: still quarantined.
        records.insert(
            "fresh-decline".to_string(),
            record("fresh-decline", RecommendationStatus::Declined, now - Duration::days(1)),
        );
        // Declined last week: eligible again.
        records.insert(
            "old-decline".to_string(),
            record("old-decline", RecommendationStatus::Declined, now - Duration::days(7)),
        );
        // Accepted: on the calendar, never again.
        records.insert(
            "accepted".to_string(),
            record("accepted", RecommendationStatus::Accepted, now - Duration::days(30)),
        );

        let result = filter_candidates(
            vec![
                candidate("fresh-decline", Some(5.0), Some(500)),
                candidate("old-decline", Some(4.0), Some(100)),
                candidate("accepted", Some(4.9), Some(400)),
                candidate("never-seen", Some(2.0), Some(5)),
            ],
            &blocked,
            &records,
            now,
            &windows,
        );

        let mut ids: Vec<&str> =
            result.iter().map(|(c, _)| c.external_place_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["never-seen", "old-decline"]);
    }

    #[test]
    fn filter_orders_best_first() {
        let now = Utc::now();
        let result = filter_candidates(
            vec![
                candidate("low", Some(2.0), Some(10)),
                candidate("high", Some(4.9), Some(800)),
                candidate("mid", Some(4.0), Some(60)),
            ],
            &HashSet::new(),
            &HashMap::new(),
            now,
            &ResurfacingWindows::default(),
        );

        let ids: Vec<&str> = result.iter().map(|(c, _)| c.external_place_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }
}
