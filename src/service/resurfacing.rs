use chrono::{DateTime, Duration, Utc};

use crate::models::trackingmodel::{RecommendationStatus, TrackingRecord};

/// Quarantine windows before a previously surfaced place may be offered
/// again. A decline is an explicit "no", but preferences drift, so it earns
/// a shorter window than silently ignoring or letting the card expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResurfacingWindows {
    pub declined: Duration,
    pub ignored: Duration,
}

impl Default for ResurfacingWindows {
    fn default() -> Self {
        Self {
            declined: Duration::days(3),
            ignored: Duration::days(7),
        }
    }
}

/// Decide whether a tracked place is eligible to be shown again at `now`.
///
/// Pure over (record, now, windows): no clock reads, no mutation. The
/// orchestrator takes the timestamp once per request and threads it through.
pub fn is_resurfaceable(
    record: &TrackingRecord,
    now: DateTime<Utc>,
    windows: &ResurfacingWindows,
) -> bool {
    let elapsed = now.signed_duration_since(record.last_shown_at);

    match record.status {
        // Already scheduled or permanently suppressed.
        RecommendationStatus::Accepted | RecommendationStatus::NotInterested => false,
        // A pending card is still live in the current feed.
        RecommendationStatus::Pending => false,
        RecommendationStatus::Declined => elapsed >= windows.declined,
        RecommendationStatus::Viewed | RecommendationStatus::Expired => {
            elapsed >= windows.ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use uuid::Uuid;

    fn record(status: RecommendationStatus, last_shown_at: DateTime<Utc>) -> TrackingRecord {
        TrackingRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            external_place_id: "place-abc".to_string(),
            place_name: "Corner Cafe".to_string(),
            category: Some("cafe".to_string()),
            payload: json!({"name": "Corner Cafe"}),
            status,
            confidence_score: 0.8,
            last_shown_at,
            refresh_count: 0,
            block_reason: None,
            viewed_at: None,
            responded_at: None,
            decline_reason: None,
            created_at: last_shown_at,
            updated_at: last_shown_at,
            expires_at: last_shown_at + Duration::days(7),
        }
    }

    fn defaults() -> ResurfacingWindows {
        ResurfacingWindows::default()
    }

    #[test]
    fn terminal_statuses_never_resurface() {
        let shown = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let far_future = shown + Duration::days(3650);

        let accepted = record(RecommendationStatus::Accepted, shown);
        let blocked = record(RecommendationStatus::NotInterested, shown);

        assert!(!is_resurfaceable(&accepted, far_future, &defaults()));
        assert!(!is_resurfaceable(&blocked, far_future, &defaults()));
    }

    #[test]
    fn pending_is_live_not_a_candidate() {
        let shown = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rec = record(RecommendationStatus::Pending, shown);

        assert!(!is_resurfaceable(&rec, shown + Duration::days(30), &defaults()));
    }

    #[test]
    fn declined_boundary_is_exact() {
        let shown = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rec = record(RecommendationStatus::Declined, shown);

        assert!(!is_resurfaceable(&rec, shown, &defaults()));
        assert!(!is_resurfaceable(
            &rec,
            shown + Duration::days(3) - Duration::seconds(1),
            &defaults()
        ));
        assert!(is_resurfaceable(&rec, shown + Duration::days(3), &defaults()));
        assert!(is_resurfaceable(
            &rec,
            shown + Duration::days(3) + Duration::seconds(1),
            &defaults()
        ));
    }

    #[test]
    fn ignored_boundary_is_exact() {
        let shown = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        for status in [RecommendationStatus::Viewed, RecommendationStatus::Expired] {
            let rec = record(status, shown);
            assert!(!is_resurfaceable(
                &rec,
                shown + Duration::days(7) - Duration::seconds(1),
                &defaults()
            ));
            assert!(is_resurfaceable(&rec, shown + Duration::days(7), &defaults()));
        }
    }

    #[test]
    fn declined_place_comes_back_after_three_days() {
        // Declined on Jan 1st midnight: still quarantined one second before
        // Jan 4th midnight, eligible one second after.
        let shown = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rec = record(RecommendationStatus::Declined, shown);

        let before = Utc.with_ymd_and_hms(2024, 1, 3, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 1).unwrap();

        assert!(!is_resurfaceable(&rec, before, &defaults()));
        assert!(is_resurfaceable(&rec, after, &defaults()));
    }

    #[test]
    fn same_inputs_same_answer() {
        let shown = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rec = record(RecommendationStatus::Declined, shown);
        let now = shown + Duration::days(5);

        let first = is_resurfaceable(&rec, now, &defaults());
        let second = is_resurfaceable(&rec, now, &defaults());
        assert_eq!(first, second);
        assert_eq!(rec.status, RecommendationStatus::Declined);
    }

    #[test]
    fn custom_windows_override_defaults() {
        let shown = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rec = record(RecommendationStatus::Declined, shown);
        let windows = ResurfacingWindows {
            declined: Duration::hours(12),
            ignored: Duration::days(2),
        };

        assert!(is_resurfaceable(&rec, shown + Duration::hours(12), &windows));
        assert!(!is_resurfaceable(&rec, shown + Duration::hours(11), &windows));
    }
}
