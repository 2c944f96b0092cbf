use chrono::{DateTime, Utc};

use crate::models::usermodel::SubscriptionTier;

/// Whether a refresh request may be admitted at `now`. A user that has never
/// refreshed is always admitted; premium has no cooldown at all.
///
/// This is the read-only half of the gate. Admission that actually counts is
/// the conditional update in `UserExt::begin_refresh`, which applies the same
/// predicate and stamps `last_refresh_at` in one statement.
pub fn can_refresh(
    last_refresh_at: Option<DateTime<Utc>>,
    tier: SubscriptionTier,
    now: DateTime<Utc>,
) -> bool {
    let cooldown = tier.refresh_cooldown();
    if cooldown.is_zero() {
        return true;
    }

    match last_refresh_at {
        None => true,
        Some(last) => now.signed_duration_since(last) >= cooldown,
    }
}

/// Exact whole seconds until the next refresh is allowed; 0 when already
/// eligible.
pub fn seconds_until_refresh(
    last_refresh_at: Option<DateTime<Utc>>,
    tier: SubscriptionTier,
    now: DateTime<Utc>,
) -> i64 {
    let cooldown = tier.refresh_cooldown();
    if cooldown.is_zero() {
        return 0;
    }

    match last_refresh_at {
        None => 0,
        Some(last) => (last + cooldown - now).num_seconds().max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn free_tier_four_hour_boundary() {
        let last = t0();

        assert!(!can_refresh(Some(last), SubscriptionTier::Free, last));
        assert!(!can_refresh(
            Some(last),
            SubscriptionTier::Free,
            last + Duration::hours(3) + Duration::minutes(59)
        ));
        assert!(can_refresh(
            Some(last),
            SubscriptionTier::Free,
            last + Duration::hours(4)
        ));
    }

    #[test]
    fn plus_tier_one_hour_boundary() {
        let last = t0();

        assert!(!can_refresh(
            Some(last),
            SubscriptionTier::Plus,
            last + Duration::minutes(59)
        ));
        assert!(can_refresh(
            Some(last),
            SubscriptionTier::Plus,
            last + Duration::hours(1)
        ));
    }

    #[test]
    fn premium_never_waits() {
        let last = t0();

        assert!(can_refresh(Some(last), SubscriptionTier::Premium, last));
        assert!(can_refresh(
            Some(last),
            SubscriptionTier::Premium,
            last + Duration::seconds(1)
        ));
        assert_eq!(
            seconds_until_refresh(Some(last), SubscriptionTier::Premium, last),
            0
        );
    }

    #[test]
    fn first_refresh_is_always_admitted() {
        assert!(can_refresh(None, SubscriptionTier::Free, t0()));
        assert_eq!(seconds_until_refresh(None, SubscriptionTier::Free, t0()), 0);
    }

    #[test]
    fn remaining_seconds_are_exact() {
        let last = t0();

        assert_eq!(
            seconds_until_refresh(Some(last), SubscriptionTier::Free, last + Duration::hours(1)),
            10800
        );
        assert_eq!(
            seconds_until_refresh(Some(last), SubscriptionTier::Free, last),
            14400
        );
        assert_eq!(
            seconds_until_refresh(Some(last), SubscriptionTier::Free, last + Duration::hours(5)),
            0
        );
    }
}
