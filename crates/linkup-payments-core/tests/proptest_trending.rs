//! Property tests for scoring and dashboard arithmetic

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use linkup_db::TrendingRow;
use linkup_payments_core::dashboard::{increase_percent, weekly_delta};
use linkup_payments_core::trending::{age_hours, rank, trending_score};

proptest! {
    #[test]
    fn score_decays_with_age(
        views in 0i64..10_000,
        bookings in 0i64..1_000,
        age in 0.0f64..5_000.0,
        extra in 0.1f64..500.0,
    ) {
        let fresh = trending_score(views, bookings, age);
        let older = trending_score(views, bookings, age + extra);
        prop_assert!(older <= fresh);
        prop_assert!(fresh >= 0.0);
    }

    #[test]
    fn booking_outweighs_view(
        views in 0i64..10_000,
        bookings in 0i64..1_000,
        age in 0.0f64..5_000.0,
    ) {
        let with_view = trending_score(views + 1, bookings, age);
        let with_booking = trending_score(views, bookings + 1, age);
        prop_assert!(with_booking > with_view);
    }

    #[test]
    fn rank_is_sorted_and_complete(
        rows in prop::collection::vec((0i64..500, 0i64..50, 0i64..720), 0..40),
    ) {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let rows: Vec<TrendingRow> = rows
            .into_iter()
            .map(|(views, bookings, hours_ago)| TrendingRow {
                event_id: Uuid::new_v4(),
                total_views: views,
                total_bookings: bookings,
                last_interaction: now - Duration::hours(hours_ago),
                event_end: now + Duration::days(1),
            })
            .collect();

        let ranked = rank(&rows, now);
        prop_assert_eq!(ranked.len(), rows.len());
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].event_id < pair[1].event_id);
            }
        }
    }

    #[test]
    fn weekly_delta_is_bounded_by_rule(total in 0i64..100_000, last_week in 0i64..100_000) {
        let delta = weekly_delta(total, last_week);
        if last_week == 0 || total - last_week <= 0 {
            prop_assert_eq!(delta, 100.0);
        } else {
            prop_assert!(delta >= 0.0);
            prop_assert!(delta <= 100.0 * last_week as f64);
        }
    }

    #[test]
    fn increase_sign_follows_direction(current in 0i64..10_000, previous in 1i64..10_000) {
        let change = increase_percent(current, previous);
        prop_assert_eq!(change > 0.0, current > previous);
        prop_assert_eq!(change == 0.0, current == previous);
    }

    #[test]
    fn increase_from_empty_week_is_flat(current in 0i64..10_000) {
        prop_assert_eq!(increase_percent(current, 0), 100.0);
    }
}

#[test]
fn test_example_score() {
    // 10 views, 2 bookings, last touched 2 hours ago: 20 / 4^1.5
    let score = trending_score(10, 2, 2.0);
    assert!((score - 2.5).abs() < 1e-9);
}

#[test]
fn test_future_interaction_has_zero_age() {
    let now = Utc::now();
    assert_eq!(age_hours(now + Duration::minutes(5), now), 0.0);
}
