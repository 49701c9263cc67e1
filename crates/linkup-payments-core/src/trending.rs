//! Trending events
//!
//! `score = (views + 5 * bookings) / (age_hours + 2)^1.5` where `age_hours`
//! is the time since the event's last view or booking.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, instrument};

use linkup_db::TrendingRow;
use linkup_types::{Event, EventId, Page, PageRequest};

use crate::error::{PaymentsError, PaymentsResult};
use crate::ledger::Ledger;

/// Weight of one booking relative to one view
pub const BOOKING_WEIGHT: f64 = 5.0;
/// Hours added to the age so fresh events do not divide by zero
pub const AGE_OFFSET_HOURS: f64 = 2.0;
/// Decay exponent
pub const GRAVITY: f64 = 1.5;

/// Trending score for the given counters
pub fn trending_score(views: i64, bookings: i64, age_hours: f64) -> f64 {
    let interactions = views as f64 + BOOKING_WEIGHT * bookings as f64;
    interactions / (age_hours.max(0.0) + AGE_OFFSET_HOURS).powf(GRAVITY)
}

/// Hours between `last_interaction` and `now`, clamped at zero
pub fn age_hours(last_interaction: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - last_interaction).num_milliseconds().max(0);
    millis as f64 / 3_600_000.0
}

/// A scored counter row
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredEvent {
    pub event_id: EventId,
    pub score: f64,
    pub total_views: i64,
    pub total_bookings: i64,
    pub last_interaction: DateTime<Utc>,
}

/// Score rows at `now` and order them best first, ties by event id
pub fn rank(rows: &[TrendingRow], now: DateTime<Utc>) -> Vec<ScoredEvent> {
    let mut scored: Vec<ScoredEvent> = rows
        .iter()
        .map(|row| ScoredEvent {
            event_id: EventId(row.event_id),
            score: trending_score(
                row.total_views,
                row.total_bookings,
                age_hours(row.last_interaction, now),
            ),
            total_views: row.total_views,
            total_bookings: row.total_bookings,
            last_interaction: row.last_interaction,
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.event_id.cmp(&b.event_id))
    });
    scored
}

/// A trending listing entry
#[derive(Debug, Clone, Serialize)]
pub struct TrendingEvent {
    pub event: Event,
    pub score: f64,
    pub total_views: i64,
    pub total_bookings: i64,
}

/// Trending listing and interaction tracking
#[derive(Clone)]
pub struct TrendingService {
    ledger: Ledger,
}

impl TrendingService {
    /// Create a new trending service
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Upcoming events ranked by score at `now`
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> PaymentsResult<Page<TrendingEvent>> {
        let rows = self.ledger.trending.list_upcoming(now).await?;
        let ranked = rank(&rows, now);
        let total = ranked.len() as u64;

        let window: Vec<ScoredEvent> = ranked
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .collect();

        let events = try_join_all(
            window
                .iter()
                .map(|scored| self.ledger.events.find_by_id(scored.event_id)),
        )
        .await?;

        let data = window
            .into_iter()
            .zip(events)
            .filter_map(|(scored, event)| {
                let event = event?;
                Some(TrendingEvent {
                    event,
                    score: scored.score,
                    total_views: scored.total_views,
                    total_bookings: scored.total_bookings,
                })
            })
            .collect();

        Ok(Page::new(page, total, data))
    }

    /// Count a view of an existing event
    #[instrument(skip(self))]
    pub async fn record_view(&self, event_id: EventId, now: DateTime<Utc>) -> PaymentsResult<()> {
        if self.ledger.events.find_by_id(event_id).await?.is_none() {
            return Err(PaymentsError::NotFound("event"));
        }
        self.ledger.trending.record_view(event_id, now).await?;
        debug!(event = %event_id, "View recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn row(id: u128, views: i64, bookings: i64, last: DateTime<Utc>) -> TrendingRow {
        TrendingRow {
            event_id: Uuid::from_u128(id),
            total_views: views,
            total_bookings: bookings,
            last_interaction: last,
            event_end: last + Duration::days(30),
        }
    }

    #[test]
    fn test_known_score() {
        let score = trending_score(10, 2, 0.0);
        assert!((score - 7.0711).abs() < 1e-3);
    }

    #[test]
    fn test_zero_interactions_score_zero() {
        assert_eq!(trending_score(0, 0, 5.0), 0.0);
    }

    #[test]
    fn test_age_hours_clamps_future() {
        let now = Utc::now();
        assert_eq!(age_hours(now + Duration::hours(1), now), 0.0);
        assert!((age_hours(now - Duration::minutes(90), now) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_rank_orders_by_score_then_id() {
        let now = Utc::now();
        let rows = vec![
            row(3, 10, 0, now),
            row(1, 10, 0, now),
            row(2, 0, 5, now),
            row(4, 100, 0, now - Duration::days(10)),
        ];

        let ranked = rank(&rows, now);
        let ids: Vec<u128> = ranked.iter().map(|s| s.event_id.0.as_u128()).collect();
        // 25 interactions beats 10; equal scores fall back to id order
        assert_eq!(ids, vec![2, 1, 3, 4]);
    }
}
