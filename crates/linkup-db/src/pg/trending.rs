//! PostgreSQL trending counters implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use linkup_types::EventId;

use crate::error::DbResult;
use crate::models::TrendingRow;
use crate::repo::TrendingRepository;

/// PostgreSQL trending repository
#[derive(Clone)]
pub struct PgTrendingRepository {
    pool: PgPool,
}

impl PgTrendingRepository {
    /// Create a new trending repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn bump(
        &self,
        event_id: EventId,
        views: i64,
        bookings: i64,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO trending_events (event_id, total_views, total_bookings, last_interaction)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id)
            DO UPDATE SET total_views = trending_events.total_views + EXCLUDED.total_views,
                          total_bookings = trending_events.total_bookings + EXCLUDED.total_bookings,
                          last_interaction = GREATEST(trending_events.last_interaction,
                                                      EXCLUDED.last_interaction)
            "#,
        )
        .bind(event_id.as_uuid())
        .bind(views)
        .bind(bookings)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl TrendingRepository for PgTrendingRepository {
    async fn record_view(&self, event_id: EventId, at: DateTime<Utc>) -> DbResult<()> {
        self.bump(event_id, 1, 0, at).await
    }

    async fn record_booking(&self, event_id: EventId, at: DateTime<Utc>) -> DbResult<()> {
        self.bump(event_id, 0, 1, at).await
    }

    async fn list_upcoming(&self, now: DateTime<Utc>) -> DbResult<Vec<TrendingRow>> {
        let rows = sqlx::query_as::<_, TrendingRow>(
            r#"
            SELECT t.event_id, t.total_views, t.total_bookings, t.last_interaction, e.event_end
            FROM trending_events t
            JOIN events e ON e.id = t.event_id
            WHERE e.event_end >= $1
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
