//! PostgreSQL event repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use linkup_types::{Event, EventId, JoinApproval, UserId};

use crate::error::{DbError, DbResult};
use crate::models::EventRow;
use crate::repo::{CreateEvent, EventRepository};

/// PostgreSQL event repository
#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Create a new event repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn find_by_id(&self, id: EventId) -> DbResult<Option<Event>> {
        let event = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, host_id, title, venue, images, price_cents, visibility, boosted,
                   event_start, event_end, created_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        event.map(Event::try_from).transpose()
    }

    async fn create(&self, event: CreateEvent) -> DbResult<Event> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events (id, host_id, title, venue, images, price_cents, visibility,
                                event_start, event_end)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, host_id, title, venue, images, price_cents, visibility, boosted,
                      event_start, event_end, created_at
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.host_id.as_uuid())
        .bind(&event.title)
        .bind(&event.venue)
        .bind(&event.images)
        .bind(event.price_cents)
        .bind(event.visibility.as_str())
        .bind(event.event_start)
        .bind(event.event_end)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from_insert)?;

        Event::try_from(row)
    }

    async fn set_boosted(&self, id: EventId, boosted: bool) -> DbResult<()> {
        sqlx::query("UPDATE events SET boosted = $1 WHERE id = $2")
            .bind(boosted)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn clear_boosted(&self, ids: &[EventId]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = ids.iter().map(EventId::as_uuid).collect();

        let result = sqlx::query("UPDATE events SET boosted = FALSE WHERE id = ANY($1) AND boosted")
            .bind(&ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn create_join_request(
        &self,
        event_id: EventId,
        user_id: UserId,
        approval: JoinApproval,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO event_join_requests (id, event_id, user_id, approval)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(approval.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn has_approved_join_request(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> DbResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM event_join_requests
                WHERE event_id = $1 AND user_id = $2 AND approval = 'APPROVED'
            )
            "#,
        )
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
