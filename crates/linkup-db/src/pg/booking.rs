//! PostgreSQL booking repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use linkup_types::{Booking, BookingId, BookingStatus, EventId, PageRequest, PaymentId, UserId};

use crate::error::{DbError, DbResult};
use crate::models::{convert_all, BookingRow};
use crate::repo::{BookingRepository, CreateBooking};

/// PostgreSQL booking repository
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    /// Create a new booking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn find_by_id(&self, id: BookingId) -> DbResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, event_id, user_id, status, payment_id, created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        booking.map(Booking::try_from).transpose()
    }

    async fn find_for_user_event(
        &self,
        user_id: UserId,
        event_id: EventId,
        status: BookingStatus,
    ) -> DbResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, event_id, user_id, status, payment_id, created_at, updated_at
            FROM bookings
            WHERE user_id = $1 AND event_id = $2 AND status = $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(event_id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        booking.map(Booking::try_from).transpose()
    }

    async fn create(&self, booking: CreateBooking) -> DbResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (id, event_id, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, event_id, user_id, status, payment_id, created_at, updated_at
            "#,
        )
        .bind(booking.id.as_uuid())
        .bind(booking.event_id.as_uuid())
        .bind(booking.user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from_insert)?;

        Booking::try_from(row)
    }

    async fn set_payment(&self, id: BookingId, payment_id: PaymentId) -> DbResult<()> {
        sqlx::query("UPDATE bookings SET payment_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(payment_id.as_uuid())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn transition_from_pending(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> DbResult<bool> {
        // The confirmed-booking unique index can reject this when a second
        // pending booking for the same (user, event) gets paid.
        let result = sqlx::query(
            r#"
            UPDATE bookings SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = 'PENDING'
            "#,
        )
        .bind(status.as_str())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(DbError::from_insert)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_confirmed_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> DbResult<(Vec<Booking>, u64)> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT b.id, b.event_id, b.user_id, b.status, b.payment_id, b.created_at, b.updated_at
            FROM bookings b
            JOIN payments p ON p.id = b.payment_id
            WHERE b.user_id = $1 AND b.status = 'CONFIRMED' AND p.status = 'PAID'
            ORDER BY b.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM bookings b
            JOIN payments p ON p.id = b.payment_id
            WHERE b.user_id = $1 AND b.status = 'CONFIRMED' AND p.status = 'PAID'
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok((convert_all(rows)?, total.max(0) as u64))
    }
}
