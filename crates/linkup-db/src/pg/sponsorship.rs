//! PostgreSQL sponsorship repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use linkup_types::{
    EventId, PageRequest, PaymentId, PromotionKind, SponsorStatus, Sponsorship, SponsorshipId,
    UserId,
};

use crate::error::{DbError, DbResult};
use crate::models::{convert_all, SponsorshipRow};
use crate::repo::{CreateSponsorship, SponsorshipRepository};

/// PostgreSQL sponsorship repository
#[derive(Clone)]
pub struct PgSponsorshipRepository {
    pool: PgPool,
}

impl PgSponsorshipRepository {
    /// Create a new sponsorship repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SponsorshipRepository for PgSponsorshipRepository {
    async fn find_by_id(&self, id: SponsorshipId) -> DbResult<Option<Sponsorship>> {
        let row = sqlx::query_as::<_, SponsorshipRow>(
            r#"
            SELECT id, event_id, user_id, package_id, payment_id, kind, status, amount_cents,
                   currency, start_date, end_date, created_at
            FROM sponsorships
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Sponsorship::try_from).transpose()
    }

    async fn find_pending(
        &self,
        user_id: UserId,
        event_id: EventId,
        kind: PromotionKind,
    ) -> DbResult<Option<Sponsorship>> {
        let row = sqlx::query_as::<_, SponsorshipRow>(
            r#"
            SELECT id, event_id, user_id, package_id, payment_id, kind, status, amount_cents,
                   currency, start_date, end_date, created_at
            FROM sponsorships
            WHERE user_id = $1 AND event_id = $2 AND kind = $3 AND status = 'PENDING'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(event_id.as_uuid())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Sponsorship::try_from).transpose()
    }

    async fn find_active(
        &self,
        user_id: UserId,
        event_id: EventId,
        kind: PromotionKind,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Sponsorship>> {
        let row = sqlx::query_as::<_, SponsorshipRow>(
            r#"
            SELECT id, event_id, user_id, package_id, payment_id, kind, status, amount_cents,
                   currency, start_date, end_date, created_at
            FROM sponsorships
            WHERE user_id = $1 AND event_id = $2 AND kind = $3
              AND status = 'APPROVED' AND end_date > $4
            ORDER BY end_date DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(event_id.as_uuid())
        .bind(kind.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Sponsorship::try_from).transpose()
    }

    async fn create(&self, sponsorship: CreateSponsorship) -> DbResult<Sponsorship> {
        let row = sqlx::query_as::<_, SponsorshipRow>(
            r#"
            INSERT INTO sponsorships (id, event_id, user_id, package_id, kind, amount_cents)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, event_id, user_id, package_id, payment_id, kind, status, amount_cents,
                      currency, start_date, end_date, created_at
            "#,
        )
        .bind(sponsorship.id.as_uuid())
        .bind(sponsorship.event_id.as_uuid())
        .bind(sponsorship.user_id.as_uuid())
        .bind(sponsorship.package_id.as_uuid())
        .bind(sponsorship.kind.as_str())
        .bind(sponsorship.amount_cents)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from_insert)?;

        Sponsorship::try_from(row)
    }

    async fn set_payment(&self, id: SponsorshipId, payment_id: PaymentId) -> DbResult<()> {
        sqlx::query("UPDATE sponsorships SET payment_id = $1 WHERE id = $2")
            .bind(payment_id.as_uuid())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn approve(
        &self,
        id: SponsorshipId,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        currency: Option<&str>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sponsorships
            SET status = 'APPROVED', start_date = $1, end_date = $2,
                currency = COALESCE($3, currency)
            WHERE id = $4 AND status = 'PENDING'
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(currency)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn transition_from_pending(
        &self,
        id: SponsorshipId,
        status: SponsorStatus,
    ) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE sponsorships SET status = $1 WHERE id = $2 AND status = 'PENDING'")
                .bind(status.as_str())
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_lapsed(
        &self,
        kind: PromotionKind,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<Sponsorship>> {
        let rows = sqlx::query_as::<_, SponsorshipRow>(
            r#"
            SELECT id, event_id, user_id, package_id, payment_id, kind, status, amount_cents,
                   currency, start_date, end_date, created_at
            FROM sponsorships
            WHERE kind = $1 AND status = 'APPROVED' AND end_date <= $2
            "#,
        )
        .bind(kind.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn has_active_on_event(
        &self,
        event_id: EventId,
        kind: PromotionKind,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sponsorships
                WHERE event_id = $1 AND kind = $2 AND status = 'APPROVED' AND end_date > $3
            )
            "#,
        )
        .bind(event_id.as_uuid())
        .bind(kind.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn mark_expired(&self, ids: &[SponsorshipId]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<Uuid> = ids.iter().map(SponsorshipId::as_uuid).collect();

        let result = sqlx::query(
            "UPDATE sponsorships SET status = 'EXPIRED' WHERE id = ANY($1) AND status = 'APPROVED'",
        )
        .bind(&ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_active(
        &self,
        kind: PromotionKind,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> DbResult<(Vec<Sponsorship>, u64)> {
        let rows = sqlx::query_as::<_, SponsorshipRow>(
            r#"
            SELECT id, event_id, user_id, package_id, payment_id, kind, status, amount_cents,
                   currency, start_date, end_date, created_at
            FROM sponsorships
            WHERE kind = $1 AND status = 'APPROVED' AND end_date > $2
            ORDER BY end_date DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(kind.as_str())
        .bind(now)
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM sponsorships
            WHERE kind = $1 AND status = 'APPROVED' AND end_date > $2
            "#,
        )
        .bind(kind.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok((convert_all(rows)?, total.max(0) as u64))
    }

    async fn sample_active(
        &self,
        kind: PromotionKind,
        now: DateTime<Utc>,
        size: u32,
    ) -> DbResult<Vec<Sponsorship>> {
        let rows = sqlx::query_as::<_, SponsorshipRow>(
            r#"
            SELECT s.id, s.event_id, s.user_id, s.package_id, s.payment_id, s.kind, s.status,
                   s.amount_cents, s.currency, s.start_date, s.end_date, s.created_at
            FROM sponsorships s
            JOIN payments p ON p.id = s.payment_id
            WHERE s.kind = $1 AND s.status = 'APPROVED' AND s.end_date > $2
              AND p.status = 'PAID'
            ORDER BY random()
            LIMIT $3
            "#,
        )
        .bind(kind.as_str())
        .bind(now)
        .bind(i64::from(size))
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }
}
