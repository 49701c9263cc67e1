//! PostgreSQL reporting queries

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use linkup_types::{EventId, PromotionKind, Sponsorship, UserId};

use crate::error::DbResult;
use crate::models::{convert_all, SponsorshipRow};
use crate::repo::{
    AnalyticsRepository, CountSubject, HostRevenue, MonthlyRevenue, PurchaseTotals, RevenueSource,
};

/// PostgreSQL analytics repository
#[derive(Clone)]
pub struct PgAnalyticsRepository {
    pool: PgPool,
}

impl PgAnalyticsRepository {
    /// Create a new analytics repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalyticsRepository for PgAnalyticsRepository {
    async fn count(&self, subject: CountSubject, since: Option<DateTime<Utc>>) -> DbResult<i64> {
        let sql = match subject {
            CountSubject::Events => {
                "SELECT COUNT(*) FROM events WHERE ($1::timestamptz IS NULL OR created_at >= $1)"
            }
            CountSubject::Users => {
                "SELECT COUNT(*) FROM users WHERE ($1::timestamptz IS NULL OR created_at >= $1)"
            }
            CountSubject::ApprovedSponsorships => {
                r#"
                SELECT COUNT(*) FROM sponsorships
                WHERE status = 'APPROVED' AND ($1::timestamptz IS NULL OR created_at >= $1)
                "#
            }
        };

        let (count,): (i64,) = sqlx::query_as(sql)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn confirmed_booking_revenue(&self, since: Option<DateTime<Utc>>) -> DbResult<i64> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(p.amount_cents), 0)::BIGINT
            FROM bookings b
            JOIN payments p ON p.id = b.payment_id
            WHERE b.status = 'CONFIRMED'
              AND ($1::timestamptz IS NULL OR b.created_at >= $1)
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn top_hosts(&self, limit: u32) -> DbResult<Vec<HostRevenue>> {
        let rows: Vec<(Uuid, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT u.id, u.full_name,
                   (SELECT COUNT(*) FROM events e WHERE e.host_id = u.id) AS event_count,
                   COALESCE((
                       SELECT SUM(p.amount_cents)
                       FROM bookings b
                       JOIN events e ON e.id = b.event_id
                       JOIN payments p ON p.id = b.payment_id
                       WHERE e.host_id = u.id AND b.status = 'CONFIRMED'
                   ), 0)::BIGINT AS total_revenue
            FROM users u
            WHERE EXISTS (SELECT 1 FROM events e WHERE e.host_id = u.id)
            ORDER BY total_revenue DESC, u.id
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, full_name, event_count, total_revenue_cents)| HostRevenue {
                host_id: UserId(id),
                full_name,
                event_count,
                total_revenue_cents,
            })
            .collect())
    }

    async fn monthly_revenue(
        &self,
        source: RevenueSource,
        since: DateTime<Utc>,
    ) -> DbResult<Vec<MonthlyRevenue>> {
        let sql = match source {
            RevenueSource::Booking => {
                r#"
                SELECT EXTRACT(MONTH FROM created_at)::INT AS month,
                       SUM(amount_cents)::BIGINT AS total
                FROM payments
                WHERE status = 'PAID' AND booking_id IS NOT NULL AND created_at >= $1
                GROUP BY 1
                ORDER BY 1
                "#
            }
            RevenueSource::Sponsorship => {
                r#"
                SELECT EXTRACT(MONTH FROM start_date)::INT AS month,
                       SUM(amount_cents)::BIGINT AS total
                FROM sponsorships
                WHERE status = 'APPROVED' AND start_date >= $1
                GROUP BY 1
                ORDER BY 1
                "#
            }
        };

        let rows: Vec<(i32, i64)> = sqlx::query_as(sql)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(month, total_cents)| {
                u32::try_from(month)
                    .ok()
                    .map(|month| MonthlyRevenue { month, total_cents })
            })
            .collect())
    }

    async fn approved_sponsorships_between(
        &self,
        kind: PromotionKind,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Sponsorship>> {
        let rows = sqlx::query_as::<_, SponsorshipRow>(
            r#"
            SELECT id, event_id, user_id, package_id, payment_id, kind, status, amount_cents,
                   currency, start_date, end_date, created_at
            FROM sponsorships
            WHERE kind = $1 AND status = 'APPROVED' AND created_at >= $2
              AND ($3::timestamptz IS NULL OR created_at < $3)
            "#,
        )
        .bind(kind.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn confirmed_bookings_between(
        &self,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<PurchaseTotals> {
        let (count, revenue_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(p.amount_cents), 0)::BIGINT
            FROM bookings b
            LEFT JOIN payments p ON p.id = b.payment_id
            WHERE b.status = 'CONFIRMED' AND b.created_at >= $1
              AND ($2::timestamptz IS NULL OR b.created_at < $2)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(PurchaseTotals {
            count,
            revenue_cents,
        })
    }

    async fn top_booked_event(
        &self,
        among: Option<&[EventId]>,
        confirmed_only: bool,
    ) -> DbResult<Option<String>> {
        let among: Option<Vec<Uuid>> = among.map(|ids| ids.iter().map(EventId::as_uuid).collect());

        let title: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT e.title
            FROM bookings b
            JOIN events e ON e.id = b.event_id
            WHERE ($1::uuid[] IS NULL OR b.event_id = ANY($1))
              AND (NOT $2 OR b.status = 'CONFIRMED')
            GROUP BY e.id, e.title
            ORDER BY COUNT(*) DESC, e.id
            LIMIT 1
            "#,
        )
        .bind(among)
        .bind(confirmed_only)
        .fetch_optional(&self.pool)
        .await?;

        Ok(title.map(|(title,)| title))
    }
}
