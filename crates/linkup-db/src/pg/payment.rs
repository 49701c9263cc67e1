//! PostgreSQL payment repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use linkup_types::{PageRequest, Payment, PaymentId, PaymentOwner, UserId};

use crate::error::{DbError, DbResult};
use crate::models::{convert_all, PaymentRow};
use crate::repo::{CreatePayment, PaymentRepository, PaymentSettlement};

/// PostgreSQL payment repository
#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    /// Create a new payment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Split an owner into its (booking_id, sponsorship_id) columns
fn owner_columns(owner: PaymentOwner) -> (Option<Uuid>, Option<Uuid>) {
    match owner {
        PaymentOwner::Booking(id) => (Some(id.as_uuid()), None),
        PaymentOwner::Sponsorship(id) => (None, Some(id.as_uuid())),
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn find_by_id(&self, id: PaymentId) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, booking_id, sponsorship_id, user_id, amount_cents, transaction_id,
                   status, intent_id, payment_method_id, receipt_email, receipt_url,
                   currency, created_at, updated_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        payment.map(Payment::try_from).transpose()
    }

    async fn find_pending_for_owner(&self, owner: PaymentOwner) -> DbResult<Option<Payment>> {
        let (booking_id, sponsorship_id) = owner_columns(owner);

        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, booking_id, sponsorship_id, user_id, amount_cents, transaction_id,
                   status, intent_id, payment_method_id, receipt_email, receipt_url,
                   currency, created_at, updated_at
            FROM payments
            WHERE booking_id IS NOT DISTINCT FROM $1
              AND sponsorship_id IS NOT DISTINCT FROM $2
              AND status = 'PENDING'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(booking_id)
        .bind(sponsorship_id)
        .fetch_optional(&self.pool)
        .await?;

        payment.map(Payment::try_from).transpose()
    }

    async fn create(&self, payment: CreatePayment) -> DbResult<Payment> {
        let (booking_id, sponsorship_id) = owner_columns(payment.owner);

        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments (id, booking_id, sponsorship_id, user_id, amount_cents,
                                  transaction_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, booking_id, sponsorship_id, user_id, amount_cents, transaction_id,
                      status, intent_id, payment_method_id, receipt_email, receipt_url,
                      currency, created_at, updated_at
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(booking_id)
        .bind(sponsorship_id)
        .bind(payment.user_id.as_uuid())
        .bind(payment.amount_cents)
        .bind(&payment.transaction_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from_insert)?;

        Payment::try_from(row)
    }

    async fn settle(&self, id: PaymentId, settlement: PaymentSettlement) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $1,
                intent_id = $2,
                payment_method_id = COALESCE($3, payment_method_id),
                receipt_email = COALESCE($4, receipt_email),
                currency = COALESCE($5, currency),
                updated_at = NOW()
            WHERE id = $6 AND status = 'PENDING'
            "#,
        )
        .bind(settlement.status.as_str())
        .bind(&settlement.intent_id)
        .bind(&settlement.payment_method_id)
        .bind(&settlement.receipt_email)
        .bind(&settlement.currency)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_receipt_url(&self, id: PaymentId, receipt_url: &str) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE payments SET receipt_url = $1, updated_at = NOW() WHERE id = $2")
                .bind(receipt_url)
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_paid_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> DbResult<(Vec<Payment>, u64)> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, booking_id, sponsorship_id, user_id, amount_cents, transaction_id,
                   status, intent_id, payment_method_id, receipt_email, receipt_url,
                   currency, created_at, updated_at
            FROM payments
            WHERE user_id = $1 AND status = 'PAID'
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM payments WHERE user_id = $1 AND status = 'PAID'")
                .bind(user_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok((convert_all(rows)?, total.max(0) as u64))
    }

    async fn list_all(&self, page: PageRequest) -> DbResult<(Vec<Payment>, u64)> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, booking_id, sponsorship_id, user_id, amount_cents, transaction_id,
                   status, intent_id, payment_method_id, receipt_email, receipt_url,
                   currency, created_at, updated_at
            FROM payments
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await?;

        Ok((convert_all(rows)?, total.max(0) as u64))
    }
}
