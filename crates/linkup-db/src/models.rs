//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.
//! Statuses are stored as text and converted to their domain enums with
//! `TryFrom`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use linkup_types::{
    Booking, BookingId, Event, EventId, PackageId, Payment, PaymentId, PaymentOwner, Sponsorship,
    SponsorshipId, SponsorshipPackage, User, UserId,
};

use crate::error::DbError;

/// User row from the database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub payout_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Event row from the database
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub venue: String,
    pub images: Vec<String>,
    pub price_cents: i64,
    pub visibility: String,
    pub boosted: bool,
    pub event_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Booking row from the database
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payment row from the database
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub sponsorship_id: Option<Uuid>,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub transaction_id: String,
    pub status: String,
    pub intent_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub receipt_email: Option<String>,
    pub receipt_url: Option<String>,
    pub currency: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sponsorship package row from the database
#[derive(Debug, Clone, FromRow)]
pub struct PackageRow {
    pub id: Uuid,
    pub title: String,
    pub benefits: Vec<String>,
    pub price_cents: i64,
    pub kind: String,
    pub duration_days: i32,
    pub created_at: DateTime<Utc>,
}

/// Sponsorship row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SponsorshipRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub package_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub kind: String,
    pub status: String,
    pub amount_cents: i64,
    pub currency: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Trending counters joined with the event's end time
#[derive(Debug, Clone, FromRow)]
pub struct TrendingRow {
    pub event_id: Uuid,
    pub total_views: i64,
    pub total_bookings: i64,
    pub last_interaction: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId(row.id),
            full_name: row.full_name,
            email: row.email,
            role: row.role.parse()?,
            is_verified: row.is_verified,
            payout_account_id: row.payout_account_id,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<EventRow> for Event {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EventId(row.id),
            host_id: UserId(row.host_id),
            title: row.title,
            venue: row.venue,
            images: row.images,
            price_cents: row.price_cents,
            visibility: row.visibility.parse()?,
            boosted: row.boosted,
            event_start: row.event_start,
            event_end: row.event_end,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: BookingId(row.id),
            event_id: EventId(row.event_id),
            user_id: UserId(row.user_id),
            status: row.status.parse()?,
            payment_id: row.payment_id.map(PaymentId),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let owner = match (row.booking_id, row.sponsorship_id) {
            (Some(b), None) => PaymentOwner::Booking(BookingId(b)),
            (None, Some(s)) => PaymentOwner::Sponsorship(SponsorshipId(s)),
            _ => {
                return Err(DbError::Decode(format!(
                    "payment {} must reference exactly one owner",
                    row.id
                )))
            }
        };

        Ok(Self {
            id: PaymentId(row.id),
            owner,
            user_id: UserId(row.user_id),
            amount_cents: row.amount_cents,
            transaction_id: row.transaction_id,
            status: row.status.parse()?,
            intent_id: row.intent_id,
            payment_method_id: row.payment_method_id,
            receipt_email: row.receipt_email,
            receipt_url: row.receipt_url,
            currency: row.currency,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<PackageRow> for SponsorshipPackage {
    type Error = DbError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PackageId(row.id),
            title: row.title,
            benefits: row.benefits,
            price_cents: row.price_cents,
            kind: row.kind.parse()?,
            duration_days: row.duration_days,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<SponsorshipRow> for Sponsorship {
    type Error = DbError;

    fn try_from(row: SponsorshipRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SponsorshipId(row.id),
            event_id: EventId(row.event_id),
            user_id: UserId(row.user_id),
            package_id: PackageId(row.package_id),
            payment_id: row.payment_id.map(PaymentId),
            kind: row.kind.parse()?,
            status: row.status.parse()?,
            amount_cents: row.amount_cents,
            currency: row.currency,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
        })
    }
}

/// Convert a batch of rows, failing on the first bad one
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DbError>
where
    T: TryFrom<R, Error = DbError>,
{
    rows.into_iter().map(T::try_from).collect()
}
