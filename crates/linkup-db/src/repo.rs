//! Repository traits
//!
//! Define async repository interfaces for database operations.
//!
//! Status-changing writes are guarded: they only apply when the record is
//! still in the expected source status and report whether a row changed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use linkup_types::{
    Booking, BookingId, BookingStatus, Event, EventId, EventVisibility, JoinApproval, PackageId,
    PageRequest, Payment, PaymentId, PaymentOwner, PaymentStatus, PromotionKind, Role,
    SponsorStatus, Sponsorship, SponsorshipId, SponsorshipPackage, User, UserId,
};

use crate::error::DbResult;
use crate::models::TrendingRow;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: UserId) -> DbResult<Option<User>>;

    /// Create a new user
    async fn create(&self, user: CreateUser) -> DbResult<User>;
}

/// Create user input
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: UserId,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub payout_account_id: Option<String>,
}

/// Event repository trait
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Find an event by ID
    async fn find_by_id(&self, id: EventId) -> DbResult<Option<Event>>;

    /// Create a new event
    async fn create(&self, event: CreateEvent) -> DbResult<Event>;

    /// Set or clear the boosted flag
    async fn set_boosted(&self, id: EventId, boosted: bool) -> DbResult<()>;

    /// Clear the boosted flag on many events, returning how many changed
    async fn clear_boosted(&self, ids: &[EventId]) -> DbResult<u64>;

    /// Record a join request for a private event
    async fn create_join_request(
        &self,
        event_id: EventId,
        user_id: UserId,
        approval: JoinApproval,
    ) -> DbResult<()>;

    /// Whether the user holds an approved join request for the event
    async fn has_approved_join_request(&self, event_id: EventId, user_id: UserId)
        -> DbResult<bool>;
}

/// Create event input
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub id: EventId,
    pub host_id: UserId,
    pub title: String,
    pub venue: String,
    pub images: Vec<String>,
    pub price_cents: i64,
    pub visibility: EventVisibility,
    pub event_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
}

/// Booking repository trait
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Find a booking by ID
    async fn find_by_id(&self, id: BookingId) -> DbResult<Option<Booking>>;

    /// Find the most recent booking of a user for an event with the given status
    async fn find_for_user_event(
        &self,
        user_id: UserId,
        event_id: EventId,
        status: BookingStatus,
    ) -> DbResult<Option<Booking>>;

    /// Create a new pending booking
    async fn create(&self, booking: CreateBooking) -> DbResult<Booking>;

    /// Point the booking at its current payment
    async fn set_payment(&self, id: BookingId, payment_id: PaymentId) -> DbResult<()>;

    /// Move a `PENDING` booking to `status`; returns whether it applied
    async fn transition_from_pending(&self, id: BookingId, status: BookingStatus)
        -> DbResult<bool>;

    /// Confirmed bookings of a user whose payment is paid, newest first
    async fn list_confirmed_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> DbResult<(Vec<Booking>, u64)>;
}

/// Create booking input
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub id: BookingId,
    pub event_id: EventId,
    pub user_id: UserId,
}

/// Payment repository trait
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Find a payment by ID
    async fn find_by_id(&self, id: PaymentId) -> DbResult<Option<Payment>>;

    /// Find the pending payment attached to a ledger entity
    async fn find_pending_for_owner(&self, owner: PaymentOwner) -> DbResult<Option<Payment>>;

    /// Create a new pending payment
    async fn create(&self, payment: CreatePayment) -> DbResult<Payment>;

    /// Apply a processor outcome to a `PENDING` payment; returns whether it applied
    async fn settle(&self, id: PaymentId, settlement: PaymentSettlement) -> DbResult<bool>;

    /// Attach the receipt URL of the settled charge
    async fn set_receipt_url(&self, id: PaymentId, receipt_url: &str) -> DbResult<bool>;

    /// Paid payments of a user, newest first
    async fn list_paid_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> DbResult<(Vec<Payment>, u64)>;

    /// All payments, newest first
    async fn list_all(&self, page: PageRequest) -> DbResult<(Vec<Payment>, u64)>;
}

/// Create payment input
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub id: PaymentId,
    pub owner: PaymentOwner,
    pub user_id: UserId,
    pub amount_cents: i64,
    pub transaction_id: String,
}

/// Processor-reported details written when a payment leaves `PENDING`
#[derive(Debug, Clone)]
pub struct PaymentSettlement {
    pub status: PaymentStatus,
    pub intent_id: String,
    pub payment_method_id: Option<String>,
    pub receipt_email: Option<String>,
    pub currency: Option<String>,
}

/// Sponsorship repository trait
#[async_trait]
pub trait SponsorshipRepository: Send + Sync {
    /// Find a sponsorship by ID
    async fn find_by_id(&self, id: SponsorshipId) -> DbResult<Option<Sponsorship>>;

    /// Find a pending sponsorship of a kind for (user, event)
    async fn find_pending(
        &self,
        user_id: UserId,
        event_id: EventId,
        kind: PromotionKind,
    ) -> DbResult<Option<Sponsorship>>;

    /// Find the latest approved sponsorship of a kind for (user, event) ending after `now`
    async fn find_active(
        &self,
        user_id: UserId,
        event_id: EventId,
        kind: PromotionKind,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Sponsorship>>;

    /// Create a new pending sponsorship
    async fn create(&self, sponsorship: CreateSponsorship) -> DbResult<Sponsorship>;

    /// Point the sponsorship at its current payment
    async fn set_payment(&self, id: SponsorshipId, payment_id: PaymentId) -> DbResult<()>;

    /// Approve a `PENDING` sponsorship with its window; returns whether it applied
    async fn approve(
        &self,
        id: SponsorshipId,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        currency: Option<&str>,
    ) -> DbResult<bool>;

    /// Move a `PENDING` sponsorship to `status`; returns whether it applied
    async fn transition_from_pending(
        &self,
        id: SponsorshipId,
        status: SponsorStatus,
    ) -> DbResult<bool>;

    /// Approved sponsorships of a kind whose window ended at or before `now`
    async fn find_lapsed(
        &self,
        kind: PromotionKind,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<Sponsorship>>;

    /// Whether any approved sponsorship of a kind on the event is still running at `now`
    async fn has_active_on_event(
        &self,
        event_id: EventId,
        kind: PromotionKind,
        now: DateTime<Utc>,
    ) -> DbResult<bool>;

    /// Move `APPROVED` sponsorships to `EXPIRED`, returning how many changed
    async fn mark_expired(&self, ids: &[SponsorshipId]) -> DbResult<u64>;

    /// Active sponsorships of a kind, newest window end first
    async fn list_active(
        &self,
        kind: PromotionKind,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> DbResult<(Vec<Sponsorship>, u64)>;

    /// Random sample of active sponsorships of a kind with a paid payment
    async fn sample_active(
        &self,
        kind: PromotionKind,
        now: DateTime<Utc>,
        size: u32,
    ) -> DbResult<Vec<Sponsorship>>;
}

/// Create sponsorship input
#[derive(Debug, Clone)]
pub struct CreateSponsorship {
    pub id: SponsorshipId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub package_id: PackageId,
    pub kind: PromotionKind,
    pub amount_cents: i64,
}

/// Sponsorship package repository trait
#[async_trait]
pub trait PackageRepository: Send + Sync {
    /// Find a package by ID
    async fn find_by_id(&self, id: PackageId) -> DbResult<Option<SponsorshipPackage>>;

    /// Find the package of a kind
    async fn find_by_kind(&self, kind: PromotionKind) -> DbResult<Option<SponsorshipPackage>>;

    /// List all packages
    async fn list(&self) -> DbResult<Vec<SponsorshipPackage>>;

    /// Create a package
    async fn create(&self, package: CreatePackage) -> DbResult<SponsorshipPackage>;

    /// Update a package, returning the new version if it exists
    async fn update(
        &self,
        id: PackageId,
        update: UpdatePackage,
    ) -> DbResult<Option<SponsorshipPackage>>;
}

/// Create package input
#[derive(Debug, Clone)]
pub struct CreatePackage {
    pub id: PackageId,
    pub title: String,
    pub benefits: Vec<String>,
    pub price_cents: i64,
    pub kind: PromotionKind,
    pub duration_days: i32,
}

/// Partial package update
#[derive(Debug, Clone, Default)]
pub struct UpdatePackage {
    pub title: Option<String>,
    pub benefits: Option<Vec<String>>,
    pub price_cents: Option<i64>,
    pub duration_days: Option<i32>,
}

/// Trending counters repository trait
#[async_trait]
pub trait TrendingRepository: Send + Sync {
    /// Count a view of the event at `at`
    async fn record_view(&self, event_id: EventId, at: DateTime<Utc>) -> DbResult<()>;

    /// Count a booking of the event at `at`
    async fn record_booking(&self, event_id: EventId, at: DateTime<Utc>) -> DbResult<()>;

    /// Counters for events that have not ended by `now`
    async fn list_upcoming(&self, now: DateTime<Utc>) -> DbResult<Vec<TrendingRow>>;
}

/// Read-only reporting queries
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Count rows of `subject` created at or after `since` (or all when `None`)
    async fn count(&self, subject: CountSubject, since: Option<DateTime<Utc>>) -> DbResult<i64>;

    /// Sum of payment amounts for confirmed bookings created at or after `since`
    async fn confirmed_booking_revenue(&self, since: Option<DateTime<Utc>>) -> DbResult<i64>;

    /// Hosts ranked by confirmed-booking revenue
    async fn top_hosts(&self, limit: u32) -> DbResult<Vec<HostRevenue>>;

    /// Revenue per calendar month (1-12) since `since`
    async fn monthly_revenue(
        &self,
        source: RevenueSource,
        since: DateTime<Utc>,
    ) -> DbResult<Vec<MonthlyRevenue>>;

    /// Approved sponsorships of a kind created in `[from, to)`
    async fn approved_sponsorships_between(
        &self,
        kind: PromotionKind,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Sponsorship>>;

    /// Count and revenue of confirmed bookings created in `[from, to)`
    async fn confirmed_bookings_between(
        &self,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<PurchaseTotals>;

    /// Title of the event with most bookings; restricted to `among` when given
    async fn top_booked_event(
        &self,
        among: Option<&[EventId]>,
        confirmed_only: bool,
    ) -> DbResult<Option<String>>;
}

/// What [`AnalyticsRepository::count`] counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSubject {
    /// All events
    Events,
    /// All users
    Users,
    /// Approved sponsorships of any kind
    ApprovedSponsorships,
}

/// Which ledger revenue to aggregate per month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueSource {
    /// Paid booking payments, by payment creation month
    Booking,
    /// Approved sponsorships, by window start month
    Sponsorship,
}

/// Host revenue ranking entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRevenue {
    pub host_id: UserId,
    pub full_name: String,
    pub event_count: i64,
    pub total_revenue_cents: i64,
}

/// Revenue for one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyRevenue {
    /// 1 = January
    pub month: u32,
    pub total_cents: i64,
}

/// Count and revenue of a set of purchases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurchaseTotals {
    pub count: i64,
    pub revenue_cents: i64,
}
