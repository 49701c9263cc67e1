//! In-memory repositories
//!
//! A [`MemoryStore`] implements every repository trait over shared
//! `DashMap` tables. Status guards and the one-confirmed-booking rule behave
//! like the PostgreSQL implementation so service tests exercise the same
//! invariants without a database.

mod analytics;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use linkup_types::{
    Booking, BookingId, BookingStatus, Event, EventId, JoinApproval, PackageId, PageRequest,
    Payment, PaymentId, PaymentOwner, PaymentStatus, PromotionKind, SponsorStatus, Sponsorship,
    SponsorshipId, SponsorshipPackage, User, UserId,
};

use crate::error::{DbError, DbResult};
use crate::models::TrendingRow;
use crate::repo::{
    BookingRepository, CreateBooking, CreateEvent, CreatePackage, CreatePayment,
    CreateSponsorship, CreateUser, EventRepository, PackageRepository, PaymentRepository,
    PaymentSettlement, SponsorshipRepository, TrendingRepository, UpdatePackage, UserRepository,
};

/// Trending counters for one event
#[derive(Debug, Clone, Copy)]
struct Counters {
    views: i64,
    bookings: i64,
    last_interaction: DateTime<Utc>,
}

/// Shared in-memory tables
#[derive(Default, Clone)]
pub struct MemoryStore {
    users: Arc<DashMap<UserId, User>>,
    events: Arc<DashMap<EventId, Event>>,
    join_requests: Arc<DashMap<(EventId, UserId), JoinApproval>>,
    bookings: Arc<DashMap<BookingId, Booking>>,
    payments: Arc<DashMap<PaymentId, Payment>>,
    sponsorships: Arc<DashMap<SponsorshipId, Sponsorship>>,
    packages: Arc<DashMap<PackageId, SponsorshipPackage>>,
    trending: Arc<DashMap<EventId, Counters>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user directly
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Insert an event directly
    pub fn insert_event(&self, event: Event) {
        self.events.insert(event.id, event);
    }

    /// Insert a booking directly
    pub fn insert_booking(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    /// Insert a payment directly
    pub fn insert_payment(&self, payment: Payment) {
        self.payments.insert(payment.id, payment);
    }

    /// Insert a sponsorship directly
    pub fn insert_sponsorship(&self, sponsorship: Sponsorship) {
        self.sponsorships.insert(sponsorship.id, sponsorship);
    }

    /// Insert a package directly
    pub fn insert_package(&self, package: SponsorshipPackage) {
        self.packages.insert(package.id, package);
    }

    /// Snapshot of a booking
    pub fn booking(&self, id: BookingId) -> Option<Booking> {
        self.bookings.get(&id).map(|r| r.value().clone())
    }

    /// Snapshot of a payment
    pub fn payment(&self, id: PaymentId) -> Option<Payment> {
        self.payments.get(&id).map(|r| r.value().clone())
    }

    /// Snapshot of a sponsorship
    pub fn sponsorship(&self, id: SponsorshipId) -> Option<Sponsorship> {
        self.sponsorships.get(&id).map(|r| r.value().clone())
    }

    /// Snapshot of an event
    pub fn event(&self, id: EventId) -> Option<Event> {
        self.events.get(&id).map(|r| r.value().clone())
    }

    /// All bookings
    pub fn all_bookings(&self) -> Vec<Booking> {
        self.bookings.iter().map(|r| r.value().clone()).collect()
    }

    /// All payments
    pub fn all_payments(&self) -> Vec<Payment> {
        self.payments.iter().map(|r| r.value().clone()).collect()
    }

    /// All sponsorships
    pub fn all_sponsorships(&self) -> Vec<Sponsorship> {
        self.sponsorships.iter().map(|r| r.value().clone()).collect()
    }

    /// View and booking counters of an event
    pub fn trending_counts(&self, event_id: EventId) -> Option<(i64, i64)> {
        self.trending
            .get(&event_id)
            .map(|c| (c.views, c.bookings))
    }

    fn payment_is_paid(&self, id: Option<PaymentId>) -> bool {
        id.and_then(|id| self.payments.get(&id).map(|p| p.status == PaymentStatus::Paid))
            .unwrap_or(false)
    }

    fn bump(&self, event_id: EventId, views: i64, bookings: i64, at: DateTime<Utc>) {
        let mut entry = self.trending.entry(event_id).or_insert(Counters {
            views: 0,
            bookings: 0,
            last_interaction: at,
        });
        entry.views += views;
        entry.bookings += bookings;
        entry.last_interaction = entry.last_interaction.max(at);
    }
}

/// Sort newest first and cut one page
fn paginate<T, F>(mut items: Vec<T>, page: PageRequest, key: F) -> (Vec<T>, u64)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
    let total = items.len() as u64;
    let data = items
        .into_iter()
        .skip(page.offset().max(0) as usize)
        .take(page.limit as usize)
        .collect();
    (data, total)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> DbResult<Option<User>> {
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn create(&self, user: CreateUser) -> DbResult<User> {
        let row = User {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            is_verified: user.is_verified,
            payout_account_id: user.payout_account_id,
            created_at: Utc::now(),
        };
        self.insert_user(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn find_by_id(&self, id: EventId) -> DbResult<Option<Event>> {
        Ok(self.event(id))
    }

    async fn create(&self, event: CreateEvent) -> DbResult<Event> {
        let row = Event {
            id: event.id,
            host_id: event.host_id,
            title: event.title,
            venue: event.venue,
            images: event.images,
            price_cents: event.price_cents,
            visibility: event.visibility,
            boosted: false,
            event_start: event.event_start,
            event_end: event.event_end,
            created_at: Utc::now(),
        };
        self.insert_event(row.clone());
        Ok(row)
    }

    async fn set_boosted(&self, id: EventId, boosted: bool) -> DbResult<()> {
        if let Some(mut event) = self.events.get_mut(&id) {
            event.boosted = boosted;
        }
        Ok(())
    }

    async fn clear_boosted(&self, ids: &[EventId]) -> DbResult<u64> {
        let mut count = 0;
        for id in ids {
            if let Some(mut event) = self.events.get_mut(id) {
                if event.boosted {
                    event.boosted = false;
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    async fn create_join_request(
        &self,
        event_id: EventId,
        user_id: UserId,
        approval: JoinApproval,
    ) -> DbResult<()> {
        self.join_requests.insert((event_id, user_id), approval);
        Ok(())
    }

    async fn has_approved_join_request(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> DbResult<bool> {
        Ok(self
            .join_requests
            .get(&(event_id, user_id))
            .is_some_and(|a| *a.value() == JoinApproval::Approved))
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn find_by_id(&self, id: BookingId) -> DbResult<Option<Booking>> {
        Ok(self.booking(id))
    }

    async fn find_for_user_event(
        &self,
        user_id: UserId,
        event_id: EventId,
        status: BookingStatus,
    ) -> DbResult<Option<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|r| r.user_id == user_id && r.event_id == event_id && r.status == status)
            .max_by_key(|r| r.created_at)
            .map(|r| r.value().clone()))
    }

    async fn create(&self, booking: CreateBooking) -> DbResult<Booking> {
        let now = Utc::now();
        let row = Booking {
            id: booking.id,
            event_id: booking.event_id,
            user_id: booking.user_id,
            status: BookingStatus::Pending,
            payment_id: None,
            created_at: now,
            updated_at: now,
        };
        self.insert_booking(row.clone());
        Ok(row)
    }

    async fn set_payment(&self, id: BookingId, payment_id: PaymentId) -> DbResult<()> {
        if let Some(mut booking) = self.bookings.get_mut(&id) {
            booking.payment_id = Some(payment_id);
            booking.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn transition_from_pending(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> DbResult<bool> {
        let Some((user_id, event_id)) = self
            .bookings
            .get(&id)
            .filter(|b| b.status.is_pending())
            .map(|b| (b.user_id, b.event_id))
        else {
            return Ok(false);
        };

        if status == BookingStatus::Confirmed {
            let taken = self.bookings.iter().any(|b| {
                b.id != id
                    && b.user_id == user_id
                    && b.event_id == event_id
                    && b.status == BookingStatus::Confirmed
            });
            if taken {
                return Err(DbError::Duplicate(
                    "bookings_one_confirmed_idx".to_string(),
                ));
            }
        }

        let Some(mut booking) = self.bookings.get_mut(&id) else {
            return Ok(false);
        };
        if !booking.status.is_pending() {
            return Ok(false);
        }
        booking.status = status;
        booking.updated_at = Utc::now();
        Ok(true)
    }

    async fn list_confirmed_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> DbResult<(Vec<Booking>, u64)> {
        let items: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id && b.status == BookingStatus::Confirmed)
            .map(|b| b.value().clone())
            .filter(|b| self.payment_is_paid(b.payment_id))
            .collect();
        Ok(paginate(items, page, |b| b.created_at))
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn find_by_id(&self, id: PaymentId) -> DbResult<Option<Payment>> {
        Ok(self.payment(id))
    }

    async fn find_pending_for_owner(&self, owner: PaymentOwner) -> DbResult<Option<Payment>> {
        Ok(self
            .payments
            .iter()
            .filter(|p| p.owner == owner && p.status == PaymentStatus::Pending)
            .max_by_key(|p| p.created_at)
            .map(|p| p.value().clone()))
    }

    async fn create(&self, payment: CreatePayment) -> DbResult<Payment> {
        if self
            .payments
            .iter()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(DbError::Duplicate("payments_transaction_id_key".to_string()));
        }
        let now = Utc::now();
        let row = Payment {
            id: payment.id,
            owner: payment.owner,
            user_id: payment.user_id,
            amount_cents: payment.amount_cents,
            transaction_id: payment.transaction_id,
            status: PaymentStatus::Pending,
            intent_id: None,
            payment_method_id: None,
            receipt_email: None,
            receipt_url: None,
            currency: None,
            created_at: now,
            updated_at: now,
        };
        self.insert_payment(row.clone());
        Ok(row)
    }

    async fn settle(&self, id: PaymentId, settlement: PaymentSettlement) -> DbResult<bool> {
        let Some(mut payment) = self.payments.get_mut(&id) else {
            return Ok(false);
        };
        if payment.status != PaymentStatus::Pending {
            return Ok(false);
        }
        payment.status = settlement.status;
        payment.intent_id = Some(settlement.intent_id);
        if settlement.payment_method_id.is_some() {
            payment.payment_method_id = settlement.payment_method_id;
        }
        if settlement.receipt_email.is_some() {
            payment.receipt_email = settlement.receipt_email;
        }
        if settlement.currency.is_some() {
            payment.currency = settlement.currency;
        }
        payment.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_receipt_url(&self, id: PaymentId, receipt_url: &str) -> DbResult<bool> {
        let Some(mut payment) = self.payments.get_mut(&id) else {
            return Ok(false);
        };
        payment.receipt_url = Some(receipt_url.to_string());
        payment.updated_at = Utc::now();
        Ok(true)
    }

    async fn list_paid_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> DbResult<(Vec<Payment>, u64)> {
        let items = self
            .payments
            .iter()
            .filter(|p| p.user_id == user_id && p.status == PaymentStatus::Paid)
            .map(|p| p.value().clone())
            .collect();
        Ok(paginate(items, page, |p: &Payment| p.created_at))
    }

    async fn list_all(&self, page: PageRequest) -> DbResult<(Vec<Payment>, u64)> {
        let items = self.all_payments();
        Ok(paginate(items, page, |p| p.created_at))
    }
}

#[async_trait]
impl SponsorshipRepository for MemoryStore {
    async fn find_by_id(&self, id: SponsorshipId) -> DbResult<Option<Sponsorship>> {
        Ok(self.sponsorship(id))
    }

    async fn find_pending(
        &self,
        user_id: UserId,
        event_id: EventId,
        kind: PromotionKind,
    ) -> DbResult<Option<Sponsorship>> {
        Ok(self
            .sponsorships
            .iter()
            .filter(|s| {
                s.user_id == user_id
                    && s.event_id == event_id
                    && s.kind == kind
                    && s.status == SponsorStatus::Pending
            })
            .max_by_key(|s| s.created_at)
            .map(|s| s.value().clone()))
    }

    async fn find_active(
        &self,
        user_id: UserId,
        event_id: EventId,
        kind: PromotionKind,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Sponsorship>> {
        Ok(self
            .sponsorships
            .iter()
            .filter(|s| {
                s.user_id == user_id && s.event_id == event_id && s.kind == kind && s.is_active_at(now)
            })
            .max_by_key(|s| s.end_date)
            .map(|s| s.value().clone()))
    }

    async fn create(&self, sponsorship: CreateSponsorship) -> DbResult<Sponsorship> {
        let row = Sponsorship {
            id: sponsorship.id,
            event_id: sponsorship.event_id,
            user_id: sponsorship.user_id,
            package_id: sponsorship.package_id,
            payment_id: None,
            kind: sponsorship.kind,
            status: SponsorStatus::Pending,
            amount_cents: sponsorship.amount_cents,
            currency: None,
            start_date: None,
            end_date: None,
            created_at: Utc::now(),
        };
        self.insert_sponsorship(row.clone());
        Ok(row)
    }

    async fn set_payment(&self, id: SponsorshipId, payment_id: PaymentId) -> DbResult<()> {
        if let Some(mut s) = self.sponsorships.get_mut(&id) {
            s.payment_id = Some(payment_id);
        }
        Ok(())
    }

    async fn approve(
        &self,
        id: SponsorshipId,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        currency: Option<&str>,
    ) -> DbResult<bool> {
        let Some(mut s) = self.sponsorships.get_mut(&id) else {
            return Ok(false);
        };
        if s.status != SponsorStatus::Pending {
            return Ok(false);
        }
        s.status = SponsorStatus::Approved;
        s.start_date = Some(start_date);
        s.end_date = Some(end_date);
        if let Some(currency) = currency {
            s.currency = Some(currency.to_string());
        }
        Ok(true)
    }

    async fn transition_from_pending(
        &self,
        id: SponsorshipId,
        status: SponsorStatus,
    ) -> DbResult<bool> {
        let Some(mut s) = self.sponsorships.get_mut(&id) else {
            return Ok(false);
        };
        if s.status != SponsorStatus::Pending {
            return Ok(false);
        }
        s.status = status;
        Ok(true)
    }

    async fn find_lapsed(
        &self,
        kind: PromotionKind,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<Sponsorship>> {
        Ok(self
            .sponsorships
            .iter()
            .filter(|s| {
                s.kind == kind
                    && s.status == SponsorStatus::Approved
                    && s.end_date.is_some_and(|end| end <= now)
            })
            .map(|s| s.value().clone())
            .collect())
    }

    async fn has_active_on_event(
        &self,
        event_id: EventId,
        kind: PromotionKind,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        Ok(self
            .sponsorships
            .iter()
            .any(|s| s.event_id == event_id && s.kind == kind && s.is_active_at(now)))
    }

    async fn mark_expired(&self, ids: &[SponsorshipId]) -> DbResult<u64> {
        let mut count = 0;
        for id in ids {
            if let Some(mut s) = self.sponsorships.get_mut(id) {
                if s.status == SponsorStatus::Approved {
                    s.status = SponsorStatus::Expired;
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    async fn list_active(
        &self,
        kind: PromotionKind,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> DbResult<(Vec<Sponsorship>, u64)> {
        let items = self
            .sponsorships
            .iter()
            .filter(|s| s.kind == kind && s.is_active_at(now))
            .map(|s| s.value().clone())
            .collect();
        Ok(paginate(items, page, |s: &Sponsorship| {
            s.end_date.unwrap_or(s.created_at)
        }))
    }

    async fn sample_active(
        &self,
        kind: PromotionKind,
        now: DateTime<Utc>,
        size: u32,
    ) -> DbResult<Vec<Sponsorship>> {
        // v4 ids are random, so id order is an arbitrary sample
        let mut items: Vec<Sponsorship> = self
            .sponsorships
            .iter()
            .filter(|s| s.kind == kind && s.is_active_at(now))
            .map(|s| s.value().clone())
            .filter(|s| self.payment_is_paid(s.payment_id))
            .collect();
        items.sort_by_key(|s| s.id);
        items.truncate(size as usize);
        Ok(items)
    }
}

#[async_trait]
impl PackageRepository for MemoryStore {
    async fn find_by_id(&self, id: PackageId) -> DbResult<Option<SponsorshipPackage>> {
        Ok(self.packages.get(&id).map(|p| p.value().clone()))
    }

    async fn find_by_kind(&self, kind: PromotionKind) -> DbResult<Option<SponsorshipPackage>> {
        Ok(self
            .packages
            .iter()
            .find(|p| p.kind == kind)
            .map(|p| p.value().clone()))
    }

    async fn list(&self) -> DbResult<Vec<SponsorshipPackage>> {
        let mut items: Vec<SponsorshipPackage> =
            self.packages.iter().map(|p| p.value().clone()).collect();
        items.sort_by_key(|p| p.created_at);
        Ok(items)
    }

    async fn create(&self, package: CreatePackage) -> DbResult<SponsorshipPackage> {
        if self
            .packages
            .iter()
            .any(|p| p.kind == package.kind || p.title == package.title)
        {
            return Err(DbError::Duplicate("sponsorship_packages".to_string()));
        }
        let row = SponsorshipPackage {
            id: package.id,
            title: package.title,
            benefits: package.benefits,
            price_cents: package.price_cents,
            kind: package.kind,
            duration_days: package.duration_days,
            created_at: Utc::now(),
        };
        self.insert_package(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        id: PackageId,
        update: UpdatePackage,
    ) -> DbResult<Option<SponsorshipPackage>> {
        if let Some(title) = &update.title {
            if self.packages.iter().any(|p| p.id != id && &p.title == title) {
                return Err(DbError::Duplicate("sponsorship_packages_title_key".to_string()));
            }
        }
        let Some(mut package) = self.packages.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            package.title = title;
        }
        if let Some(benefits) = update.benefits {
            package.benefits = benefits;
        }
        if let Some(price_cents) = update.price_cents {
            package.price_cents = price_cents;
        }
        if let Some(duration_days) = update.duration_days {
            package.duration_days = duration_days;
        }
        Ok(Some(package.clone()))
    }
}

#[async_trait]
impl TrendingRepository for MemoryStore {
    async fn record_view(&self, event_id: EventId, at: DateTime<Utc>) -> DbResult<()> {
        self.bump(event_id, 1, 0, at);
        Ok(())
    }

    async fn record_booking(&self, event_id: EventId, at: DateTime<Utc>) -> DbResult<()> {
        self.bump(event_id, 0, 1, at);
        Ok(())
    }

    async fn list_upcoming(&self, now: DateTime<Utc>) -> DbResult<Vec<TrendingRow>> {
        Ok(self
            .trending
            .iter()
            .filter_map(|entry| {
                let event = self.events.get(entry.key())?;
                (event.event_end >= now).then(|| TrendingRow {
                    event_id: entry.key().as_uuid(),
                    total_views: entry.views,
                    total_bookings: entry.bookings,
                    last_interaction: entry.last_interaction,
                    event_end: event.event_end,
                })
            })
            .collect())
    }
}
