//! Read-side listings: bookings, transactions and sponsored events

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::instrument;

use linkup_types::{
    Booking, Event, Page, PageRequest, Payment, PromotionKind, Sponsorship, UserId,
};

use crate::error::PaymentsResult;
use crate::ledger::Ledger;

/// Largest random sample of sponsored events
pub const RANDOM_SAMPLE_SIZE: u32 = 10;

/// A booking with its event
#[derive(Debug, Clone, Serialize)]
pub struct BookingSummary {
    pub booking: Booking,
    pub event: Option<Event>,
}

/// An active sponsorship with its event
#[derive(Debug, Clone, Serialize)]
pub struct SponsoredEvent {
    pub sponsorship: Sponsorship,
    pub event: Event,
}

/// Listing queries over the ledger
#[derive(Clone)]
pub struct ListingService {
    ledger: Ledger,
}

impl ListingService {
    /// Create a new listing service
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// A user's confirmed, paid bookings
    #[instrument(skip(self))]
    pub async fn my_bookings(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> PaymentsResult<Page<BookingSummary>> {
        let (bookings, total) = self
            .ledger
            .bookings
            .list_confirmed_for_user(user_id, page)
            .await?;

        let events = try_join_all(
            bookings
                .iter()
                .map(|b| self.ledger.events.find_by_id(b.event_id)),
        )
        .await?;

        let data = bookings
            .into_iter()
            .zip(events)
            .map(|(booking, event)| BookingSummary { booking, event })
            .collect();
        Ok(Page::new(page, total, data))
    }

    /// A user's paid payments
    #[instrument(skip(self))]
    pub async fn my_transactions(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> PaymentsResult<Page<Payment>> {
        let (payments, total) = self.ledger.payments.list_paid_for_user(user_id, page).await?;
        Ok(Page::new(page, total, payments))
    }

    /// Every payment
    #[instrument(skip(self))]
    pub async fn all_transactions(&self, page: PageRequest) -> PaymentsResult<Page<Payment>> {
        let (payments, total) = self.ledger.payments.list_all(page).await?;
        Ok(Page::new(page, total, payments))
    }

    /// Sponsored events whose window is still open
    #[instrument(skip(self))]
    pub async fn sponsored_events(
        &self,
        page: PageRequest,
        now: DateTime<Utc>,
    ) -> PaymentsResult<Page<SponsoredEvent>> {
        let (sponsorships, total) = self
            .ledger
            .sponsorships
            .list_active(PromotionKind::Sponsored, now, page)
            .await?;
        let data = self.with_events(sponsorships).await?;
        Ok(Page::new(page, total, data))
    }

    /// Up to [`RANDOM_SAMPLE_SIZE`] random paid, active sponsored events
    #[instrument(skip(self))]
    pub async fn random_sponsored(&self, now: DateTime<Utc>) -> PaymentsResult<Vec<SponsoredEvent>> {
        let sample = self
            .ledger
            .sponsorships
            .sample_active(PromotionKind::Sponsored, now, RANDOM_SAMPLE_SIZE)
            .await?;
        self.with_events(sample).await
    }

    async fn with_events(
        &self,
        sponsorships: Vec<Sponsorship>,
    ) -> PaymentsResult<Vec<SponsoredEvent>> {
        let events = try_join_all(
            sponsorships
                .iter()
                .map(|s| self.ledger.events.find_by_id(s.event_id)),
        )
        .await?;

        Ok(sponsorships
            .into_iter()
            .zip(events)
            .filter_map(|(sponsorship, event)| {
                event.map(|event| SponsoredEvent { sponsorship, event })
            })
            .collect())
    }
}
