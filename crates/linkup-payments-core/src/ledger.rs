//! Repository handles shared by the payments services

use std::sync::Arc;

use linkup_db::{
    AnalyticsRepository, BookingRepository, EventRepository, PackageRepository,
    PaymentRepository, Repositories, SponsorshipRepository, TrendingRepository, UserRepository,
};

/// Trait-object handles to every repository the services use
#[derive(Clone)]
pub struct Ledger {
    pub users: Arc<dyn UserRepository>,
    pub events: Arc<dyn EventRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub sponsorships: Arc<dyn SponsorshipRepository>,
    pub packages: Arc<dyn PackageRepository>,
    pub trending: Arc<dyn TrendingRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
}

impl Ledger {
    /// Build a ledger where one store backs every repository
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + EventRepository
            + BookingRepository
            + PaymentRepository
            + SponsorshipRepository
            + PackageRepository
            + TrendingRepository
            + AnalyticsRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            events: store.clone(),
            bookings: store.clone(),
            payments: store.clone(),
            sponsorships: store.clone(),
            packages: store.clone(),
            trending: store.clone(),
            analytics: store,
        }
    }
}

impl From<Repositories> for Ledger {
    fn from(repos: Repositories) -> Self {
        Self {
            users: Arc::new(repos.users),
            events: Arc::new(repos.events),
            bookings: Arc::new(repos.bookings),
            payments: Arc::new(repos.payments),
            sponsorships: Arc::new(repos.sponsorships),
            packages: Arc::new(repos.packages),
            trending: Arc::new(repos.trending),
            analytics: Arc::new(repos.analytics),
        }
    }
}
