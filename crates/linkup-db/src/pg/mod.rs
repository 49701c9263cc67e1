//! PostgreSQL repository implementations

mod analytics;
mod booking;
mod event;
mod package;
mod payment;
mod sponsorship;
mod trending;
mod user;

pub use analytics::PgAnalyticsRepository;
pub use booking::PgBookingRepository;
pub use event::PgEventRepository;
pub use package::PgPackageRepository;
pub use payment::PgPaymentRepository;
pub use sponsorship::PgSponsorshipRepository;
pub use trending::PgTrendingRepository;
pub use user::PgUserRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub users: PgUserRepository,
    pub events: PgEventRepository,
    pub bookings: PgBookingRepository,
    pub payments: PgPaymentRepository,
    pub sponsorships: PgSponsorshipRepository,
    pub packages: PgPackageRepository,
    pub trending: PgTrendingRepository,
    pub analytics: PgAnalyticsRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            events: PgEventRepository::new(pool.clone()),
            bookings: PgBookingRepository::new(pool.clone()),
            payments: PgPaymentRepository::new(pool.clone()),
            sponsorships: PgSponsorshipRepository::new(pool.clone()),
            packages: PgPackageRepository::new(pool.clone()),
            trending: PgTrendingRepository::new(pool.clone()),
            analytics: PgAnalyticsRepository::new(pool),
        }
    }
}
