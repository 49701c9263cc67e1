//! Application state for the Payments API service.

use std::sync::Arc;

use linkup_db::DbPool;
use linkup_payments_core::{
    Dashboard, IntentBuilder, Ledger, ListingService, PackageService, PaymentProvider, Reconciler,
    SideEffectDispatcher, TrendingService,
};

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Booking and sponsorship intents
    pub intents: Arc<IntentBuilder>,
    /// Webhook reconciliation for both endpoints
    pub reconciler: Arc<Reconciler>,
    pub listings: Arc<ListingService>,
    pub packages: Arc<PackageService>,
    pub trending: Arc<TrendingService>,
    pub dashboard: Arc<Dashboard>,
    /// Database pool for readiness checks; `None` when running over another store
    pub pool: Option<DbPool>,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire every service over one ledger
    pub fn new(
        ledger: Ledger,
        provider: Arc<dyn PaymentProvider>,
        dispatcher: SideEffectDispatcher,
        pool: Option<DbPool>,
        config: Config,
    ) -> Self {
        Self {
            intents: Arc::new(IntentBuilder::new(
                ledger.clone(),
                provider,
                config.payments.clone(),
            )),
            reconciler: Arc::new(Reconciler::new(
                ledger.clone(),
                dispatcher,
                &config.payments,
            )),
            listings: Arc::new(ListingService::new(ledger.clone())),
            packages: Arc::new(PackageService::new(ledger.clone())),
            trending: Arc::new(TrendingService::new(ledger.clone())),
            dashboard: Arc::new(Dashboard::new(ledger)),
            pool,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("http_port", &self.config.http_port)
            .field("database", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}
