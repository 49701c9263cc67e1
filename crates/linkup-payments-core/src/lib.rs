//! LinkUp Payments Core - payment ledger business logic
//!
//! Booking and sponsorship payments for the LinkUp event platform:
//! - Intent building with idempotency keys tied to ledger records
//! - Stripe webhook verification and guarded reconciliation
//! - A queued side-effect dispatcher with retry
//! - The daily boost expiry sweep
//! - Trending and dashboard aggregates
//!
//! # Example
//!
//! ```rust,ignore
//! use linkup_payments_core::{IntentBuilder, Ledger, PaymentsConfig, StripeProvider};
//! use linkup_db::Repositories;
//!
//! let config = PaymentsConfig::new("sk_test_...", "whsec_booking", "whsec_sponsored");
//! let ledger = Ledger::from(Repositories::new(pool));
//! let provider = Arc::new(StripeProvider::new(&config));
//!
//! let builder = IntentBuilder::new(ledger, provider, config);
//! let intent = builder.create_booking_intent(user_id, event_id).await?;
//! ```

pub mod config;
pub mod dashboard;
pub mod dispatcher;
pub mod error;
pub mod intent;
pub mod ledger;
pub mod listing;
pub mod notifier;
pub mod packages;
pub mod provider;
pub mod reconcile;
pub mod retry;
pub mod stripe;
pub mod sweep;
pub mod trending;
pub mod webhook;

pub use config::{FeeSchedule, PaymentsConfig};
pub use dashboard::{AnalyticsProduct, Dashboard, DashboardStats, MonthRevenue, WeeklyAnalytics};
pub use dispatcher::{
    DispatcherHandle, Outcome, Product, SideEffectDispatcher, SideEffectJob, SideEffectWorker,
};
pub use error::{PaymentsError, PaymentsResult};
pub use intent::{BookingIntent, IntentBuilder, SponsorshipIntent};
pub use ledger::Ledger;
pub use listing::{BookingSummary, ListingService, SponsoredEvent};
pub use notifier::{EmailMessage, HttpNotifier, LogNotifier, Notifier, PersonalNotification};
pub use packages::{NewPackage, PackageService};
pub use provider::{IntentRequest, PaymentIntent, PaymentProvider, Transfer};
pub use reconcile::{Reconciler, Reconciliation, WebhookEndpoint};
pub use retry::RetryConfig;
pub use stripe::StripeProvider;
pub use sweep::{ExpirySweep, SweepReport};
pub use trending::{TrendingEvent, TrendingService};
pub use webhook::{WebhookEvent, WebhookEventData, WebhookEventType, WebhookHandler};
