//! Payments configuration

use std::time::Duration;

use crate::retry::RetryConfig;

/// Default Stripe REST base URL
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Processor fee model applied to booking charges
///
/// `fee = round(amount * bps / 10_000) + fixed_cents`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Percentage part in basis points (290 = 2.9%)
    pub bps: u32,
    /// Fixed part in cents
    pub fixed_cents: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            bps: 290,
            fixed_cents: 30,
        }
    }
}

/// Payments service configuration
#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Signing secret of the booking webhook endpoint
    pub booking_webhook_secret: String,
    /// Signing secret of the sponsorship webhook endpoint
    pub sponsored_webhook_secret: String,
    /// Stripe API base URL
    pub stripe_api_base: String,
    /// Charge currency (lowercase ISO code)
    pub currency: String,
    /// Processor fee model
    pub fee: FeeSchedule,
    /// Allowed clock skew on webhook signatures
    pub webhook_tolerance: Duration,
    /// Support address passed to email templates
    pub support_email: String,
    /// Side-effect delivery retry policy
    pub retry: RetryConfig,
}

impl PaymentsConfig {
    /// Create a new payments config
    pub fn new(
        stripe_secret_key: impl Into<String>,
        booking_webhook_secret: impl Into<String>,
        sponsored_webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            stripe_secret_key: stripe_secret_key.into(),
            booking_webhook_secret: booking_webhook_secret.into(),
            sponsored_webhook_secret: sponsored_webhook_secret.into(),
            stripe_api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            currency: "usd".to_string(),
            fee: FeeSchedule::default(),
            webhook_tolerance: Duration::from_secs(300),
            support_email: "support@linkup.app".to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Set the processor fee model
    pub fn with_fee(mut self, bps: u32, fixed_cents: i64) -> Self {
        self.fee = FeeSchedule { bps, fixed_cents };
        self
    }

    /// Set the Stripe API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.stripe_api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the charge currency
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into().to_ascii_lowercase();
        self
    }

    /// Set the webhook timestamp tolerance
    pub fn with_webhook_tolerance(mut self, tolerance: Duration) -> Self {
        self.webhook_tolerance = tolerance;
        self
    }

    /// Set the support email
    pub fn with_support_email(mut self, email: impl Into<String>) -> Self {
        self.support_email = email.into();
        self
    }

    /// Set the side-effect retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
