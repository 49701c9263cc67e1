//! Configuration for the Payments API service.

use std::time::Duration;

use linkup_payments_core::{PaymentsConfig, RetryConfig};

/// Payments API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Payments core configuration
    pub payments: PaymentsConfig,
    /// Notification service base URL; deliveries are only logged when unset
    pub notification_service_url: Option<String>,
    /// Side-effect queue capacity
    pub side_effect_queue_size: usize,
    /// Run the daily expiry sweep
    pub expiry_sweep_enabled: bool,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
    /// Apply embedded migrations at startup
    pub run_migrations: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        // Database
        let database_url = required("DATABASE_URL")?;

        // Server
        let http_port = parse_or(&lookup, "HTTP_PORT", 8082u16)?;

        // Stripe
        let stripe_secret_key = required("STRIPE_SECRET_KEY")?;
        let booking_webhook_secret = required("STRIPE_WEBHOOK_SECRET")?;
        let sponsored_webhook_secret = required("STRIPE_SPONSORED_WEBHOOK_SECRET")?;

        let fee_bps = parse_or(&lookup, "PROCESSOR_FEE_BPS", 290u32)?;
        let fee_fixed_cents = parse_or(&lookup, "PROCESSOR_FEE_FIXED_CENTS", 30i64)?;
        if fee_fixed_cents < 0 {
            return Err(ConfigError::Invalid("PROCESSOR_FEE_FIXED_CENTS"));
        }
        let tolerance_secs = parse_or(&lookup, "WEBHOOK_TOLERANCE_SECS", 300u64)?;
        let max_retries = parse_or(&lookup, "SIDE_EFFECT_MAX_RETRIES", 3u32)?;

        let mut payments = PaymentsConfig::new(
            stripe_secret_key,
            booking_webhook_secret,
            sponsored_webhook_secret,
        )
        .with_fee(fee_bps, fee_fixed_cents)
        .with_webhook_tolerance(Duration::from_secs(tolerance_secs))
        .with_retry(RetryConfig::new().with_max_attempts(max_retries));

        if let Some(base) = lookup("STRIPE_API_BASE") {
            payments = payments.with_api_base(base);
        }
        if let Some(currency) = lookup("PAYMENT_CURRENCY") {
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::Invalid("PAYMENT_CURRENCY"));
            }
            payments = payments.with_currency(currency);
        }
        if let Some(email) = lookup("SUPPORT_EMAIL") {
            payments = payments.with_support_email(email);
        }

        // Side effects
        let notification_service_url =
            lookup("NOTIFICATION_SERVICE_URL").filter(|url| !url.trim().is_empty());
        let side_effect_queue_size = parse_or(&lookup, "SIDE_EFFECT_QUEUE_SIZE", 1024usize)?;
        if side_effect_queue_size == 0 {
            return Err(ConfigError::Invalid("SIDE_EFFECT_QUEUE_SIZE"));
        }

        let expiry_sweep_enabled = parse_or(&lookup, "EXPIRY_SWEEP_ENABLED", true)?;

        // Request timeout
        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;

        // Ops
        let metrics_enabled = lookup("METRICS_ENABLED")
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);
        let run_migrations = parse_or(&lookup, "RUN_MIGRATIONS", true)?;

        Ok(Self {
            http_port,
            database_url,
            payments,
            notification_service_url,
            side_effect_queue_size,
            expiry_sweep_enabled,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
            run_migrations,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
