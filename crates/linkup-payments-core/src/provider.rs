//! Payment provider abstraction

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PaymentsResult;

/// Part of a charge routed to a connected payout account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Connected account id
    pub destination: String,
    /// Amount forwarded in cents
    pub amount_cents: i64,
}

/// Parameters for a new payment intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Charge amount in cents
    pub amount_cents: i64,
    /// Currency (lowercase ISO code)
    pub currency: String,
    /// Ledger ids echoed back on webhook events
    pub metadata: BTreeMap<String, String>,
    /// Host payout split; `None` keeps the full amount on the platform
    pub transfer: Option<Transfer>,
    /// Where the processor sends the receipt
    pub receipt_email: Option<String>,
    /// Statement description
    pub description: Option<String>,
}

/// Processor-side payment intent handle returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Intent id
    pub id: String,
    /// Secret the client uses to confirm the payment
    pub client_secret: Option<String>,
    /// Amount in cents
    pub amount: i64,
    /// Currency
    pub currency: String,
    /// Processor status
    pub status: String,
}

/// Payment provider trait
///
/// Abstracts payment processing to allow different providers (Stripe, etc.)
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment intent
    ///
    /// Requests made with the same `idempotency_key` return the same intent.
    async fn create_payment_intent(
        &self,
        request: &IntentRequest,
        idempotency_key: &str,
    ) -> PaymentsResult<PaymentIntent>;
}
