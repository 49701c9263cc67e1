//! Stripe webhook verification and parsing

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{PaymentsError, PaymentsResult};

/// Webhook event types we handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// Payment intent settled
    PaymentIntentSucceeded,
    /// Payment intent failed
    PaymentIntentFailed,
    /// Payment intent canceled
    PaymentIntentCanceled,
    /// Charge settled; carries the receipt URL
    ChargeSucceeded,
    /// Unknown event type
    Unknown(String),
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            "payment_intent.payment_failed" => Self::PaymentIntentFailed,
            "payment_intent.canceled" => Self::PaymentIntentCanceled,
            "charge.succeeded" => Self::ChargeSucceeded,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl WebhookEventType {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &str {
        match self {
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentFailed => "payment_intent.payment_failed",
            Self::PaymentIntentCanceled => "payment_intent.canceled",
            Self::ChargeSucceeded => "charge.succeeded",
            Self::Unknown(other) => other,
        }
    }
}

/// Parsed webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Event ID
    pub id: String,
    /// Event type
    pub event_type: WebhookEventType,
    /// Event data
    pub data: WebhookEventData,
    /// When the event was created (Unix timestamp)
    pub created: i64,
}

/// Webhook event data
#[derive(Debug, Clone)]
pub enum WebhookEventData {
    /// Payment intent data
    PaymentIntent(PaymentIntentData),
    /// Charge data
    Charge(ChargeData),
    /// Raw JSON for unknown events
    Raw(serde_json::Value),
}

/// Payment intent event data
#[derive(Debug, Clone, Default)]
pub struct PaymentIntentData {
    /// Intent ID
    pub intent_id: String,
    /// Metadata set when the intent was created
    pub metadata: HashMap<String, String>,
    /// Payment method used
    pub payment_method: Option<String>,
    /// Receipt email
    pub receipt_email: Option<String>,
    /// Currency
    pub currency: Option<String>,
    /// Amount in cents
    pub amount: i64,
}

/// Charge event data
#[derive(Debug, Clone, Default)]
pub struct ChargeData {
    /// Charge ID
    pub charge_id: String,
    /// Intent the charge belongs to
    pub payment_intent: Option<String>,
    /// Metadata copied from the intent
    pub metadata: HashMap<String, String>,
    /// Hosted receipt URL
    pub receipt_url: Option<String>,
}

impl WebhookEventData {
    /// Metadata of the intent or charge, if any
    pub fn metadata(&self) -> Option<&HashMap<String, String>> {
        match self {
            Self::PaymentIntent(intent) => Some(&intent.metadata),
            Self::Charge(charge) => Some(&charge.metadata),
            Self::Raw(_) => None,
        }
    }
}

/// Webhook handler for verifying and parsing Stripe events
#[derive(Clone)]
pub struct WebhookHandler {
    webhook_secret: String,
    tolerance: Duration,
}

impl WebhookHandler {
    /// Create a new webhook handler
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            tolerance: Duration::from_secs(300),
        }
    }

    /// Set the allowed timestamp skew
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verify and parse a webhook payload
    #[instrument(skip(self, payload, signature))]
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentsResult<WebhookEvent> {
        self.verify_and_parse_at(payload, signature, Utc::now())
    }

    /// Verify and parse a webhook payload against an explicit clock
    pub fn verify_and_parse_at(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> PaymentsResult<WebhookEvent> {
        self.verify_signature(payload, signature, now)?;

        let raw_event: RawStripeEvent = serde_json::from_slice(payload)
            .map_err(|e| PaymentsError::BadRequest(format!("invalid event payload: {e}")))?;

        debug!(event_id = %raw_event.id, event_type = %raw_event.event_type, "Parsed webhook event");

        let event_type = WebhookEventType::from(raw_event.event_type.as_str());
        let data = Self::parse_event_data(&event_type, raw_event.data.object)?;

        Ok(WebhookEvent {
            id: raw_event.id,
            event_type,
            data,
            created: raw_event.created,
        })
    }

    /// Verify Stripe webhook signature
    fn verify_signature(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> PaymentsResult<()> {
        // Parse signature header: t=timestamp,v1=signature[,v1=...]
        let mut timestamp: Option<&str> = None;
        let mut candidates: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => candidates.push(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            warn!("Missing timestamp in webhook signature");
            PaymentsError::Webhook("Missing timestamp".to_string())
        })?;

        if candidates.is_empty() {
            warn!("Missing v1 signature in webhook signature");
            return Err(PaymentsError::Webhook("Missing signature".to_string()));
        }

        let expected = sign(&self.webhook_secret, timestamp, payload)?;

        if !candidates
            .iter()
            .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()))
        {
            error!("Webhook signature verification failed");
            return Err(PaymentsError::Webhook(
                "Signature verification failed".to_string(),
            ));
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| PaymentsError::Webhook("Invalid timestamp format".to_string()))?;
        let now = now.timestamp();
        let tolerance = i64::try_from(self.tolerance.as_secs()).unwrap_or(i64::MAX);
        if (now - ts).abs() > tolerance {
            warn!(timestamp = ts, now = now, "Webhook timestamp outside tolerance");
            return Err(PaymentsError::Webhook("Timestamp too old".to_string()));
        }

        Ok(())
    }

    /// Parse event data based on type
    fn parse_event_data(
        event_type: &WebhookEventType,
        object: serde_json::Value,
    ) -> PaymentsResult<WebhookEventData> {
        match event_type {
            WebhookEventType::PaymentIntentSucceeded
            | WebhookEventType::PaymentIntentFailed
            | WebhookEventType::PaymentIntentCanceled => {
                let intent: RawPaymentIntent = serde_json::from_value(object)
                    .map_err(|e| PaymentsError::BadRequest(e.to_string()))?;
                Ok(WebhookEventData::PaymentIntent(PaymentIntentData {
                    intent_id: intent.id,
                    metadata: intent.metadata,
                    payment_method: intent.payment_method,
                    receipt_email: intent.receipt_email,
                    currency: intent.currency,
                    amount: intent.amount,
                }))
            }
            WebhookEventType::ChargeSucceeded => {
                let charge: RawCharge = serde_json::from_value(object)
                    .map_err(|e| PaymentsError::BadRequest(e.to_string()))?;
                Ok(WebhookEventData::Charge(ChargeData {
                    charge_id: charge.id,
                    payment_intent: charge.payment_intent,
                    metadata: charge.metadata,
                    receipt_url: charge.receipt_url,
                }))
            }
            WebhookEventType::Unknown(_) => {
                info!("Received unknown webhook event type");
                Ok(WebhookEventData::Raw(object))
            }
        }
    }
}

/// Compute the hex `v1` signature of `timestamp.payload`
pub fn sign(secret: &str, timestamp: &str, payload: &[u8]) -> PaymentsResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentsError::Internal("HMAC error".to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

// Raw Stripe event for parsing
#[derive(Debug, Deserialize)]
struct RawStripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
    #[serde(default)]
    created: i64,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawPaymentIntent {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    payment_method: Option<String>,
    receipt_email: Option<String>,
    currency: Option<String>,
    #[serde(default)]
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct RawCharge {
    id: String,
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    receipt_url: Option<String>,
}
