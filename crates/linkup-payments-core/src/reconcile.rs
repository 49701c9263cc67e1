//! Webhook reconciler
//!
//! Applies verified processor events to the ledger. Every status write is
//! guarded on the record still being `PENDING`, so a redelivered event
//! neither moves a settled record nor re-runs its side effects.
//!
//! Only signature and payload errors leave [`Reconciler::handle`]; anything
//! that goes wrong while applying an event is logged and acknowledged.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use linkup_db::PaymentSettlement;
use linkup_types::{
    approval_window, BookingId, BookingStatus, EventId, PackageId, PaymentId, PaymentOwner, PaymentStatus,
    PromotionKind, SponsorStatus, SponsorshipId,
};

use crate::config::PaymentsConfig;
use crate::dispatcher::{Outcome, Product, SideEffectDispatcher, SideEffectJob};
use crate::error::PaymentsResult;
use crate::intent::{META_BOOKING, META_EVENT, META_PACKAGE, META_PAYMENT, META_SPONSORED};
use crate::ledger::Ledger;
use crate::webhook::{PaymentIntentData, WebhookEvent, WebhookEventData, WebhookEventType, WebhookHandler};

/// Metadata every sponsorship delivery must carry
const SPONSORSHIP_KEYS: [&str; 4] = [META_PAYMENT, META_SPONSORED, META_PACKAGE, META_EVENT];

/// Which webhook endpoint an event arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEndpoint {
    Booking,
    Sponsored,
}

impl WebhookEndpoint {
    /// Label used in logs and metrics
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Sponsored => "sponsored",
        }
    }
}

/// What reconciliation did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// At least one ledger record changed status
    Applied { product: Product, outcome: Outcome },
    /// Records were already settled; nothing changed
    AlreadySettled { product: Product, outcome: Outcome },
    /// A receipt URL was attached to the payment
    ReceiptAttached { payment_id: PaymentId },
    /// The event was acknowledged without touching the ledger
    Ignored(&'static str),
}

impl Reconciliation {
    /// Whether the ledger changed
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::ReceiptAttached { .. })
    }

    fn status_label(&self) -> &'static str {
        match self {
            Self::Applied { .. } | Self::ReceiptAttached { .. } => "applied",
            Self::AlreadySettled { .. } => "replayed",
            Self::Ignored(_) => "ignored",
        }
    }
}

/// Webhook reconciler for both product lines
#[derive(Clone)]
pub struct Reconciler {
    ledger: Ledger,
    dispatcher: SideEffectDispatcher,
    booking_webhook: WebhookHandler,
    sponsored_webhook: WebhookHandler,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(ledger: Ledger, dispatcher: SideEffectDispatcher, config: &PaymentsConfig) -> Self {
        Self {
            ledger,
            dispatcher,
            booking_webhook: WebhookHandler::new(&config.booking_webhook_secret)
                .with_tolerance(config.webhook_tolerance),
            sponsored_webhook: WebhookHandler::new(&config.sponsored_webhook_secret)
                .with_tolerance(config.webhook_tolerance),
        }
    }

    /// Verify a delivery and apply it
    ///
    /// Errors only for a bad signature or an unparseable payload; the caller
    /// acknowledges every `Ok`.
    #[instrument(skip(self, payload, signature), fields(endpoint = endpoint.as_str()))]
    pub async fn handle(
        &self,
        endpoint: WebhookEndpoint,
        payload: &[u8],
        signature: &str,
    ) -> PaymentsResult<Reconciliation> {
        let start = Instant::now();
        let handler = match endpoint {
            WebhookEndpoint::Booking => &self.booking_webhook,
            WebhookEndpoint::Sponsored => &self.sponsored_webhook,
        };

        let event = match handler.verify_and_parse(payload, signature) {
            Ok(event) => event,
            Err(e) => {
                metrics::counter!(
                    "payments_webhooks_processed_total",
                    "endpoint" => endpoint.as_str(),
                    "status" => "rejected"
                )
                .increment(1);
                return Err(e);
            }
        };

        let result = match endpoint {
            WebhookEndpoint::Booking => self.apply_booking_event(&event, Utc::now()).await,
            WebhookEndpoint::Sponsored => self.apply_sponsored_event(&event, Utc::now()).await,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    event_id = %event.id,
                    event_type = event.event_type.as_str(),
                    error = %e,
                    "Webhook reconciliation failed"
                );
                Reconciliation::Ignored("reconciliation error")
            }
        };

        metrics::counter!(
            "payments_webhooks_processed_total",
            "endpoint" => endpoint.as_str(),
            "status" => outcome.status_label()
        )
        .increment(1);
        metrics::histogram!(
            "payments_operation_duration_seconds",
            "operation" => "reconcile",
            "result" => outcome.status_label()
        )
        .record(start.elapsed().as_secs_f64());

        Ok(outcome)
    }

    // =========================================================================
    // Bookings
    // =========================================================================

    /// Apply a booking-endpoint event at `now`
    pub async fn apply_booking_event(
        &self,
        event: &WebhookEvent,
        now: DateTime<Utc>,
    ) -> PaymentsResult<Reconciliation> {
        let outcome = match &event.event_type {
            WebhookEventType::PaymentIntentSucceeded => Outcome::Succeeded,
            WebhookEventType::PaymentIntentFailed => Outcome::Failed,
            WebhookEventType::PaymentIntentCanceled => Outcome::Canceled,
            WebhookEventType::ChargeSucceeded => {
                return self.attach_receipt(event, &[META_PAYMENT]).await
            }
            WebhookEventType::Unknown(kind) => {
                debug!(event_type = %kind, "Ignoring unhandled booking event");
                return Ok(Reconciliation::Ignored("unhandled event type"));
            }
        };

        let WebhookEventData::PaymentIntent(intent) = &event.data else {
            return Ok(Reconciliation::Ignored("unexpected event data"));
        };

        let (Some(payment_id), Some(booking_id)) = (
            parse_meta(&intent.metadata, META_PAYMENT, PaymentId::parse),
            parse_meta(&intent.metadata, META_BOOKING, BookingId::parse),
        ) else {
            warn!(event_id = %event.id, "Booking event metadata incomplete");
            return Ok(Reconciliation::Ignored("missing metadata"));
        };

        let Some(booking) = self.ledger.bookings.find_by_id(booking_id).await? else {
            warn!(booking_id = %booking_id, "Booking from webhook not found");
            return Ok(Reconciliation::Ignored("unknown booking"));
        };

        let payment_status = match outcome {
            Outcome::Succeeded => PaymentStatus::Paid,
            Outcome::Failed => PaymentStatus::Failed,
            Outcome::Canceled => PaymentStatus::Canceled,
        };
        let payment_applied = self
            .settle_payment(payment_id, PaymentOwner::Booking(booking_id), payment_status, intent)
            .await?;

        let booking_status = match outcome {
            Outcome::Succeeded => BookingStatus::Confirmed,
            Outcome::Failed => BookingStatus::Failed,
            Outcome::Canceled => BookingStatus::Cancelled,
        };
        let booking_applied = self
            .ledger
            .bookings
            .transition_from_pending(booking_id, booking_status)
            .await?;

        if booking_applied {
            if outcome == Outcome::Succeeded {
                if let Err(e) = self
                    .ledger
                    .trending
                    .record_booking(booking.event_id, now)
                    .await
                {
                    warn!(event = %booking.event_id, error = %e, "Failed to record trending booking");
                }
            }
            self.dispatcher.enqueue(SideEffectJob::Booking {
                booking_id,
                outcome,
            });
        }

        Ok(finish(Product::Booking, outcome, payment_applied, booking_applied))
    }

    // =========================================================================
    // Sponsorships
    // =========================================================================

    /// Apply a sponsorship-endpoint event at `now`
    pub async fn apply_sponsored_event(
        &self,
        event: &WebhookEvent,
        now: DateTime<Utc>,
    ) -> PaymentsResult<Reconciliation> {
        let outcome = match &event.event_type {
            WebhookEventType::PaymentIntentSucceeded => Outcome::Succeeded,
            WebhookEventType::PaymentIntentFailed => Outcome::Failed,
            WebhookEventType::PaymentIntentCanceled => Outcome::Canceled,
            WebhookEventType::ChargeSucceeded => {
                return self.attach_receipt(event, &SPONSORSHIP_KEYS).await
            }
            WebhookEventType::Unknown(kind) => {
                debug!(event_type = %kind, "Ignoring unhandled sponsorship event");
                return Ok(Reconciliation::Ignored("unhandled event type"));
            }
        };

        let WebhookEventData::PaymentIntent(intent) = &event.data else {
            return Ok(Reconciliation::Ignored("unexpected event data"));
        };

        let (Some(sponsorship_id), Some(package_id), Some(payment_id), Some(_event_id)) = (
            parse_meta(&intent.metadata, META_SPONSORED, SponsorshipId::parse),
            parse_meta(&intent.metadata, META_PACKAGE, PackageId::parse),
            parse_meta(&intent.metadata, META_PAYMENT, PaymentId::parse),
            parse_meta(&intent.metadata, META_EVENT, EventId::parse),
        ) else {
            warn!(event_id = %event.id, "Sponsorship event metadata incomplete");
            return Ok(Reconciliation::Ignored("missing metadata"));
        };

        let Some(package) = self.ledger.packages.find_by_id(package_id).await? else {
            warn!(package_id = %package_id, "Package from webhook not found");
            return Ok(Reconciliation::Ignored("unknown package"));
        };

        let Some(sponsorship) = self.ledger.sponsorships.find_by_id(sponsorship_id).await? else {
            warn!(sponsorship_id = %sponsorship_id, "Sponsorship from webhook not found");
            return Ok(Reconciliation::Ignored("unknown sponsorship"));
        };

        let payment_status = match outcome {
            Outcome::Succeeded => PaymentStatus::Paid,
            Outcome::Failed => PaymentStatus::Failed,
            Outcome::Canceled => PaymentStatus::Canceled,
        };
        let payment_applied = self
            .settle_payment(
                payment_id,
                PaymentOwner::Sponsorship(sponsorship_id),
                payment_status,
                intent,
            )
            .await?;

        let sponsorship_applied = match outcome {
            Outcome::Succeeded => {
                let (start, end) = approval_window(now, package.duration_days);
                let approved = self
                    .ledger
                    .sponsorships
                    .approve(sponsorship_id, start, end, intent.currency.as_deref())
                    .await?;
                if approved && package.kind == PromotionKind::Boosted {
                    self.ledger
                        .events
                        .set_boosted(sponsorship.event_id, true)
                        .await?;
                    info!(event = %sponsorship.event_id, until = %end, "Event boosted");
                }
                approved
            }
            Outcome::Failed => {
                self.ledger
                    .sponsorships
                    .transition_from_pending(sponsorship_id, SponsorStatus::Failed)
                    .await?
            }
            Outcome::Canceled => {
                self.ledger
                    .sponsorships
                    .transition_from_pending(sponsorship_id, SponsorStatus::Cancelled)
                    .await?
            }
        };

        if sponsorship_applied {
            self.dispatcher.enqueue(SideEffectJob::Sponsorship {
                sponsorship_id,
                outcome,
            });
        }

        Ok(finish(
            Product::Sponsorship,
            outcome,
            payment_applied,
            sponsorship_applied,
        ))
    }

    // =========================================================================
    // Shared
    // =========================================================================

    /// Move the payment out of `PENDING` if it belongs to `owner`
    async fn settle_payment(
        &self,
        payment_id: PaymentId,
        owner: PaymentOwner,
        status: PaymentStatus,
        intent: &PaymentIntentData,
    ) -> PaymentsResult<bool> {
        let Some(payment) = self.ledger.payments.find_by_id(payment_id).await? else {
            warn!(payment_id = %payment_id, "Payment from webhook not found");
            return Ok(false);
        };

        if payment.owner != owner {
            warn!(
                payment_id = %payment_id,
                owner = ?payment.owner,
                expected = ?owner,
                "Payment does not belong to the webhook's record"
            );
            return Ok(false);
        }

        let applied = self
            .ledger
            .payments
            .settle(
                payment_id,
                PaymentSettlement {
                    status,
                    intent_id: intent.intent_id.clone(),
                    payment_method_id: intent.payment_method.clone(),
                    receipt_email: intent.receipt_email.clone(),
                    currency: intent.currency.clone(),
                },
            )
            .await?;

        if !applied {
            debug!(payment_id = %payment_id, status = %payment.status, "Payment already settled");
        }
        Ok(applied)
    }

    /// `charge.succeeded`: store the receipt URL; status is untouched
    ///
    /// Every key in `required` must be present before anything is written.
    async fn attach_receipt(
        &self,
        event: &WebhookEvent,
        required: &[&str],
    ) -> PaymentsResult<Reconciliation> {
        let WebhookEventData::Charge(charge) = &event.data else {
            return Ok(Reconciliation::Ignored("unexpected event data"));
        };

        if let Some(missing) = required.iter().find(|key| !charge.metadata.contains_key(**key)) {
            debug!(charge_id = %charge.charge_id, missing = *missing, "Charge metadata incomplete");
            return Ok(Reconciliation::Ignored("missing metadata"));
        }

        let Some(payment_id) = parse_meta(&charge.metadata, META_PAYMENT, PaymentId::parse) else {
            debug!(charge_id = %charge.charge_id, "Charge carries no payment metadata");
            return Ok(Reconciliation::Ignored("missing metadata"));
        };

        let Some(receipt_url) = charge.receipt_url.as_deref() else {
            return Ok(Reconciliation::Ignored("no receipt url"));
        };

        if self
            .ledger
            .payments
            .set_receipt_url(payment_id, receipt_url)
            .await?
        {
            debug!(payment_id = %payment_id, "Receipt attached");
            Ok(Reconciliation::ReceiptAttached { payment_id })
        } else {
            Ok(Reconciliation::Ignored("unknown payment"))
        }
    }
}

fn parse_meta<T, E>(
    metadata: &HashMap<String, String>,
    key: &str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Option<T> {
    metadata.get(key).and_then(|value| parse(value).ok())
}

fn finish(product: Product, outcome: Outcome, payment_applied: bool, record_applied: bool) -> Reconciliation {
    let applied = payment_applied || record_applied;
    metrics::counter!(
        "payments_reconciliations_total",
        "product" => product.as_str(),
        "outcome" => outcome.as_str(),
        "applied" => if applied { "true" } else { "false" }
    )
    .increment(1);

    if applied {
        info!(
            product = product.as_str(),
            outcome = outcome.as_str(),
            payment_applied,
            record_applied,
            "Reconciled payment event"
        );
        Reconciliation::Applied { product, outcome }
    } else {
        debug!(
            product = product.as_str(),
            outcome = outcome.as_str(),
            "Replayed payment event, nothing to change"
        );
        Reconciliation::AlreadySettled { product, outcome }
    }
}
