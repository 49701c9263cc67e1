//! Intent builder
//!
//! Validates a booking or sponsorship request, creates or reuses the pending
//! ledger rows and asks the processor for a payment intent. Nothing is marked
//! paid here; that only happens when the webhook arrives.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use linkup_db::{CreateBooking, CreatePayment, CreateSponsorship, DbError};
use linkup_types::{
    BookingId, BookingStatus, EventId, EventVisibility, PackageId, Payment, PaymentId,
    PaymentOwner, SponsorshipId, UserId,
};

use crate::config::{FeeSchedule, PaymentsConfig};
use crate::error::{PaymentsError, PaymentsResult};
use crate::ledger::Ledger;
use crate::provider::{IntentRequest, PaymentIntent, PaymentProvider, Transfer};

/// Metadata key carrying the payment id
pub const META_PAYMENT: &str = "payment";
/// Metadata key carrying the booking id
pub const META_BOOKING: &str = "booking";
/// Metadata key carrying the transaction id
pub const META_TRANSACTION: &str = "transaction_id";
/// Metadata key carrying the sponsorship id
pub const META_SPONSORED: &str = "sponsored";
/// Metadata key carrying the package id
pub const META_PACKAGE: &str = "package";
/// Metadata key carrying the event id
pub const META_EVENT: &str = "event";

const SPONSORSHIP_DESCRIPTION: &str = "Event Sponsorship Payment";

/// Processor fee for a charge of `amount_cents`
pub fn processor_fee(amount_cents: i64, fee: FeeSchedule) -> i64 {
    (amount_cents * i64::from(fee.bps) + 5_000) / 10_000 + fee.fixed_cents
}

/// How a booking charge is divided between processor fee and host payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingSplit {
    pub total_cents: i64,
    pub fee_cents: i64,
    pub host_cents: i64,
}

/// Split a booking charge; the host receives whatever the fee leaves
pub fn booking_split(total_cents: i64, fee: FeeSchedule) -> BookingSplit {
    let fee_cents = processor_fee(total_cents, fee);
    BookingSplit {
        total_cents,
        fee_cents,
        host_cents: total_cents - fee_cents,
    }
}

/// Idempotency key for a booking's intent
pub fn booking_idempotency_key(id: BookingId) -> String {
    format!("booking_intent_{id}")
}

/// Idempotency key for a sponsorship's intent
pub fn sponsorship_idempotency_key(id: SponsorshipId) -> String {
    format!("sponsored_intent_{id}")
}

/// Generate a local transaction id, `tran_<millis>_<8 hex>`
pub fn new_transaction_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("tran_{}_{}", now.timestamp_millis(), &suffix[..8])
}

/// Result of a booking intent request
#[derive(Debug, Clone, Serialize)]
pub struct BookingIntent {
    pub booking_id: BookingId,
    pub payment_id: PaymentId,
    pub transaction_id: String,
    pub amount_cents: i64,
    pub split: BookingSplit,
    pub intent: PaymentIntent,
}

/// Result of a sponsorship intent request
#[derive(Debug, Clone, Serialize)]
pub struct SponsorshipIntent {
    pub sponsorship_id: SponsorshipId,
    pub payment_id: PaymentId,
    pub transaction_id: String,
    pub amount_cents: i64,
    pub intent: PaymentIntent,
}

/// Builds processor intents for bookings and sponsorships
#[derive(Clone)]
pub struct IntentBuilder {
    ledger: Ledger,
    provider: Arc<dyn PaymentProvider>,
    config: PaymentsConfig,
}

impl IntentBuilder {
    /// Create a new intent builder
    pub fn new(ledger: Ledger, provider: Arc<dyn PaymentProvider>, config: PaymentsConfig) -> Self {
        Self {
            ledger,
            provider,
            config,
        }
    }

    // =========================================================================
    // Bookings
    // =========================================================================

    /// Request a payment intent for `requester` to book `event_id`
    #[instrument(skip(self), fields(user = %requester, event = %event_id))]
    pub async fn create_booking_intent(
        &self,
        requester: UserId,
        event_id: EventId,
    ) -> PaymentsResult<BookingIntent> {
        let start = Instant::now();
        let result = self.booking_intent(requester, event_id).await;
        record_outcome("create_booking_intent", "booking", start, result.is_ok());
        result
    }

    async fn booking_intent(
        &self,
        requester: UserId,
        event_id: EventId,
    ) -> PaymentsResult<BookingIntent> {
        let event = self
            .ledger
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(PaymentsError::NotFound("event"))?;

        let user = self
            .ledger
            .users
            .find_by_id(requester)
            .await?
            .ok_or(PaymentsError::NotFound("user"))?;

        if !user.is_verified {
            return Err(PaymentsError::Forbidden(
                "Please verify your profile first".into(),
            ));
        }

        if self
            .ledger
            .bookings
            .find_for_user_event(requester, event_id, BookingStatus::Confirmed)
            .await?
            .is_some()
        {
            return Err(PaymentsError::Conflict(
                "You have already booked this event".into(),
            ));
        }

        let host = self
            .ledger
            .users
            .find_by_id(event.host_id)
            .await?
            .ok_or(PaymentsError::NotFound("host"))?;

        let destination = match host.payout_account_id.as_deref() {
            Some(account) if host.has_payout_account() => account.to_string(),
            _ => {
                return Err(PaymentsError::Forbidden(
                    "Host hasn't registered payouts!".into(),
                ))
            }
        };

        if event.visibility == EventVisibility::Private
            && !self
                .ledger
                .events
                .has_approved_join_request(event_id, requester)
                .await?
        {
            return Err(PaymentsError::Forbidden("Approval required!".into()));
        }

        if event.price_cents <= 0 {
            return Err(PaymentsError::BadRequest(
                "Free events cannot be paid for".into(),
            ));
        }
        if booking_split(event.price_cents, self.config.fee).host_cents <= 0 {
            return Err(PaymentsError::BadRequest(
                "Ticket price does not cover processing fees".into(),
            ));
        }

        let booking = match self
            .ledger
            .bookings
            .find_for_user_event(requester, event_id, BookingStatus::Pending)
            .await?
        {
            Some(existing) => {
                debug!(booking_id = %existing.id, "Reusing pending booking");
                existing
            }
            None => self
                .ledger
                .bookings
                .create(CreateBooking {
                    id: BookingId::new(),
                    event_id,
                    user_id: requester,
                })
                .await
                .map_err(conflict_on_duplicate)?,
        };

        let payment = self
            .pending_payment(
                PaymentOwner::Booking(booking.id),
                requester,
                event.price_cents,
            )
            .await?;

        if booking.payment_id != Some(payment.id) {
            self.ledger.bookings.set_payment(booking.id, payment.id).await?;
        }

        let amount = payment.amount_cents;
        let split = booking_split(amount, self.config.fee);

        let mut metadata = BTreeMap::new();
        metadata.insert(META_PAYMENT.to_string(), payment.id.to_string());
        metadata.insert(META_BOOKING.to_string(), booking.id.to_string());
        metadata.insert(META_TRANSACTION.to_string(), payment.transaction_id.clone());

        let request = IntentRequest {
            amount_cents: amount,
            currency: self.config.currency.clone(),
            metadata,
            transfer: Some(Transfer {
                destination,
                amount_cents: split.host_cents,
            }),
            receipt_email: user.email.clone(),
            description: None,
        };

        let intent = self
            .provider
            .create_payment_intent(&request, &booking_idempotency_key(booking.id))
            .await?;

        info!(
            booking_id = %booking.id,
            payment_id = %payment.id,
            intent_id = %intent.id,
            "Booking intent created"
        );

        Ok(BookingIntent {
            booking_id: booking.id,
            payment_id: payment.id,
            transaction_id: payment.transaction_id,
            amount_cents: amount,
            split,
            intent,
        })
    }

    // =========================================================================
    // Sponsorships
    // =========================================================================

    /// Request a payment intent for `requester` to promote `event_id` with `package_id`
    #[instrument(skip(self), fields(user = %requester, event = %event_id, package = %package_id))]
    pub async fn create_sponsorship_intent(
        &self,
        requester: UserId,
        event_id: EventId,
        package_id: PackageId,
    ) -> PaymentsResult<SponsorshipIntent> {
        let start = Instant::now();
        let result = self
            .sponsorship_intent(requester, event_id, package_id)
            .await;
        record_outcome("create_sponsorship_intent", "sponsorship", start, result.is_ok());
        result
    }

    async fn sponsorship_intent(
        &self,
        requester: UserId,
        event_id: EventId,
        package_id: PackageId,
    ) -> PaymentsResult<SponsorshipIntent> {
        let package = self
            .ledger
            .packages
            .find_by_id(package_id)
            .await?
            .ok_or(PaymentsError::NotFound("package"))?;

        let event = self
            .ledger
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(PaymentsError::NotFound("event"))?;

        if !event.is_hosted_by(requester) {
            return Err(PaymentsError::Forbidden(
                "Only the host can promote this event".into(),
            ));
        }

        let user = self
            .ledger
            .users
            .find_by_id(requester)
            .await?
            .ok_or(PaymentsError::NotFound("user"))?;

        if !user.is_verified {
            return Err(PaymentsError::Forbidden(
                "Please verify your profile first".into(),
            ));
        }

        if package.price_cents <= 0 {
            return Err(PaymentsError::BadRequest("Package has no price".into()));
        }

        if self
            .ledger
            .sponsorships
            .find_active(requester, event_id, package.kind, Utc::now())
            .await?
            .is_some()
        {
            return Err(PaymentsError::Conflict(format!(
                "Event is already {}",
                package.kind.label().to_lowercase()
            )));
        }

        let sponsorship = match self
            .ledger
            .sponsorships
            .find_pending(requester, event_id, package.kind)
            .await?
        {
            Some(existing) => {
                debug!(sponsorship_id = %existing.id, "Reusing pending sponsorship");
                existing
            }
            None => {
                self.ledger
                    .sponsorships
                    .create(CreateSponsorship {
                        id: SponsorshipId::new(),
                        event_id,
                        user_id: requester,
                        package_id: package.id,
                        kind: package.kind,
                        amount_cents: package.price_cents,
                    })
                    .await?
            }
        };

        let payment = self
            .pending_payment(
                PaymentOwner::Sponsorship(sponsorship.id),
                requester,
                sponsorship.amount_cents,
            )
            .await?;

        if sponsorship.payment_id != Some(payment.id) {
            self.ledger
                .sponsorships
                .set_payment(sponsorship.id, payment.id)
                .await?;
        }

        let amount = payment.amount_cents;

        let mut metadata = BTreeMap::new();
        metadata.insert(META_SPONSORED.to_string(), sponsorship.id.to_string());
        metadata.insert(META_PACKAGE.to_string(), sponsorship.package_id.to_string());
        metadata.insert(META_EVENT.to_string(), event_id.to_string());
        metadata.insert(META_PAYMENT.to_string(), payment.id.to_string());

        let request = IntentRequest {
            amount_cents: amount,
            currency: self.config.currency.clone(),
            metadata,
            transfer: None,
            receipt_email: user.email.clone(),
            description: Some(SPONSORSHIP_DESCRIPTION.to_string()),
        };

        let intent = self
            .provider
            .create_payment_intent(&request, &sponsorship_idempotency_key(sponsorship.id))
            .await?;

        info!(
            sponsorship_id = %sponsorship.id,
            payment_id = %payment.id,
            kind = %sponsorship.kind,
            intent_id = %intent.id,
            "Sponsorship intent created"
        );

        Ok(SponsorshipIntent {
            sponsorship_id: sponsorship.id,
            payment_id: payment.id,
            transaction_id: payment.transaction_id,
            amount_cents: amount,
            intent,
        })
    }

    /// Reuse the owner's pending payment or create one for `amount_cents`
    async fn pending_payment(
        &self,
        owner: PaymentOwner,
        user_id: UserId,
        amount_cents: i64,
    ) -> PaymentsResult<Payment> {
        if let Some(existing) = self.ledger.payments.find_pending_for_owner(owner).await? {
            debug!(payment_id = %existing.id, "Reusing pending payment");
            return Ok(existing);
        }

        let payment = self
            .ledger
            .payments
            .create(CreatePayment {
                id: PaymentId::new(),
                owner,
                user_id,
                amount_cents,
                transaction_id: new_transaction_id(Utc::now()),
            })
            .await?;
        Ok(payment)
    }
}

/// A concurrent request confirmed or created the same booking first
fn conflict_on_duplicate(err: DbError) -> PaymentsError {
    match err {
        DbError::Duplicate(msg) => PaymentsError::Conflict(msg),
        other => PaymentsError::Database(other),
    }
}

fn record_outcome(operation: &'static str, product: &'static str, start: Instant, ok: bool) {
    let result = if ok { "success" } else { "error" };
    if ok {
        metrics::counter!("payments_intents_created_total", "product" => product).increment(1);
    }
    metrics::histogram!(
        "payments_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_rounds_half_up_plus_fixed() {
        let fee = FeeSchedule::default();
        // 2.9% of 10_000 = 290
        assert_eq!(processor_fee(10_000, fee), 320);
        // 2.9% of 1_050 = 30.45 -> 30
        assert_eq!(processor_fee(1_050, fee), 60);
        // 2.9% of 50 = 1.45 -> 1
        assert_eq!(processor_fee(50, fee), 31);
        // 2.9% of 1_500 = 43.5 -> 44
        assert_eq!(processor_fee(1_500, fee), 74);
    }

    #[test]
    fn test_split_routes_remainder_to_host() {
        let split = booking_split(10_000, FeeSchedule::default());
        assert_eq!(split.fee_cents, 320);
        assert_eq!(split.host_cents, 9_680);
        assert_eq!(split.fee_cents + split.host_cents, split.total_cents);
    }

    #[test]
    fn test_split_with_custom_schedule() {
        let split = booking_split(2_000, FeeSchedule { bps: 500, fixed_cents: 0 });
        assert_eq!(split.fee_cents, 100);
        assert_eq!(split.host_cents, 1_900);
    }

    #[test]
    fn test_idempotency_keys_are_stable() {
        let booking = BookingId::new();
        assert_eq!(booking_idempotency_key(booking), booking_idempotency_key(booking));
        assert_eq!(
            booking_idempotency_key(booking),
            format!("booking_intent_{booking}")
        );

        let sponsorship = SponsorshipId::new();
        assert_eq!(
            sponsorship_idempotency_key(sponsorship),
            format!("sponsored_intent_{sponsorship}")
        );
    }

    #[test]
    fn test_transaction_id_format() {
        let now = Utc::now();
        let id = new_transaction_id(now);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "tran");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_transaction_id(now));
    }
}
