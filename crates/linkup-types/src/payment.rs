//! Payment types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BookingId, PaymentId, SponsorshipId, UserId};

string_enum! {
    /// Payment status
    ///
    /// Transitions are one-directional: `PENDING` to exactly one terminal
    /// status, never reverted.
    pub enum PaymentStatus as "payment status" {
        /// Intent requested, not settled
        Pending => "PENDING",
        /// Settled successfully
        Paid => "PAID",
        /// Processor reported failure
        Failed => "FAILED",
        /// Intent was cancelled
        Canceled => "CANCELED" | "CANCELLED",
    }
}

impl PaymentStatus {
    /// Whether the status is final
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// The ledger entity a payment settles
///
/// A payment belongs to exactly one booking or one sponsorship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PaymentOwner {
    /// Event booking
    Booking(BookingId),
    /// Event sponsorship or boost
    Sponsorship(SponsorshipId),
}

/// A payment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Payment ID
    pub id: PaymentId,
    /// Owning ledger entity
    pub owner: PaymentOwner,
    /// Paying user
    pub user_id: UserId,
    /// Charged amount in cents
    pub amount_cents: i64,
    /// Locally generated transaction id
    pub transaction_id: String,
    /// Status
    pub status: PaymentStatus,
    /// Processor intent id, filled in on reconciliation
    pub intent_id: Option<String>,
    /// Processor payment method id
    pub payment_method_id: Option<String>,
    /// Email the processor sent the receipt to
    pub receipt_email: Option<String>,
    /// Receipt URL from the settled charge
    pub receipt_url: Option<String>,
    /// Currency (lowercase ISO code)
    pub currency: Option<String>,
    /// When the payment was created
    pub created_at: DateTime<Utc>,
    /// When the payment was last updated
    pub updated_at: DateTime<Utc>,
}
