//! Booking types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BookingId, EventId, PaymentId, UserId};

string_enum! {
    /// Booking lifecycle status
    ///
    /// Created `PENDING` when an intent is requested; only webhook
    /// reconciliation moves it on.
    pub enum BookingStatus as "booking status" {
        /// Awaiting payment
        Pending => "PENDING",
        /// Paid and confirmed
        Confirmed => "CONFIRMED",
        /// Payment failed
        Failed => "FAILED",
        /// Payment was cancelled
        Cancelled => "CANCELLED" | "CANCELED",
    }
}

impl BookingStatus {
    /// Whether the booking can still change status
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// A user's booking of an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Booked event
    pub event_id: EventId,
    /// Booking user
    pub user_id: UserId,
    /// Status
    pub status: BookingStatus,
    /// Current payment for this booking
    pub payment_id: Option<PaymentId>,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
    /// When the booking was last updated
    pub updated_at: DateTime<Utc>,
}
