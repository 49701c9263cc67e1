//! Event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventId, UserId};

string_enum! {
    /// Who may book an event
    pub enum EventVisibility as "event visibility" {
        /// Anyone may book
        Public => "PUBLIC",
        /// Booking requires an approved join request
        Private => "PRIVATE",
    }
}

string_enum! {
    /// Host decision on a private-event join request
    pub enum JoinApproval as "join approval" {
        /// Awaiting host decision
        Pending => "PENDING",
        /// Host approved
        Approved => "APPROVED",
        /// Host rejected
        Rejected => "REJECTED",
    }
}

/// An event as seen by the payments ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Hosting user
    pub host_id: UserId,
    /// Title
    pub title: String,
    /// Venue
    pub venue: String,
    /// Cover images
    pub images: Vec<String>,
    /// Ticket price in cents
    pub price_cents: i64,
    /// Visibility
    pub visibility: EventVisibility,
    /// Whether a boost is currently applied
    pub boosted: bool,
    /// Start time
    pub event_start: DateTime<Utc>,
    /// End time
    pub event_end: DateTime<Utc>,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Whether `user` hosts this event
    pub fn is_hosted_by(&self, user: UserId) -> bool {
        self.host_id == user
    }

    /// First cover image, if any
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}
