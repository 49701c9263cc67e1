//! Sponsorship and promotion package types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventId, PackageId, PaymentId, SponsorshipId, UserId};

string_enum! {
    /// Paid visibility product applied to an event
    ///
    /// Shared by packages and the sponsorships bought from them.
    pub enum PromotionKind as "promotion kind" {
        /// Listed in the sponsored carousel
        Sponsored => "SPONSORED",
        /// Event is flagged `boosted` while active
        Boosted => "BOOSTED" | "BOOST",
    }
}

impl PromotionKind {
    /// Capitalised name used in notification copy
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Sponsored => "Sponsored",
            Self::Boosted => "Boosted",
        }
    }
}

string_enum! {
    /// Sponsorship lifecycle status
    pub enum SponsorStatus as "sponsor status" {
        /// Awaiting payment
        Pending => "PENDING",
        /// Paid and active until `end_date`
        Approved => "APPROVED",
        /// Window ended
        Expired => "EXPIRED",
        /// Payment failed
        Failed => "FAILED",
        /// Payment was cancelled
        Cancelled => "CANCELLED" | "CANCELED",
    }
}

/// A purchasable promotion package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorshipPackage {
    /// Package ID
    pub id: PackageId,
    /// Title shown to hosts
    pub title: String,
    /// Marketing bullet points
    pub benefits: Vec<String>,
    /// Price in cents
    pub price_cents: i64,
    /// Product kind
    pub kind: PromotionKind,
    /// Active window length in days
    pub duration_days: i32,
    /// When the package was created
    pub created_at: DateTime<Utc>,
}

/// A host's sponsorship or boost of an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sponsorship {
    /// Sponsorship ID
    pub id: SponsorshipId,
    /// Promoted event
    pub event_id: EventId,
    /// Purchasing host
    pub user_id: UserId,
    /// Package the sponsorship was bought from
    pub package_id: PackageId,
    /// Current payment for this sponsorship
    pub payment_id: Option<PaymentId>,
    /// Product kind
    pub kind: PromotionKind,
    /// Status
    pub status: SponsorStatus,
    /// Price paid in cents
    pub amount_cents: i64,
    /// Currency (lowercase ISO code)
    pub currency: Option<String>,
    /// Window start, set on approval
    pub start_date: Option<DateTime<Utc>>,
    /// Window end, set on approval
    pub end_date: Option<DateTime<Utc>>,
    /// When the sponsorship was created
    pub created_at: DateTime<Utc>,
}

impl Sponsorship {
    /// Whether the sponsorship is approved and its window has not passed
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SponsorStatus::Approved && self.end_date.is_some_and(|end| end > now)
    }
}

/// Compute the active window for a sponsorship approved at `start`
pub fn approval_window(start: DateTime<Utc>, duration_days: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    (start, start + Duration::days(i64::from(duration_days)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_boost_alias_parses_to_boosted() {
        assert_eq!("BOOST".parse::<PromotionKind>().unwrap(), PromotionKind::Boosted);
        assert_eq!("boosted".parse::<PromotionKind>().unwrap(), PromotionKind::Boosted);
        assert_eq!(PromotionKind::Boosted.as_str(), "BOOSTED");
        let kind: PromotionKind = serde_json::from_str("\"BOOST\"").unwrap();
        assert_eq!(kind, PromotionKind::Boosted);
    }

    #[test]
    fn test_approval_window_adds_whole_days() {
        let start = Utc.with_ymd_and_hms(2026, 1, 30, 12, 0, 0).unwrap();
        let (s, end) = approval_window(start, 7);
        assert_eq!(s, start);
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 2, 6, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_is_active_requires_approval_and_future_end() {
        let now = Utc::now();
        let mut s = Sponsorship {
            id: SponsorshipId::new(),
            event_id: EventId::new(),
            user_id: UserId::new(),
            package_id: PackageId::new(),
            payment_id: None,
            kind: PromotionKind::Sponsored,
            status: SponsorStatus::Approved,
            amount_cents: 1_000,
            currency: None,
            start_date: Some(now - Duration::days(1)),
            end_date: Some(now + Duration::days(1)),
            created_at: now,
        };
        assert!(s.is_active_at(now));
        s.end_date = Some(now - Duration::seconds(1));
        assert!(!s.is_active_at(now));
        s.end_date = Some(now + Duration::days(1));
        s.status = SponsorStatus::Pending;
        assert!(!s.is_active_at(now));
    }
}
