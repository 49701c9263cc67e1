//! User types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Platform role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular attendee
    User,
    /// Organisation account hosting events
    Organizer,
    /// Platform administrator
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "USER"),
            Self::Organizer => write!(f, "ORGANIZER"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "ORGANIZER" => Ok(Self::Organizer),
            "ADMIN" | "SUPER_ADMIN" => Ok(Self::Admin),
            _ => Err(crate::ParseEnumError::new("role", s)),
        }
    }
}

/// A platform user as seen by the payments ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Display name
    pub full_name: String,
    /// Email address
    pub email: Option<String>,
    /// Role
    pub role: Role,
    /// Whether the profile has been verified
    pub is_verified: bool,
    /// Connected payout account at the processor (hosts only)
    pub payout_account_id: Option<String>,
    /// When the user signed up
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the user can receive booking payouts
    pub fn has_payout_account(&self) -> bool {
        self.payout_account_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }
}
