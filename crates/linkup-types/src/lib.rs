//! LinkUp Types - Shared domain types
//!
//! This crate contains the ledger's domain types used across LinkUp crates:
//! - Typed identifiers
//! - Users and events as seen by the payments ledger
//! - Bookings, payments, sponsorships and promotion packages

#[macro_use]
mod macros;

pub mod booking;
pub mod error;
pub mod event;
pub mod ids;
pub mod page;
pub mod payment;
pub mod sponsorship;
pub mod user;

pub use booking::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use page::*;
pub use payment::*;
pub use sponsorship::*;
pub use user::*;
