//! REST API handlers

pub mod bookings;
pub mod dashboard;
pub mod health;
pub mod payments;
pub mod shared;
pub mod sponsorships;
pub mod trending;
pub mod webhook;

pub use bookings::*;
pub use dashboard::*;
pub use health::*;
pub use payments::*;
pub use sponsorships::*;
pub use trending::*;
pub use webhook::*;
