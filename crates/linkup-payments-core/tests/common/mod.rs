//! Common test utilities for linkup-payments-core integration tests

pub mod fixtures;
pub mod mock_provider;
pub mod recording_notifier;

#[allow(unused_imports)]
pub use fixtures::{
    charge_event, charge_event_with, event_for, intent_event, Fixture, BOOKING_SECRET, SPONSORED_SECRET,
};
#[allow(unused_imports)]
pub use mock_provider::MockProvider;
#[allow(unused_imports)]
pub use recording_notifier::RecordingNotifier;
