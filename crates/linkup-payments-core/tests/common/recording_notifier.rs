//! Notifier that records deliveries and can fail on demand

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use linkup_payments_core::notifier::NotifyError;
use linkup_payments_core::{EmailMessage, Notifier, PersonalNotification};

#[derive(Default, Clone)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<PersonalNotification>>>,
    emails: Arc<Mutex<Vec<EmailMessage>>>,
    transient_failures: Arc<AtomicU32>,
    attempts: Arc<AtomicU32>,
    reject_all: Arc<AtomicU32>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` deliveries with a retryable error
    #[allow(dead_code)]
    pub fn fail_next(&self, n: u32) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    /// Reject every delivery with a non-retryable status
    #[allow(dead_code)]
    pub fn reject_all(&self) {
        self.reject_all.store(1, Ordering::SeqCst);
    }

    /// Delivery attempts including failures
    #[allow(dead_code)]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn notifications(&self) -> Vec<PersonalNotification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn emails(&self) -> Vec<EmailMessage> {
        self.emails.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_all.load(Ordering::SeqCst) > 0 {
            return Err(NotifyError::Status(400));
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(NotifyError::Status(503));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_personal(&self, notification: &PersonalNotification) -> Result<(), NotifyError> {
        self.check()?;
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotifyError> {
        self.check()?;
        self.emails.lock().unwrap().push(email.clone());
        Ok(())
    }
}
