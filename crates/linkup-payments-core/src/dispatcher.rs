//! Side-effect dispatcher
//!
//! Reconciliation enqueues one job per applied transition. A background
//! worker drains the queue, loads the event and recipient, composes the
//! notification (and email where one exists) and delivers them with retry.
//! Nothing here can fail a webhook request: enqueueing never blocks and
//! delivery failures end in a log line and a metric.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use linkup_types::{Booking, BookingId, Event, Sponsorship, SponsorshipId, User};

use crate::ledger::Ledger;
use crate::notifier::{EmailMessage, Notifier, PersonalNotification};
use crate::retry::{retry_delivery, RetryConfig};

const NOTIFICATION_TYPE: &str = "EVENT";
const SPONSOR_NAME: &str = "LinkUp";

/// Ledger product a payment settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Booking,
    Sponsorship,
}

impl Product {
    /// Label used in logs and metrics
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Sponsorship => "sponsorship",
        }
    }
}

/// Processor outcome applied by reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Succeeded,
    Failed,
    Canceled,
}

impl Outcome {
    /// Label used in logs and metrics
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

/// A reconciled transition whose side effects still need to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffectJob {
    Booking {
        booking_id: BookingId,
        outcome: Outcome,
    },
    Sponsorship {
        sponsorship_id: SponsorshipId,
        outcome: Outcome,
    },
}

impl SideEffectJob {
    /// Product the job belongs to
    pub const fn product(&self) -> Product {
        match self {
            Self::Booking { .. } => Product::Booking,
            Self::Sponsorship { .. } => Product::Sponsorship,
        }
    }

    /// Outcome the job reports
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::Booking { outcome, .. } | Self::Sponsorship { outcome, .. } => *outcome,
        }
    }
}

/// Messages composed for one job
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedMessages {
    pub notification: PersonalNotification,
    pub email: Option<EmailMessage>,
}

/// What happened to a job's messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    /// Context could not be loaded; nothing was sent
    pub skipped: bool,
    pub notification_delivered: bool,
    /// `None` when the job has no email
    pub email_delivered: Option<bool>,
}

// =============================================================================
// Queue
// =============================================================================

/// Producer side of the side-effect queue
#[derive(Clone, Debug)]
pub struct SideEffectDispatcher {
    tx: mpsc::Sender<SideEffectJob>,
}

impl SideEffectDispatcher {
    /// Start the background worker with a queue of `buffer_size` jobs
    ///
    /// Returns the dispatcher and a handle to the worker task.
    pub fn spawn(worker: SideEffectWorker, buffer_size: usize) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));

        let handle = DispatcherHandle {
            task: tokio::spawn(Self::run_background(worker, rx)),
        };

        (Self { tx }, handle)
    }

    /// Build a dispatcher over an existing channel; the caller drains `rx`
    pub fn from_sender(tx: mpsc::Sender<SideEffectJob>) -> Self {
        Self { tx }
    }

    /// Queue a job without waiting; returns whether it was accepted
    pub fn enqueue(&self, job: SideEffectJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => {
                debug!(?job, "Side effect queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(?job, "Side-effect queue full, dropping job");
                metrics::counter!("payments_side_effects_total", "channel" => "queue", "status" => "dropped")
                    .increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                error!(?job, "Side-effect worker stopped, dropping job");
                metrics::counter!("payments_side_effects_total", "channel" => "queue", "status" => "closed")
                    .increment(1);
                false
            }
        }
    }

    async fn run_background(worker: SideEffectWorker, mut rx: mpsc::Receiver<SideEffectJob>) {
        while let Some(job) = rx.recv().await {
            worker.process(job).await;
        }
        info!("Side-effect worker drained and stopped");
    }
}

/// Handle for the background worker task
pub struct DispatcherHandle {
    task: tokio::task::JoinHandle<()>,
}

impl DispatcherHandle {
    /// Wait for the worker to finish once every dispatcher clone is dropped
    pub async fn shutdown(self) {
        let _ = self.task.await;
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Loads job context, composes and delivers messages
#[derive(Clone)]
pub struct SideEffectWorker {
    ledger: Ledger,
    notifier: Arc<dyn Notifier>,
    retry: RetryConfig,
    support_email: String,
}

impl SideEffectWorker {
    /// Create a new worker
    pub fn new(
        ledger: Ledger,
        notifier: Arc<dyn Notifier>,
        retry: RetryConfig,
        support_email: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            notifier,
            retry,
            support_email: support_email.into(),
        }
    }

    /// Run one job to completion; never fails
    pub async fn process(&self, job: SideEffectJob) -> DeliveryReport {
        let messages = match self.compose(job).await {
            Ok(Some(messages)) => messages,
            Ok(None) => {
                warn!(?job, "Side-effect context missing, skipping");
                record("context", "skipped");
                return DeliveryReport {
                    skipped: true,
                    ..DeliveryReport::default()
                };
            }
            Err(e) => {
                error!(?job, error = %e, "Failed to load side-effect context");
                record("context", "error");
                return DeliveryReport {
                    skipped: true,
                    ..DeliveryReport::default()
                };
            }
        };

        let notification = &messages.notification;
        let (result, attempts) =
            retry_delivery(&self.retry, || self.notifier.send_personal(notification)).await;
        let notification_delivered = match result {
            Ok(()) => {
                record("notification", "delivered");
                true
            }
            Err(e) => {
                error!(
                    ?job,
                    user = %notification.user,
                    title = %notification.title,
                    attempts,
                    error = %e,
                    "Notification delivery failed"
                );
                record("notification", "failed");
                false
            }
        };

        let email_delivered = match &messages.email {
            None => None,
            Some(email) => {
                let (result, attempts) =
                    retry_delivery(&self.retry, || self.notifier.send_email(email)).await;
                Some(match result {
                    Ok(()) => {
                        record("email", "delivered");
                        true
                    }
                    Err(e) => {
                        error!(
                            ?job,
                            to = %email.to,
                            template = %email.template_name,
                            attempts,
                            error = %e,
                            "Email delivery failed"
                        );
                        record("email", "failed");
                        false
                    }
                })
            }
        };

        DeliveryReport {
            skipped: false,
            notification_delivered,
            email_delivered,
        }
    }

    /// Load the records a job refers to and compose its messages
    async fn compose(&self, job: SideEffectJob) -> Result<Option<ComposedMessages>, linkup_db::DbError> {
        match job {
            SideEffectJob::Booking {
                booking_id,
                outcome,
            } => {
                let Some(booking) = self.ledger.bookings.find_by_id(booking_id).await? else {
                    return Ok(None);
                };
                let Some(event) = self.ledger.events.find_by_id(booking.event_id).await? else {
                    return Ok(None);
                };
                let Some(user) = self.ledger.users.find_by_id(booking.user_id).await? else {
                    return Ok(None);
                };
                Ok(Some(booking_messages(
                    outcome,
                    &booking,
                    &event,
                    &user,
                    &self.support_email,
                )))
            }
            SideEffectJob::Sponsorship {
                sponsorship_id,
                outcome,
            } => {
                let Some(sponsorship) = self.ledger.sponsorships.find_by_id(sponsorship_id).await?
                else {
                    return Ok(None);
                };
                let Some(event) = self.ledger.events.find_by_id(sponsorship.event_id).await? else {
                    return Ok(None);
                };
                let Some(host) = self.ledger.users.find_by_id(sponsorship.user_id).await? else {
                    return Ok(None);
                };
                Ok(Some(sponsorship_messages(
                    outcome,
                    &sponsorship,
                    &event,
                    &host,
                    &self.support_email,
                )))
            }
        }
    }
}

fn record(channel: &'static str, status: &'static str) {
    metrics::counter!("payments_side_effects_total", "channel" => channel, "status" => status)
        .increment(1);
}

// =============================================================================
// Message composition
// =============================================================================

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

/// `1234` cents as `12.34`
fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn event_data(event: &Event) -> serde_json::Value {
    json!({
        "eventId": event.id,
        "image": event.cover_image(),
    })
}

/// Messages for a booking outcome, addressed to the booking user
pub fn booking_messages(
    outcome: Outcome,
    booking: &Booking,
    event: &Event,
    user: &User,
    support_email: &str,
) -> ComposedMessages {
    let (title, description) = match outcome {
        Outcome::Succeeded => (
            "Your booking is confirmed!🎉".to_string(),
            format!(
                "Your booking for \"{}\" is confirmed. See you at {}!",
                event.title, event.venue
            ),
        ),
        Outcome::Failed => (
            "Your booking payment failed!❌".to_string(),
            format!(
                "Hey {} your payment for \"{}\" has been failed!",
                user.full_name, event.title
            ),
        ),
        Outcome::Canceled => (
            "Your booking has been cancelled❌".to_string(),
            format!("Hey, your booking for \"{}\" has been cancelled.", event.title),
        ),
    };

    let email = match (outcome, user.email.as_deref()) {
        (Outcome::Succeeded, Some(to)) => Some(EmailMessage {
            to: to.to_string(),
            subject: format!("LinkUp - Your booking for {} is confirmed", event.title),
            template_name: "bookingConfirmation".to_string(),
            template_data: json!({
                "user_name": user.full_name,
                "event_title": event.title,
                "event_venue": event.venue,
                "eventId": event.id,
                "bookingId": booking.id,
                "event_date": format_date(event.event_start),
                "support_email": support_email,
            }),
        }),
        _ => None,
    };

    ComposedMessages {
        notification: PersonalNotification {
            user: user.id,
            title,
            description,
            kind: NOTIFICATION_TYPE.to_string(),
            data: event_data(event),
        },
        email,
    }
}

/// Messages for a sponsorship outcome, addressed to the host
pub fn sponsorship_messages(
    outcome: Outcome,
    sponsorship: &Sponsorship,
    event: &Event,
    host: &User,
    support_email: &str,
) -> ComposedMessages {
    let label = sponsorship.kind.label();
    let (title, description) = match outcome {
        Outcome::Succeeded => (
            format!("Congratulations! Your event {label}!🎉"),
            format!(
                "Your event has successfully {label}. Now your event will get more reach to the visitors."
            ),
        ),
        Outcome::Failed => (
            format!("Your event {label} payment failed!❌"),
            format!(
                "Hey {} your payment for \"{}\" {} has been failed!",
                host.full_name,
                event.title,
                label.to_lowercase()
            ),
        ),
        Outcome::Canceled => (
            "Your event sponsorship has been cancelled❌".to_string(),
            format!(
                "Hey, your event sponsorship for \"{}\" has been cancelled.",
                event.title
            ),
        ),
    };

    let email = match (outcome, host.email.as_deref()) {
        (Outcome::Succeeded, Some(to)) => {
            let template = match sponsorship.kind {
                linkup_types::PromotionKind::Sponsored => "eventSponsoredUpdate",
                linkup_types::PromotionKind::Boosted => "eventBoostedUpdate",
            };
            Some(EmailMessage {
                to: to.to_string(),
                subject: format!("LinkUp - Your event {label} payment is successful"),
                template_name: template.to_string(),
                template_data: json!({
                    "event_title": event.title,
                    "event_venue": event.venue,
                    "eventId": event.id,
                    "event_date": format_date(event.event_start),
                    "sponsor_name": SPONSOR_NAME,
                    "support_email": support_email,
                    "amount": format_amount(sponsorship.amount_cents),
                    "currency": sponsorship
                        .currency
                        .as_deref()
                        .unwrap_or("usd")
                        .to_ascii_uppercase(),
                    "date": format_date(sponsorship.start_date.unwrap_or(sponsorship.created_at)),
                }),
            })
        }
        _ => None,
    };

    ComposedMessages {
        notification: PersonalNotification {
            user: host.id,
            title,
            description,
            kind: NOTIFICATION_TYPE.to_string(),
            data: event_data(event),
        },
        email,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use linkup_types::{
        BookingStatus, EventId, EventVisibility, PackageId, PromotionKind, Role, SponsorStatus,
        UserId,
    };

    fn event() -> Event {
        let start = Utc.with_ymd_and_hms(2026, 3, 14, 18, 0, 0).unwrap();
        Event {
            id: EventId::new(),
            host_id: UserId::new(),
            title: "Rust Meetup".into(),
            venue: "Hall 4".into(),
            images: vec!["cover.png".into()],
            price_cents: 2_500,
            visibility: EventVisibility::Public,
            boosted: false,
            event_start: start,
            event_end: start + chrono::Duration::hours(3),
            created_at: start - chrono::Duration::days(30),
        }
    }

    fn user(email: Option<&str>) -> User {
        User {
            id: UserId::new(),
            full_name: "Sam Host".into(),
            email: email.map(str::to_string),
            role: Role::User,
            is_verified: true,
            payout_account_id: None,
            created_at: Utc::now(),
        }
    }

    fn sponsorship(kind: PromotionKind, event: &Event, host: &User) -> Sponsorship {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Sponsorship {
            id: SponsorshipId::new(),
            event_id: event.id,
            user_id: host.id,
            package_id: PackageId::new(),
            payment_id: None,
            kind,
            status: SponsorStatus::Approved,
            amount_cents: 4_999,
            currency: Some("usd".into()),
            start_date: Some(start),
            end_date: Some(start + chrono::Duration::days(7)),
            created_at: start,
        }
    }

    #[test]
    fn test_boost_success_messages() {
        let event = event();
        let host = user(Some("host@example.com"));
        let s = sponsorship(PromotionKind::Boosted, &event, &host);

        let messages = sponsorship_messages(Outcome::Succeeded, &s, &event, &host, "help@linkup.app");
        assert_eq!(messages.notification.title, "Congratulations! Your event Boosted!🎉");
        assert_eq!(messages.notification.user, host.id);
        assert_eq!(messages.notification.kind, "EVENT");
        assert_eq!(messages.notification.data["image"], "cover.png");

        let email = messages.email.unwrap();
        assert_eq!(email.subject, "LinkUp - Your event Boosted payment is successful");
        assert_eq!(email.template_name, "eventBoostedUpdate");
        assert_eq!(email.template_data["amount"], "49.99");
        assert_eq!(email.template_data["currency"], "USD");
        assert_eq!(email.template_data["sponsor_name"], "LinkUp");
        assert_eq!(email.template_data["date"], "March 1, 2026");
        assert_eq!(email.template_data["event_date"], "March 14, 2026");
    }

    #[test]
    fn test_sponsorship_failure_has_no_email() {
        let event = event();
        let host = user(Some("host@example.com"));
        let s = sponsorship(PromotionKind::Sponsored, &event, &host);

        let messages = sponsorship_messages(Outcome::Failed, &s, &event, &host, "help@linkup.app");
        assert_eq!(messages.notification.title, "Your event Sponsored payment failed!❌");
        assert_eq!(
            messages.notification.description,
            "Hey Sam Host your payment for \"Rust Meetup\" sponsored has been failed!"
        );
        assert!(messages.email.is_none());

        let cancelled = sponsorship_messages(Outcome::Canceled, &s, &event, &host, "x");
        assert_eq!(
            cancelled.notification.title,
            "Your event sponsorship has been cancelled❌"
        );
    }

    #[test]
    fn test_booking_confirmation_email_needs_address() {
        let event = event();
        let booking = Booking {
            id: BookingId::new(),
            event_id: event.id,
            user_id: UserId::new(),
            status: BookingStatus::Confirmed,
            payment_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let with_email = booking_messages(
            Outcome::Succeeded,
            &booking,
            &event,
            &user(Some("guest@example.com")),
            "help@linkup.app",
        );
        let email = with_email.email.unwrap();
        assert_eq!(email.template_name, "bookingConfirmation");
        assert_eq!(email.template_data["support_email"], "help@linkup.app");

        let without = booking_messages(Outcome::Succeeded, &booking, &event, &user(None), "x");
        assert!(without.email.is_none());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(123_456), "1234.56");
        assert_eq!(format_amount(-250), "-2.50");
    }

    #[test]
    fn test_job_labels() {
        let job = SideEffectJob::Sponsorship {
            sponsorship_id: SponsorshipId::new(),
            outcome: Outcome::Canceled,
        };
        assert_eq!(job.product(), Product::Sponsorship);
        assert_eq!(job.outcome().as_str(), "canceled");
    }

    #[tokio::test]
    async fn test_enqueue_reports_full_queue() {
        let (tx, mut rx) = mpsc::channel(1);
        let dispatcher = SideEffectDispatcher::from_sender(tx);
        let job = SideEffectJob::Booking {
            booking_id: BookingId::new(),
            outcome: Outcome::Succeeded,
        };

        assert!(dispatcher.enqueue(job));
        assert!(!dispatcher.enqueue(job));
        assert_eq!(rx.recv().await, Some(job));
    }
}
