//! Ledger fixtures over the in-memory store

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::mpsc;

use linkup_db::MemoryStore;
use linkup_payments_core::webhook::{ChargeData, PaymentIntentData};
use linkup_payments_core::{
    IntentBuilder, Ledger, PaymentsConfig, Reconciler, SideEffectDispatcher, SideEffectJob,
    WebhookEvent, WebhookEventData, WebhookEventType,
};
use linkup_types::{
    Event, EventId, EventVisibility, PackageId, PaymentId, PromotionKind, Role,
    SponsorshipPackage, User, UserId,
};

pub const BOOKING_SECRET: &str = "whsec_booking_test";
pub const SPONSORED_SECRET: &str = "whsec_sponsored_test";

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub ledger: Ledger,
    pub config: PaymentsConfig,
    pub provider: super::MockProvider,
    jobs: mpsc::Receiver<SideEffectJob>,
    dispatcher: SideEffectDispatcher,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::from_store(store.clone());
        let (tx, jobs) = mpsc::channel(64);
        Self {
            store,
            ledger,
            config: PaymentsConfig::new("sk_test_123", BOOKING_SECRET, SPONSORED_SECRET),
            provider: super::MockProvider::new(),
            jobs,
            dispatcher: SideEffectDispatcher::from_sender(tx),
        }
    }

    pub fn builder(&self) -> IntentBuilder {
        IntentBuilder::new(
            self.ledger.clone(),
            Arc::new(self.provider.clone()),
            self.config.clone(),
        )
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.ledger.clone(), self.dispatcher.clone(), &self.config)
    }

    /// Side-effect jobs queued so far
    pub fn drain_jobs(&mut self) -> Vec<SideEffectJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.jobs.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    pub fn add_user(&self, verified: bool, payout_account: Option<&str>) -> User {
        let id = UserId::new();
        let user = User {
            id,
            full_name: format!("User {}", &id.to_string()[..8]),
            email: Some(format!("{id}@example.com")),
            role: Role::User,
            is_verified: verified,
            payout_account_id: payout_account.map(str::to_string),
            created_at: Utc::now() - Duration::days(30),
        };
        self.store.insert_user(user.clone());
        user
    }

    /// Verified host with a payout account
    pub fn host(&self) -> User {
        self.add_user(true, Some("acct_host_1"))
    }

    /// Verified attendee
    pub fn guest(&self) -> User {
        self.add_user(true, None)
    }

    pub fn add_event(&self, host: &User, price_cents: i64, visibility: EventVisibility) -> Event {
        let start = Utc::now() + Duration::days(14);
        let event = Event {
            id: EventId::new(),
            host_id: host.id,
            title: "Harbour Jazz Night".into(),
            venue: "Pier 9".into(),
            images: vec!["https://cdn.example.com/jazz.png".into()],
            price_cents,
            visibility,
            boosted: false,
            event_start: start,
            event_end: start + Duration::hours(4),
            created_at: Utc::now() - Duration::days(3),
        };
        self.store.insert_event(event.clone());
        event
    }

    pub fn add_package(&self, kind: PromotionKind, price_cents: i64, days: i32) -> SponsorshipPackage {
        let package = SponsorshipPackage {
            id: PackageId::new(),
            title: format!("{} week", kind.label()),
            benefits: vec!["Top of the feed".into()],
            price_cents,
            kind,
            duration_days: days,
            created_at: Utc::now(),
        };
        self.store.insert_package(package.clone());
        package
    }
}

/// A `payment_intent.*` event carrying `metadata`
pub fn intent_event(event_type: &str, metadata: &[(&str, String)]) -> WebhookEvent {
    WebhookEvent {
        id: format!("evt_{}", uuid::Uuid::new_v4().simple()),
        event_type: WebhookEventType::from(event_type),
        data: WebhookEventData::PaymentIntent(PaymentIntentData {
            intent_id: "pi_test_1".into(),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
            payment_method: Some("pm_card_visa".into()),
            receipt_email: Some("receipt@example.com".into()),
            currency: Some("usd".into()),
            amount: 0,
        }),
        created: Utc::now().timestamp(),
    }
}

/// A `charge.succeeded` event for `payment_id`
pub fn charge_event(payment_id: PaymentId, receipt_url: &str) -> WebhookEvent {
    let mut metadata = HashMap::new();
    metadata.insert("payment".to_string(), payment_id.to_string());
    WebhookEvent {
        id: "evt_charge".into(),
        event_type: WebhookEventType::ChargeSucceeded,
        data: WebhookEventData::Charge(ChargeData {
            charge_id: "ch_1".into(),
            payment_intent: Some("pi_test_1".into()),
            metadata,
            receipt_url: Some(receipt_url.to_string()),
        }),
        created: Utc::now().timestamp(),
    }
}

/// A `charge.succeeded` event carrying `metadata`
pub fn charge_event_with(metadata: &BTreeMap<String, String>, receipt_url: &str) -> WebhookEvent {
    WebhookEvent {
        id: "evt_charge".into(),
        event_type: WebhookEventType::ChargeSucceeded,
        data: WebhookEventData::Charge(ChargeData {
            charge_id: "ch_2".into(),
            payment_intent: Some("pi_test_1".into()),
            metadata: metadata.clone().into_iter().collect(),
            receipt_url: Some(receipt_url.to_string()),
        }),
        created: Utc::now().timestamp(),
    }
}

/// A `payment_intent.*` event echoing the metadata of a created intent
pub fn event_for(event_type: &str, metadata: &BTreeMap<String, String>) -> WebhookEvent {
    let pairs: Vec<(&str, String)> = metadata
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();
    intent_event(event_type, &pairs)
}
