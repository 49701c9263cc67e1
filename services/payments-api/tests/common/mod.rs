//! Common test utilities for payments-api integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::mpsc;
use tower::ServiceExt;

use linkup_db::MemoryStore;
use linkup_payments_core::{
    IntentRequest, Ledger, PaymentIntent, PaymentProvider, PaymentsResult, SideEffectDispatcher,
    SideEffectJob,
};
use linkup_types::{Event, EventId, EventVisibility, Role, User, UserId};
use payments_api::extract::{USER_ID_HEADER, USER_ROLE_HEADER};
use payments_api::{build_router, AppState, Config};

pub const BOOKING_SECRET: &str = "whsec_booking_api";
pub const SPONSORED_SECRET: &str = "whsec_sponsored_api";

/// Provider that returns one intent per call
#[derive(Default)]
pub struct StubProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn create_payment_intent(
        &self,
        request: &IntentRequest,
        _idempotency_key: &str,
    ) -> PaymentsResult<PaymentIntent> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            id: format!("pi_api_{n}"),
            client_secret: Some(format!("pi_api_{n}_secret")),
            amount: request.amount_cents,
            currency: request.currency.clone(),
            status: "requires_payment_method".into(),
        })
    }
}

pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://localhost/linkup_test"),
        ("STRIPE_SECRET_KEY", "sk_test_api"),
        ("STRIPE_WEBHOOK_SECRET", BOOKING_SECRET),
        ("STRIPE_SPONSORED_WEBHOOK_SECRET", SPONSORED_SECRET),
    ]);
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

/// Router over an in-memory ledger
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
    jobs: mpsc::Receiver<SideEffectJob>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::from_store(store.clone());
        let (tx, jobs) = mpsc::channel(16);
        let state = AppState::new(
            ledger,
            Arc::new(StubProvider::default()),
            SideEffectDispatcher::from_sender(tx),
            None,
            test_config(),
        );
        Self {
            store,
            router: build_router(state, None),
            jobs,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Side-effect jobs queued so far
    pub fn drain_jobs(&mut self) -> Vec<SideEffectJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.jobs.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    pub fn add_user(&self, role: Role, payout_account: Option<&str>) -> User {
        let user = User {
            id: UserId::new(),
            full_name: "Test User".into(),
            email: Some("user@example.com".into()),
            role,
            is_verified: true,
            payout_account_id: payout_account.map(str::to_string),
            created_at: Utc::now() - Duration::days(10),
        };
        self.store.insert_user(user.clone());
        user
    }

    pub fn add_event(&self, host: &User, price_cents: i64) -> Event {
        let start = Utc::now() + Duration::days(7);
        let event = Event {
            id: EventId::new(),
            host_id: host.id,
            title: "Rooftop Cinema".into(),
            venue: "Level 12".into(),
            images: vec![],
            price_cents,
            visibility: EventVisibility::Public,
            boosted: false,
            event_start: start,
            event_end: start + Duration::hours(3),
            created_at: Utc::now() - Duration::days(1),
        };
        self.store.insert_event(event.clone());
        event
    }
}

/// Request builder with identity headers
pub fn as_user(method: &str, uri: &str, user: &User) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, user.id.to_string())
        .header(USER_ROLE_HEADER, user.role.to_string())
}

pub fn json_body(value: serde_json::Value) -> Body {
    Body::from(serde_json::to_vec(&value).unwrap())
}

pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Generate a Stripe-style signature header
pub fn stripe_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

/// A `payment_intent.*` delivery carrying `metadata`
pub fn intent_payload(event_type: &str, metadata: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": "evt_api_1",
        "type": event_type,
        "created": Utc::now().timestamp(),
        "data": {
            "object": {
                "id": "pi_api_1",
                "metadata": metadata,
                "payment_method": "pm_card_visa",
                "receipt_email": "user@example.com",
                "currency": "usd",
                "amount": 2500
            }
        }
    }))
    .unwrap()
}
