//! Mock payment provider honouring idempotency keys

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;

use linkup_payments_core::{
    IntentRequest, PaymentIntent, PaymentProvider, PaymentsError, PaymentsResult,
};

/// Records every request; one intent per idempotency key
#[derive(Default, Clone)]
pub struct MockProvider {
    intents: Arc<DashMap<String, PaymentIntent>>,
    requests: Arc<Mutex<Vec<(String, IntentRequest)>>>,
    calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail with a provider error
    #[allow(dead_code)]
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Number of calls made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Distinct intents created
    #[allow(dead_code)]
    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }

    /// Every (idempotency key, request) pair seen
    pub fn requests(&self) -> Vec<(String, IntentRequest)> {
        self.requests.lock().unwrap().clone()
    }

    /// Most recent request
    pub fn last_request(&self) -> Option<(String, IntentRequest)> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_payment_intent(
        &self,
        request: &IntentRequest,
        idempotency_key: &str,
    ) -> PaymentsResult<PaymentIntent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((idempotency_key.to_string(), request.clone()));

        if self.failing.load(Ordering::SeqCst) {
            return Err(PaymentsError::Provider("card network unavailable".into()));
        }

        let next = self.intents.len() + 1;
        let intent = self
            .intents
            .entry(idempotency_key.to_string())
            .or_insert_with(|| PaymentIntent {
                id: format!("pi_test_{next}"),
                client_secret: Some(format!("pi_test_{next}_secret")),
                amount: request.amount_cents,
                currency: request.currency.clone(),
                status: "requires_payment_method".to_string(),
            })
            .clone();
        Ok(intent)
    }
}
