//! Stripe payment provider implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, instrument};

use crate::config::PaymentsConfig;
use crate::error::{PaymentsError, PaymentsResult};
use crate::provider::{IntentRequest, PaymentIntent, PaymentProvider};

/// Stripe payment provider
#[derive(Clone)]
pub struct StripeProvider {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl StripeProvider {
    /// Create a new Stripe provider
    pub fn new(config: &PaymentsConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            secret_key: config.stripe_secret_key.clone(),
            api_base: config.stripe_api_base.clone(),
        }
    }

    /// Make authenticated request to Stripe
    async fn stripe_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        form: Option<&[(String, String)]>,
        idempotency_key: Option<&str>,
    ) -> PaymentsResult<T> {
        let url = format!("{}{endpoint}", self.api_base);

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.secret_key, Option::<&str>::None);

        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        if let Some(form_data) = form {
            request = request.form(form_data);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Stripe API request failed");
            PaymentsError::Provider(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Stripe API error");
            return Err(PaymentsError::Provider(format!(
                "Stripe API error: {status}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Stripe response");
            PaymentsError::Provider(e.to_string())
        })
    }
}

/// Encode an intent request as Stripe form fields
pub(crate) fn intent_form(request: &IntentRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), request.amount_cents.to_string()),
        ("currency".to_string(), request.currency.clone()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    if let Some(transfer) = &request.transfer {
        form.push((
            "transfer_data[destination]".to_string(),
            transfer.destination.clone(),
        ));
        form.push((
            "transfer_data[amount]".to_string(),
            transfer.amount_cents.to_string(),
        ));
    }

    if let Some(email) = &request.receipt_email {
        form.push(("receipt_email".to_string(), email.clone()));
    }

    if let Some(description) = &request.description {
        form.push(("description".to_string(), description.clone()));
    }

    form
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    #[instrument(skip(self, request), fields(amount = request.amount_cents))]
    async fn create_payment_intent(
        &self,
        request: &IntentRequest,
        idempotency_key: &str,
    ) -> PaymentsResult<PaymentIntent> {
        debug!(idempotency_key = %idempotency_key, "Creating payment intent");

        let form = intent_form(request);
        let intent: StripePaymentIntent = self
            .stripe_request(
                reqwest::Method::POST,
                "/payment_intents",
                Some(&form),
                Some(idempotency_key),
            )
            .await?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
        })
    }
}

// Stripe API response types

/// Stripe payment intent
#[derive(Debug, Clone, Deserialize)]
pub struct StripePaymentIntent {
    /// Intent ID
    pub id: String,
    /// Client secret
    pub client_secret: Option<String>,
    /// Amount in cents
    pub amount: i64,
    /// Currency
    pub currency: String,
    /// Intent status
    pub status: String,
}
