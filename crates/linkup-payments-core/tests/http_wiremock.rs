//! Outbound HTTP clients against a mock server

use std::collections::BTreeMap;

use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use linkup_payments_core::notifier::NotifyError;
use linkup_payments_core::{
    EmailMessage, HttpNotifier, IntentRequest, Notifier, PaymentProvider, PaymentsConfig,
    PersonalNotification, StripeProvider, Transfer,
};
use linkup_types::UserId;

fn provider(server: &MockServer) -> StripeProvider {
    let config = PaymentsConfig::new("sk_test_123", "whsec_b", "whsec_s").with_api_base(server.uri());
    StripeProvider::new(&config)
}

fn booking_request() -> IntentRequest {
    let mut metadata = BTreeMap::new();
    metadata.insert("booking".to_string(), "b-1".to_string());
    metadata.insert("payment".to_string(), "p-1".to_string());
    IntentRequest {
        amount_cents: 10_000,
        currency: "usd".to_string(),
        metadata,
        transfer: Some(Transfer {
            destination: "acct_host_1".to_string(),
            amount_cents: 9_680,
        }),
        receipt_email: Some("guest@example.com".to_string()),
        description: None,
    }
}

fn intent_body() -> serde_json::Value {
    json!({
        "id": "pi_3Nabc",
        "object": "payment_intent",
        "client_secret": "pi_3Nabc_secret_xyz",
        "amount": 10_000,
        "currency": "usd",
        "status": "requires_payment_method"
    })
}

#[tokio::test]
async fn test_intent_is_created_with_idempotency_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .and(header("Idempotency-Key", "booking_intent_b-1"))
        .and(header("authorization", "Basic c2tfdGVzdF8xMjM6"))
        .and(body_string_contains("amount=10000"))
        .and(body_string_contains("metadata%5Bbooking%5D=b-1"))
        .and(body_string_contains("transfer_data%5Bdestination%5D=acct_host_1"))
        .and(body_string_contains("transfer_data%5Bamount%5D=9680"))
        .respond_with(ResponseTemplate::new(200).set_body_json(intent_body()))
        .expect(1)
        .mount(&server)
        .await;

    let intent = provider(&server)
        .create_payment_intent(&booking_request(), "booking_intent_b-1")
        .await
        .unwrap();

    assert_eq!(intent.id, "pi_3Nabc");
    assert_eq!(intent.client_secret.as_deref(), Some("pi_3Nabc_secret_xyz"));
    assert_eq!(intent.amount, 10_000);
}

#[tokio::test]
async fn test_stripe_error_status_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": { "type": "card_error", "message": "Your card was declined." }
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .create_payment_intent(&booking_request(), "booking_intent_b-2")
        .await
        .unwrap_err();
    assert!(err.is_provider_error());
}

#[tokio::test]
async fn test_notifier_posts_json() {
    let server = MockServer::start().await;
    let user = UserId::new();

    Mock::given(method("POST"))
        .and(path("/notifications/personal"))
        .and(body_partial_json(json!({
            "user": user.to_string(),
            "title": "Your booking is confirmed!🎉",
            "type": "EVENT"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(json!({ "templateName": "bookingConfirmation" })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = HttpNotifier::new(server.uri());
    notifier
        .send_personal(&PersonalNotification {
            user,
            title: "Your booking is confirmed!🎉".into(),
            description: "See you there".into(),
            kind: "EVENT".into(),
            data: json!({}),
        })
        .await
        .unwrap();
    notifier
        .send_email(&EmailMessage {
            to: "guest@example.com".into(),
            subject: "LinkUp".into(),
            template_name: "bookingConfirmation".into(),
            template_data: json!({}),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_notifier_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = HttpNotifier::new(server.uri())
        .send_email(&EmailMessage {
            to: "guest@example.com".into(),
            subject: "LinkUp".into(),
            template_name: "bookingConfirmation".into(),
            template_data: json!({}),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::Status(503)));
}
