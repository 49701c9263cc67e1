//! Stripe webhook handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use linkup_payments_core::WebhookEndpoint;

use crate::state::AppState;

/// Header carrying the Stripe signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /webhooks/stripe/booking
pub async fn booking_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    receive(&state, WebhookEndpoint::Booking, &headers, &body).await
}

/// POST /webhooks/stripe/sponsored
pub async fn sponsored_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    receive(&state, WebhookEndpoint::Sponsored, &headers, &body).await
}

/// Verify and reconcile one delivery.
///
/// 400 only for a missing or bad signature; every other outcome, including
/// an unreadable payload, is acknowledged so Stripe stops redelivering.
async fn receive(
    state: &AppState,
    endpoint: WebhookEndpoint,
    headers: &HeaderMap,
    body: &[u8],
) -> StatusCode {
    let Some(sig_header) = headers.get(SIGNATURE_HEADER) else {
        tracing::warn!(endpoint = endpoint.as_str(), "Missing Stripe-Signature header");
        return StatusCode::BAD_REQUEST;
    };

    let Ok(signature) = sig_header.to_str() else {
        tracing::warn!(endpoint = endpoint.as_str(), "Invalid Stripe-Signature header encoding");
        return StatusCode::BAD_REQUEST;
    };

    match state.reconciler.handle(endpoint, body, signature).await {
        Ok(outcome) => {
            tracing::debug!(endpoint = endpoint.as_str(), ?outcome, "Webhook acknowledged");
            StatusCode::OK
        }
        Err(e) if e.is_signature_failure() => {
            tracing::warn!(endpoint = endpoint.as_str(), error = %e, "Webhook rejected");
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            tracing::error!(endpoint = endpoint.as_str(), error = %e, "Unreadable webhook payload");
            StatusCode::OK
        }
    }
}
