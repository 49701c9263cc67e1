//! Booking handlers

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use linkup_payments_core::BookingSummary;
use linkup_types::{EventId, Page};

use super::shared::{parse_id, record_op_duration, PageQuery};
use crate::error::ApiResult;
use crate::extract::Requester;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBookingIntentRequest {
    pub event_id: String,
}

#[derive(Debug, Serialize)]
pub struct BookingIntentResponse {
    pub booking_id: String,
    pub payment_id: String,
    pub transaction_id: String,
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub fee_cents: i64,
    pub host_cents: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/bookings/intent
pub async fn create_booking_intent(
    State(state): State<AppState>,
    requester: Requester,
    Json(req): Json<CreateBookingIntentRequest>,
) -> ApiResult<Json<BookingIntentResponse>> {
    let start = Instant::now();

    let event_id = parse_id(&req.event_id, "event_id", EventId::parse)?;
    let result = state
        .intents
        .create_booking_intent(requester.user_id, event_id)
        .await;
    record_op_duration("create_booking_intent", start, result.is_ok());
    let created = result?;

    Ok(Json(BookingIntentResponse {
        booking_id: created.booking_id.to_string(),
        payment_id: created.payment_id.to_string(),
        transaction_id: created.transaction_id,
        payment_intent_id: created.intent.id,
        client_secret: created.intent.client_secret,
        amount_cents: created.amount_cents,
        currency: created.intent.currency,
        fee_cents: created.split.fee_cents,
        host_cents: created.split.host_cents,
    }))
}

/// GET /api/v1/bookings/me
pub async fn my_bookings(
    State(state): State<AppState>,
    requester: Requester,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<BookingSummary>>> {
    let page = state
        .listings
        .my_bookings(requester.user_id, query.into())
        .await?;
    Ok(Json(page))
}
