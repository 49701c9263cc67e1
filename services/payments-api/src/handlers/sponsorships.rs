//! Sponsorship handlers: intents, packages and sponsored listings

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use linkup_db::UpdatePackage;
use linkup_payments_core::{NewPackage, SponsoredEvent};
use linkup_types::{EventId, PackageId, Page, PromotionKind, SponsorshipPackage};

use super::shared::{
    parse_id, record_op_duration, validate_benefits, validate_string_length, PageQuery,
};
use crate::error::ApiResult;
use crate::extract::Requester;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSponsorshipIntentRequest {
    pub event_id: String,
    pub package_id: String,
}

#[derive(Debug, Serialize)]
pub struct SponsorshipIntentResponse {
    pub sponsorship_id: String,
    pub payment_id: String,
    pub transaction_id: String,
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePackageRequest {
    pub title: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub price_cents: i64,
    pub kind: PromotionKind,
    pub duration_days: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePackageRequest {
    pub title: Option<String>,
    pub benefits: Option<Vec<String>>,
    pub price_cents: Option<i64>,
    pub duration_days: Option<i32>,
}

// ============================================================================
// Intents
// ============================================================================

/// POST /api/v1/sponsorships/intent
pub async fn create_sponsorship_intent(
    State(state): State<AppState>,
    requester: Requester,
    Json(req): Json<CreateSponsorshipIntentRequest>,
) -> ApiResult<Json<SponsorshipIntentResponse>> {
    let start = Instant::now();

    let event_id = parse_id(&req.event_id, "event_id", EventId::parse)?;
    let package_id = parse_id(&req.package_id, "package_id", PackageId::parse)?;
    let result = state
        .intents
        .create_sponsorship_intent(requester.user_id, event_id, package_id)
        .await;
    record_op_duration("create_sponsorship_intent", start, result.is_ok());
    let created = result?;

    Ok(Json(SponsorshipIntentResponse {
        sponsorship_id: created.sponsorship_id.to_string(),
        payment_id: created.payment_id.to_string(),
        transaction_id: created.transaction_id,
        payment_intent_id: created.intent.id,
        client_secret: created.intent.client_secret,
        amount_cents: created.amount_cents,
        currency: created.intent.currency,
    }))
}

// ============================================================================
// Listings
// ============================================================================

/// GET /api/v1/sponsorships/events
pub async fn sponsored_events(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<SponsoredEvent>>> {
    let page = state
        .listings
        .sponsored_events(query.into(), Utc::now())
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/sponsorships/events/random
pub async fn random_sponsored_events(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<SponsoredEvent>>> {
    Ok(Json(state.listings.random_sponsored(Utc::now()).await?))
}

// ============================================================================
// Packages
// ============================================================================

/// GET /api/v1/sponsorships/packages
pub async fn list_packages(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<SponsorshipPackage>>> {
    Ok(Json(state.packages.list().await?))
}

/// POST /api/v1/sponsorships/packages
pub async fn create_package(
    State(state): State<AppState>,
    requester: Requester,
    Json(req): Json<CreatePackageRequest>,
) -> ApiResult<(StatusCode, Json<SponsorshipPackage>)> {
    requester.require_admin()?;
    validate_string_length(&req.title, "title")?;
    validate_benefits(&req.benefits)?;

    let package = state
        .packages
        .create(NewPackage {
            title: req.title,
            benefits: req.benefits,
            price_cents: req.price_cents,
            kind: req.kind,
            duration_days: req.duration_days,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(package)))
}

/// PATCH /api/v1/sponsorships/packages/{id}
pub async fn update_package(
    State(state): State<AppState>,
    requester: Requester,
    Path(id): Path<String>,
    Json(req): Json<UpdatePackageRequest>,
) -> ApiResult<Json<SponsorshipPackage>> {
    requester.require_admin()?;
    let id = parse_id(&id, "package id", PackageId::parse)?;
    if let Some(title) = &req.title {
        validate_string_length(title, "title")?;
    }
    if let Some(benefits) = &req.benefits {
        validate_benefits(benefits)?;
    }

    let package = state
        .packages
        .update(
            id,
            UpdatePackage {
                title: req.title,
                benefits: req.benefits,
                price_cents: req.price_cents,
                duration_days: req.duration_days,
            },
        )
        .await?;
    Ok(Json(package))
}
