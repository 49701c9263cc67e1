//! Trending handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use linkup_payments_core::TrendingEvent;
use linkup_types::{EventId, Page};

use super::shared::{parse_id, PageQuery};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/v1/trending
pub async fn list_trending(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<TrendingEvent>>> {
    Ok(Json(state.trending.list(query.into(), Utc::now()).await?))
}

/// POST /api/v1/trending/{event_id}/views
pub async fn record_view(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<StatusCode> {
    let event_id = parse_id(&event_id, "event id", EventId::parse)?;
    state.trending.record_view(event_id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}
