//! Admin dashboard handlers

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use linkup_db::RevenueSource;
use linkup_payments_core::{AnalyticsProduct, DashboardStats, MonthRevenue, WeeklyAnalytics};

use crate::error::{ApiError, ApiResult};
use crate::extract::Requester;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    #[serde(rename = "type")]
    pub source: Option<String>,
}

fn revenue_source(raw: Option<&str>) -> Result<RevenueSource, ApiError> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("booking") | Some("bookings") => Ok(RevenueSource::Booking),
        Some("sponsorship") | Some("sponsored") => Ok(RevenueSource::Sponsorship),
        Some(other) => Err(ApiError::BadRequest(format!(
            "unknown revenue type: {other}"
        ))),
    }
}

/// GET /api/v1/dashboard/stats
pub async fn stats(
    State(state): State<AppState>,
    requester: Requester,
) -> ApiResult<Json<DashboardStats>> {
    requester.require_admin()?;
    Ok(Json(state.dashboard.stats(Utc::now()).await?))
}

/// GET /api/v1/dashboard/revenue?type=booking|sponsorship
pub async fn monthly_revenue(
    State(state): State<AppState>,
    requester: Requester,
    Query(query): Query<RevenueQuery>,
) -> ApiResult<Json<Vec<MonthRevenue>>> {
    requester.require_admin()?;
    let source = revenue_source(query.source.as_deref())?;
    Ok(Json(
        state.dashboard.monthly_revenue(source, Utc::now()).await?,
    ))
}

/// GET /api/v1/dashboard/analytics/{product}
pub async fn weekly_analytics(
    State(state): State<AppState>,
    requester: Requester,
    Path(product): Path<String>,
) -> ApiResult<Json<WeeklyAnalytics>> {
    requester.require_admin()?;
    let product: AnalyticsProduct = product.parse()?;
    Ok(Json(
        state.dashboard.weekly_analytics(product, Utc::now()).await?,
    ))
}
