//! Transaction history handlers

use axum::extract::{Query, State};
use axum::Json;

use linkup_types::{Page, Payment};

use super::shared::PageQuery;
use crate::error::ApiResult;
use crate::extract::Requester;
use crate::state::AppState;

/// GET /api/v1/payments/transactions
pub async fn my_transactions(
    State(state): State<AppState>,
    requester: Requester,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<Payment>>> {
    let page = state
        .listings
        .my_transactions(requester.user_id, query.into())
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/payments/transactions/all
pub async fn all_transactions(
    State(state): State<AppState>,
    requester: Requester,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<Payment>>> {
    requester.require_admin()?;
    Ok(Json(state.listings.all_transactions(query.into()).await?))
}
