use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use storefront_core::orders::aggregation::resolve_limit;
use storefront_core::{BestSeller, StoreStats};

use crate::auth::AdminSession;
use crate::error::{ApiError, CorrelationId};
use crate::routes::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BestSellersQuery {
    pub limit: Option<String>,
}

/// `GET /products/best?limit=N`. A missing or unusable limit falls back to the configured
/// default instead of failing the request.
pub async fn best_sellers(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Query(query): Query<BestSellersQuery>,
) -> Result<Json<Vec<BestSeller>>, ApiError> {
    let limit = resolve_limit(query.limit.as_deref(), state.best_sellers_default_limit);
    state
        .aggregation
        .best_sellers(limit)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &correlation_id))
}

pub async fn stats(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<StoreStats>, ApiError> {
    state
        .aggregation
        .stats()
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &session.correlation_id))
}
