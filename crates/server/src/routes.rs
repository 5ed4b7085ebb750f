use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use storefront_core::{AggregationEngine, OrderLifecycle};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::TokenVerifier;
use crate::pdf::InvoiceRenderer;
use crate::{catalog, orders};

/// Shared handler state. Stores sit behind the core ports, so handlers never touch SQL.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<OrderLifecycle>,
    pub aggregation: Arc<AggregationEngine>,
    pub tokens: Arc<TokenVerifier>,
    pub invoices: Arc<InvoiceRenderer>,
    pub best_sellers_default_limit: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route("/orders/{id}", delete(orders::delete_order))
        .route("/orders/{id}/approve", post(orders::approve_order))
        .route("/orders/{id}/reject", post(orders::reject_order))
        .route("/orders/{id}/pdf", get(orders::order_pdf))
        .route("/stats", get(catalog::stats))
        .route("/products/best", get(catalog::best_sellers))
        .with_state(state)
}

/// Applies CORS for the configured origins and per-request tracing.
pub fn with_http_layers(router: Router, allowed_origins: &[String]) -> Router {
    router.layer(cors_layer(allowed_origins)).layer(TraceLayer::new_for_http())
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    event_name = "system.http.cors_origin_invalid",
                    correlation_id = "bootstrap",
                    origin = %origin,
                    "ignoring invalid CORS origin"
                );
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
