//! Order endpoints.
//!
//! - `POST   /orders`              public checkout, 201 with the stored order
//! - `GET    /orders`              admin listing, newest first
//! - `POST   /orders/{id}/approve` admin decision
//! - `POST   /orders/{id}/reject`  admin decision
//! - `DELETE /orders/{id}`         admin removal
//! - `GET    /orders/{id}/pdf`     admin invoice download

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use storefront_core::audit::AuditContext;
use storefront_core::{Order, OrderDecision, OrderId};
use tracing::{error, info};

use crate::auth::AdminSession;
use crate::error::{ApiError, CorrelationId};
use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn admin_context(session: &AdminSession) -> AuditContext {
    AuditContext::new(session.correlation_id.0.clone(), session.identity.actor())
}

/// Accepts the raw body so malformed JSON gets the same `{message}` error shape as
/// validation failures. An empty body counts as an empty object.
pub async fn create_order(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Bytes,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let raw: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|error| {
            ApiError::bad_request(format!("malformed JSON body: {error}"), &correlation_id)
        })?
    };

    let order = state
        .lifecycle
        .create(&raw, &AuditContext::anonymous(correlation_id.0.clone()))
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<Vec<Order>>, ApiError> {
    state
        .lifecycle
        .list()
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &session.correlation_id))
}

pub async fn approve_order(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    decide(&state, &session, id, OrderDecision::Approve).await
}

pub async fn reject_order(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    decide(&state, &session, id, OrderDecision::Reject).await
}

async fn decide(
    state: &AppState,
    session: &AdminSession,
    id: String,
    decision: OrderDecision,
) -> Result<Json<Order>, ApiError> {
    state
        .lifecycle
        .decide(&OrderId(id), decision, &admin_context(session))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &session.correlation_id))
}

pub async fn delete_order(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = OrderId(id);
    state
        .lifecycle
        .delete(&id, &admin_context(&session))
        .await
        .map_err(|error| ApiError::from_application(error, &session.correlation_id))?;

    Ok(Json(MessageResponse { message: format!("order {id} deleted") }))
}

pub async fn order_pdf(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let order = state
        .lifecycle
        .get(&OrderId(id))
        .await
        .map_err(|error| ApiError::from_application(error, &session.correlation_id))?;

    let bytes = state.invoices.render(&order).await.map_err(|pdf_error| {
        error!(
            event_name = "invoice.render_failed",
            correlation_id = %session.correlation_id,
            order_id = %order.id,
            error = %pdf_error,
            "invoice rendering failed"
        );
        ApiError::internal(pdf_error.to_string(), &session.correlation_id)
    })?;

    info!(
        event_name = "invoice.rendered",
        correlation_id = %session.correlation_id,
        order_id = %order.id,
        size = bytes.len(),
        "invoice rendered"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("inline; filename=\"order_{}.pdf\"", order.id)),
        ],
        Body::from(bytes),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::auth::tests::admin_token;
    use crate::routes::router;
    use crate::routes::tests::{json, send, test_app};

    fn checkout_payload() -> serde_json::Value {
        json!({
            "customerEmail": "a@b.com",
            "customerName": "A B",
            "shippingAddress": "1 St",
            "phone": "123",
            "items": [{ "productId": "p1", "name": "Shirt", "price": "10", "quantity": "2" }]
        })
    }

    async fn place_order(app: &axum::Router) -> String {
        let (status, body) =
            send(app.clone(), Method::POST, "/orders", None, Some(checkout_payload())).await;
        assert_eq!(status, StatusCode::CREATED);
        json(&body)["id"].as_str().expect("order id").to_string()
    }

    #[tokio::test]
    async fn checkout_creates_pending_order_with_derived_total() {
        let app = router(test_app().state);
        let (status, body) =
            send(app, Method::POST, "/orders", None, Some(checkout_payload())).await;

        assert_eq!(status, StatusCode::CREATED);
        let order = json(&body);
        assert_eq!(order["totalAmount"], json!(20.0));
        assert_eq!(order["status"], "pending");
        assert_eq!(order["items"][0]["size"], "Standard");
        assert_eq!(order["items"][0]["color"], "N/A");
        assert_eq!(order["items"][0]["quantity"], 2);
    }

    #[tokio::test]
    async fn checkout_rejects_empty_items_and_malformed_json() {
        let test_app = test_app();
        let app = router(test_app.state.clone());

        let mut payload = checkout_payload();
        payload["items"] = json!([]);
        let (status, body) = send(app.clone(), Method::POST, "/orders", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["message"], "order must contain at least one item");

        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/orders")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .expect("request");
        let response = tower::ServiceExt::oneshot(app.clone(), request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let token = admin_token("admin", Some(true));
        let (_, listed) = send(app, Method::GET, "/orders", Some(&token), None).await;
        assert_eq!(json(&listed), json!([]));
        assert_eq!(test_app.audit.events()[0].event_type, "order.create_rejected");
    }

    #[tokio::test]
    async fn checkout_with_out_of_range_amount_is_a_bad_request() {
        let app = router(test_app().state);

        let mut payload = checkout_payload();
        payload["items"] = json!([{
            "productId": "p1",
            "name": "Vault",
            "price": "79228162514264337593543950335",
            "quantity": 2
        }]);
        let (status, body) = send(app.clone(), Method::POST, "/orders", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json(&body)["message"],
            "invalid item at position 0: price times quantity is too large"
        );

        let token = admin_token("admin", Some(true));
        let (_, listed) = send(app, Method::GET, "/orders", Some(&token), None).await;
        assert_eq!(json(&listed), json!([]));
    }

    #[tokio::test]
    async fn admin_endpoints_require_an_approved_admin() {
        let app = router(test_app().state);

        let (status, body) = send(app.clone(), Method::GET, "/orders", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json(&body)["message"].is_string());

        let pending = admin_token("admin", Some(false));
        let (status, _) = send(app.clone(), Method::GET, "/orders", Some(&pending), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let customer = admin_token("customer", None);
        let (status, _) = send(app.clone(), Method::GET, "/orders", Some(&customer), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(app.clone(), Method::GET, "/orders", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let super_admin = admin_token("super_admin", Some(false));
        let (status, _) = send(app, Method::GET, "/orders", Some(&super_admin), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn decisions_overwrite_each_other_and_missing_ids_are_404() {
        let app = router(test_app().state);
        let token = admin_token("admin", Some(true));
        let id = place_order(&app).await;

        let (status, body) = send(
            app.clone(),
            Method::POST,
            &format!("/orders/{id}/approve"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "approved");

        let (status, body) =
            send(app.clone(), Method::POST, &format!("/orders/{id}/reject"), Some(&token), None)
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "rejected");

        let (status, _) =
            send(app, Method::POST, "/orders/ghost/approve", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_removes_only_the_target_order() {
        let app = router(test_app().state);
        let token = admin_token("admin", Some(true));
        let keep = place_order(&app).await;
        let drop = place_order(&app).await;

        let (status, _) =
            send(app.clone(), Method::DELETE, "/orders/ghost", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) =
            send(app.clone(), Method::DELETE, &format!("/orders/{drop}"), Some(&token), None)
                .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json(&body)["message"].as_str().expect("message").contains(&drop));

        let (_, listed) = send(app, Method::GET, "/orders", Some(&token), None).await;
        let listed = json(&listed);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(listed[0]["id"], keep.as_str());
    }

    #[tokio::test]
    async fn invoice_is_served_inline_as_pdf() {
        let app = router(test_app().state);
        let token = admin_token("admin", Some(true));
        let id = place_order(&app).await;

        let request = axum::http::Request::builder()
            .method(Method::GET)
            .uri(format!("/orders/{id}/pdf"))
            .header("authorization", format!("Bearer {token}"))
            .body(axum::body::Body::empty())
            .expect("request");
        let response = tower::ServiceExt::oneshot(app.clone(), request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/pdf");
        assert_eq!(
            response.headers()["content-disposition"],
            format!("inline; filename=\"order_{id}.pdf\"").as_str()
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert!(bytes.starts_with(b"%PDF"));

        let (status, _) = send(app, Method::GET, "/orders/ghost/pdf", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
