use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use storefront_core::{ApplicationError, AuthorizationError, InterfaceError};
use tracing::{error, warn};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Error body shared by every endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Per-request correlation id, taken from `x-request-id` when the caller supplies one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
            .unwrap_or_else(|| Self(format!("req-{}", Uuid::new_v4())))
    }

    /// Resolves the id once per request and caches it in the request extensions.
    pub fn for_request(parts: &mut Parts) -> Self {
        if let Some(existing) = parts.extensions.get::<CorrelationId>() {
            return existing.clone();
        }
        let correlation_id = Self::from_headers(&parts.headers);
        parts.extensions.insert(correlation_id.clone());
        correlation_id
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::for_request(parts))
    }
}

/// HTTP-facing error: an [`InterfaceError`] rendered as `{ "message": ... }`.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub fn from_application(error: ApplicationError, correlation_id: &CorrelationId) -> Self {
        Self(error.into_interface(correlation_id.0.clone()))
    }

    pub fn bad_request(message: impl Into<String>, correlation_id: &CorrelationId) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation_id.0.clone(),
        })
    }

    pub fn unauthorized(error: AuthorizationError, correlation_id: &CorrelationId) -> Self {
        Self::from_application(ApplicationError::Authorization(error), correlation_id)
    }

    pub fn internal(message: impl Into<String>, correlation_id: &CorrelationId) -> Self {
        Self(InterfaceError::Internal {
            message: message.into(),
            correlation_id: correlation_id.0.clone(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(
                event_name = "http.request.failed",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
        } else {
            warn!(
                event_name = "http.request.rejected",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request rejected"
            );
        }

        (status, Json(ErrorBody { message: self.0.user_message().to_string() })).into_response()
    }
}
