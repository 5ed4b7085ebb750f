//! Bearer-token verification for admin endpoints.
//!
//! Tokens are HS256 JWTs signed with `auth.jwt_secret`. Verification only yields role
//! claims; whether those claims may act as an admin is decided by
//! [`storefront_core::authorize_admin`].

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use storefront_core::{authorize_admin, AdminIdentity, AuthorizationError, RoleClaims};
use tracing::warn;

use crate::error::{ApiError, CorrelationId};
use crate::routes::AppState;

/// Claims carried by admin tokens. Only `role` is mandatory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "isApproved", default, skip_serializing_if = "Option::is_none")]
    pub is_approved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl From<TokenClaims> for RoleClaims {
    fn from(claims: TokenClaims) -> Self {
        RoleClaims {
            subject: claims.sub.or(claims.email),
            role: claims.role,
            is_approved: claims.is_approved,
        }
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present but not demanded.
        validation.required_spec_claims.clear();
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthorizationError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|error| match error.kind() {
                ErrorKind::ExpiredSignature => AuthorizationError::InvalidToken("expired".into()),
                ErrorKind::InvalidSignature => {
                    AuthorizationError::InvalidToken("bad signature".into())
                }
                _ => AuthorizationError::InvalidToken(error.to_string()),
            })
    }
}

/// Returns the token of a `Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// An authorized admin, extracted from the `Authorization` header.
#[derive(Clone, Debug)]
pub struct AdminSession {
    pub identity: AdminIdentity,
    pub correlation_id: CorrelationId,
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<AdminSession>() {
            return Ok(session.clone());
        }

        let correlation_id = CorrelationId::for_request(parts);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| {
                ApiError::unauthorized(AuthorizationError::MissingCredentials, &correlation_id)
            })?;

        let claims = state.tokens.verify(token).map_err(|error| {
            warn!(
                event_name = "auth.token_rejected",
                correlation_id = %correlation_id,
                uri = %parts.uri,
                error = %error,
                "bearer token rejected"
            );
            ApiError::unauthorized(error, &correlation_id)
        })?;

        let identity = authorize_admin(&claims.into()).map_err(|error| {
            warn!(
                event_name = "auth.admin_denied",
                correlation_id = %correlation_id,
                uri = %parts.uri,
                error = %error,
                "admin access denied"
            );
            ApiError::unauthorized(error, &correlation_id)
        })?;

        let session = AdminSession { identity, correlation_id };
        parts.extensions.insert(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use secrecy::SecretString;
    use storefront_core::AuthorizationError;

    use super::{bearer_token, TokenClaims, TokenVerifier};

    pub(crate) const TEST_SECRET: &str = "storefront-test-secret";

    pub(crate) fn sign(claims: &TokenClaims, secret: &str) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("sign token")
    }

    pub(crate) fn admin_token(role: &str, is_approved: Option<bool>) -> String {
        sign(
            &TokenClaims {
                sub: Some("admin-1".to_string()),
                email: None,
                role: role.to_string(),
                is_approved,
                exp: Some(Utc::now().timestamp() + 3600),
            },
            TEST_SECRET,
        )
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(&SecretString::from(TEST_SECRET.to_string()))
    }

    #[test]
    fn valid_token_yields_claims() {
        let claims = verifier().verify(&admin_token("admin", Some(true))).expect("valid token");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.is_approved, Some(true));
        assert_eq!(claims.sub.as_deref(), Some("admin-1"));
    }

    #[test]
    fn token_without_expiry_is_accepted() {
        let token = sign(
            &TokenClaims {
                email: Some("admin@example.com".to_string()),
                role: "admin".to_string(),
                ..TokenClaims::default()
            },
            TEST_SECRET,
        );
        let claims = verifier().verify(&token).expect("token without exp");
        assert_eq!(claims.email.as_deref(), Some("admin@example.com"));
    }

    #[test]
    fn expired_forged_and_garbage_tokens_are_invalid() {
        let expired = sign(
            &TokenClaims {
                role: "admin".to_string(),
                exp: Some(Utc::now().timestamp() - 3600),
                ..TokenClaims::default()
            },
            TEST_SECRET,
        );
        let forged = sign(
            &TokenClaims { role: "admin".to_string(), ..TokenClaims::default() },
            "some-other-secret",
        );

        for token in [expired.as_str(), forged.as_str(), "not-a-jwt"] {
            let error = verifier().verify(token).expect_err("token must be rejected");
            assert!(matches!(error, AuthorizationError::InvalidToken(_)), "{token}: {error:?}");
        }
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }
}
