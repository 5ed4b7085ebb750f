//! Admin authorization rule.
//!
//! Credentials are verified upstream; this module only decides whether an already
//! verified role claim may run lifecycle and aggregation operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Admin,
    SuperAdmin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

/// Identity claims as decoded from a verified token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaims {
    pub subject: Option<String>,
    pub role: String,
    pub is_approved: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    pub subject: String,
    pub role: AdminRole,
}

impl AdminIdentity {
    /// Actor label used in audit events and logs.
    pub fn actor(&self) -> String {
        format!("{}:{}", self.role.as_str(), self.subject)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("no bearer token provided")]
    MissingCredentials,
    #[error("invalid or expired token")]
    InvalidToken(String),
    #[error("role `{role}` is not allowed to perform this operation")]
    RoleNotPermitted { role: String },
    #[error("admin account is pending approval")]
    PendingApproval,
}

impl AuthorizationError {
    /// 401-class failures, as opposed to 403-class ones.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::MissingCredentials | Self::InvalidToken(_))
    }
}

pub fn authorize_admin(claims: &RoleClaims) -> Result<AdminIdentity, AuthorizationError> {
    let role = match claims.role.as_str() {
        "admin" => AdminRole::Admin,
        "super_admin" => AdminRole::SuperAdmin,
        other => return Err(AuthorizationError::RoleNotPermitted { role: other.to_string() }),
    };

    if role == AdminRole::Admin && claims.is_approved == Some(false) {
        return Err(AuthorizationError::PendingApproval);
    }

    Ok(AdminIdentity {
        subject: claims.subject.clone().unwrap_or_else(|| "unknown".to_string()),
        role,
    })
}
