use thiserror::Error;

use crate::authz::AuthorizationError;
use crate::orders::validation::ValidationFailure;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn order_not_found(id: impl Into<String>) -> Self {
        Self::NotFound { entity: "order", id: id.into() }
    }
}

impl From<ValidationFailure> for ApplicationError {
    fn from(value: ValidationFailure) -> Self {
        Self::Domain(DomainError::Validation(value))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Internal { .. } => 500,
        }
    }

    /// Client-safe message; internal failures never expose their cause.
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. } => message,
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            error @ ApplicationError::NotFound { .. } => {
                Self::NotFound { message: error.to_string(), correlation_id }
            }
            ApplicationError::Authorization(error) if error.is_authentication_failure() => {
                Self::Unauthorized { message: error.to_string(), correlation_id }
            }
            ApplicationError::Authorization(error) => {
                Self::Forbidden { message: error.to_string(), correlation_id }
            }
            ApplicationError::Persistence(message)
            | ApplicationError::Integration(message)
            | ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::authz::AuthorizationError;
    use crate::errors::{ApplicationError, InterfaceError};
    use crate::orders::validation::ValidationFailure;

    #[test]
    fn validation_failure_maps_to_bad_request_with_detail() {
        let interface =
            ApplicationError::from(ValidationFailure::EmptyOrder).into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, .. } if correlation_id == "req-1"
        ));
        assert_eq!(interface.status_code(), 400);
        assert_eq!(interface.user_message(), "order must contain at least one item");
    }

    #[test]
    fn not_found_maps_to_404() {
        let interface = ApplicationError::order_not_found("ord-9").into_interface("req-2");
        assert_eq!(interface.status_code(), 404);
        assert!(interface.user_message().contains("ord-9"));
    }

    #[test]
    fn authorization_errors_split_between_401_and_403() {
        let missing = ApplicationError::from(AuthorizationError::MissingCredentials)
            .into_interface("req-3");
        assert_eq!(missing.status_code(), 401);

        let pending =
            ApplicationError::from(AuthorizationError::PendingApproval).into_interface("req-4");
        assert_eq!(pending.status_code(), 403);
    }

    #[test]
    fn persistence_error_maps_to_internal_without_leaking_cause() {
        let interface = ApplicationError::Persistence("database lock timeout".to_owned())
            .into_interface("req-5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.status_code(), 500);
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
        assert_eq!(interface.correlation_id(), "req-5");
    }
}
