pub mod audit;
pub mod authz;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod memory;
pub mod orders;

pub use authz::{authorize_admin, AdminIdentity, AdminRole, AuthorizationError, RoleClaims};
pub use catalog::ProductCatalog;
pub use domain::order::{Order, OrderDecision, OrderId, OrderLineItem, OrderStatus};
pub use domain::product::{Product, ProductColor, ProductId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use orders::{
    AggregationEngine, BestSeller, OrderLifecycle, OrderStore, StoreStats, ValidationFailure,
};
