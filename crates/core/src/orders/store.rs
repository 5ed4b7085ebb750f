use async_trait::async_trait;

use crate::domain::order::{Order, OrderDecision, OrderId};
use crate::errors::ApplicationError;

/// Durable collection of orders.
///
/// `list` returns orders in insertion order; callers that need a presentation order sort
/// on top of it.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists the order and all of its items atomically.
    async fn insert(&self, order: &Order) -> Result<(), ApplicationError>;

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, ApplicationError>;

    /// Applies the decision in one write and returns the updated order, or `None` when
    /// no order has this id.
    async fn apply_decision(
        &self,
        id: &OrderId,
        decision: OrderDecision,
    ) -> Result<Option<Order>, ApplicationError>;

    /// Returns `false` when no order has this id.
    async fn delete(&self, id: &OrderId) -> Result<bool, ApplicationError>;

    async fn list(&self) -> Result<Vec<Order>, ApplicationError>;
}
