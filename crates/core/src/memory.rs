//! In-memory implementations of the order store and product catalog ports.
//!
//! Used by tests and by callers that do not need durability.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::ProductCatalog;
use crate::domain::order::{Order, OrderDecision, OrderId};
use crate::domain::product::{Product, ProductId};
use crate::errors::ApplicationError;
use crate::orders::store::OrderStore;

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), ApplicationError> {
        let mut orders = self.orders.write().await;
        if orders.iter().any(|existing| existing.id == order.id) {
            return Err(ApplicationError::Persistence(format!("duplicate order id `{}`", order.id)));
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, ApplicationError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|order| &order.id == id).cloned())
    }

    async fn apply_decision(
        &self,
        id: &OrderId,
        decision: OrderDecision,
    ) -> Result<Option<Order>, ApplicationError> {
        let mut orders = self.orders.write().await;
        Ok(orders.iter_mut().find(|order| &order.id == id).map(|order| {
            order.apply(decision);
            order.clone()
        }))
    }

    async fn delete(&self, id: &OrderId) -> Result<bool, ApplicationError> {
        let mut orders = self.orders.write().await;
        let before = orders.len();
        orders.retain(|order| &order.id != id);
        Ok(orders.len() != before)
    }

    async fn list(&self) -> Result<Vec<Order>, ApplicationError> {
        Ok(self.orders.read().await.clone())
    }
}

#[derive(Default)]
pub struct InMemoryProductCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn save(&self, product: Product) {
        self.products.write().await.insert(product.id.clone(), product);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApplicationError> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn count(&self) -> Result<u64, ApplicationError> {
        Ok(self.products.read().await.len() as u64)
    }
}
