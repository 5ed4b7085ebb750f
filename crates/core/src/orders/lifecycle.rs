//! Order lifecycle: creation, administrative decisions, deletion and listing.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use serde_json::Value;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::order::{Order, OrderDecision, OrderId};
use crate::errors::ApplicationError;
use crate::orders::store::OrderStore;
use crate::orders::validation::validate_order_input;

pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    audit: Arc<dyn AuditSink>,
}

impl OrderLifecycle {
    pub fn new(store: Arc<dyn OrderStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    /// Validates raw input and persists it as a pending order. Nothing is written when
    /// validation fails.
    pub async fn create(
        &self,
        raw: &Value,
        context: &AuditContext,
    ) -> Result<Order, ApplicationError> {
        let request = match validate_order_input(raw) {
            Ok(request) => request,
            Err(failure) => {
                self.audit.emit(
                    AuditEvent::new(
                        None,
                        context,
                        "order.create_rejected",
                        AuditCategory::Ingress,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("reason", failure.to_string()),
                );
                return Err(failure.into());
            }
        };

        // Stored timestamps keep microseconds; the returned order must match later reads.
        let order = Order::place(request, OrderId::generate(), Utc::now().trunc_subsecs(6))?;
        self.store.insert(&order).await?;

        self.audit.emit(
            AuditEvent::new(
                Some(order.id.clone()),
                context,
                "order.created",
                AuditCategory::Ingress,
                AuditOutcome::Success,
            )
            .with_metadata("total_amount", order.total_amount.to_string())
            .with_metadata("item_count", order.items.len().to_string()),
        );

        Ok(order)
    }

    pub async fn approve(
        &self,
        id: &OrderId,
        context: &AuditContext,
    ) -> Result<Order, ApplicationError> {
        self.decide(id, OrderDecision::Approve, context).await
    }

    pub async fn reject(
        &self,
        id: &OrderId,
        context: &AuditContext,
    ) -> Result<Order, ApplicationError> {
        self.decide(id, OrderDecision::Reject, context).await
    }

    /// Sets the decision's target status whatever the current status is; last writer
    /// wins.
    pub async fn decide(
        &self,
        id: &OrderId,
        decision: OrderDecision,
        context: &AuditContext,
    ) -> Result<Order, ApplicationError> {
        let order = self
            .store
            .apply_decision(id, decision)
            .await?
            .ok_or_else(|| ApplicationError::order_not_found(id.0.clone()))?;

        self.audit.emit(
            AuditEvent::new(
                Some(order.id.clone()),
                context,
                decision.event_type(),
                AuditCategory::Lifecycle,
                AuditOutcome::Success,
            )
            .with_metadata("status", order.status.as_str()),
        );

        Ok(order)
    }

    pub async fn delete(
        &self,
        id: &OrderId,
        context: &AuditContext,
    ) -> Result<(), ApplicationError> {
        if !self.store.delete(id).await? {
            return Err(ApplicationError::order_not_found(id.0.clone()));
        }

        self.audit.emit(AuditEvent::new(
            Some(id.clone()),
            context,
            "order.deleted",
            AuditCategory::Lifecycle,
            AuditOutcome::Success,
        ));

        Ok(())
    }

    pub async fn get(&self, id: &OrderId) -> Result<Order, ApplicationError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::order_not_found(id.0.clone()))
    }

    /// Newest first; orders sharing a timestamp keep the most recently inserted first.
    pub async fn list(&self) -> Result<Vec<Order>, ApplicationError> {
        let mut orders = self.store.list().await?;
        orders.reverse();
        orders.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(orders)
    }
}
