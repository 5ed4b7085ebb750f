use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::ProductId;
use crate::errors::DomainError;

pub const DEFAULT_SIZE: &str = "Standard";
pub const DEFAULT_COLOR: &str = "N/A";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Only `approved` orders count towards revenue.
    pub fn counts_as_revenue(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::InvariantViolation(format!("unknown order status `{other}`"))),
        }
    }
}

/// Administrative decision applied to an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDecision {
    Approve,
    Reject,
}

impl OrderDecision {
    pub fn target_status(&self) -> OrderStatus {
        match self {
            Self::Approve => OrderStatus::Approved,
            Self::Reject => OrderStatus::Rejected,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Approve => "order.approved",
            Self::Reject => "order.rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub name: String,
    pub size: String,
    pub color: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl OrderLineItem {
    /// `None` when `price × quantity` does not fit in a `Decimal`.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// A validated order-creation request. Only the validator builds these from raw input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: String,
    pub phone: String,
    pub items: Vec<OrderLineItem>,
}

impl NewOrder {
    pub fn total_amount(&self) -> Option<Decimal> {
        line_total(&self.items)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: String,
    pub phone: String,
    pub items: Vec<OrderLineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Turns a validated request into a pending order. The total is always derived from
    /// the items.
    pub fn place(
        request: NewOrder,
        id: OrderId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let total_amount = request.total_amount().ok_or_else(|| {
            DomainError::InvariantViolation(format!("order {id} total is out of range"))
        })?;
        Ok(Self {
            id,
            customer_email: request.customer_email,
            customer_name: request.customer_name,
            shipping_address: request.shipping_address,
            phone: request.phone,
            items: request.items,
            total_amount,
            status: OrderStatus::Pending,
            created_at,
        })
    }

    /// Any state accepts either decision; re-applying the current one is a no-op.
    pub fn apply(&mut self, decision: OrderDecision) {
        self.status = decision.target_status();
    }

    pub fn ensure_consistent(&self) -> Result<(), DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::InvariantViolation(format!("order {} has no items", self.id)));
        }
        let Some(recomputed) = line_total(&self.items) else {
            return Err(DomainError::InvariantViolation(format!(
                "order {} item sum is out of range",
                self.id
            )));
        };
        if recomputed != self.total_amount {
            return Err(DomainError::InvariantViolation(format!(
                "order {} total {} does not match item sum {}",
                self.id, self.total_amount, recomputed
            )));
        }
        Ok(())
    }
}

fn line_total(items: &[OrderLineItem]) -> Option<Decimal> {
    items.iter().try_fold(Decimal::ZERO, |total, item| total.checked_add(item.subtotal()?))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::product::ProductId;

    use super::{NewOrder, Order, OrderDecision, OrderId, OrderLineItem, OrderStatus};

    fn item(product: &str, quantity: u32, price: Decimal) -> OrderLineItem {
        OrderLineItem {
            product_id: ProductId(product.to_string()),
            name: format!("{product} name"),
            size: "M".to_string(),
            color: "Black".to_string(),
            quantity,
            price,
        }
    }

    fn order() -> Order {
        Order::place(
            NewOrder {
                customer_email: "a@b.com".to_string(),
                customer_name: "A B".to_string(),
                shipping_address: "1 St".to_string(),
                phone: "123".to_string(),
                items: vec![item("p1", 2, Decimal::new(1050, 2)), item("p2", 3, Decimal::new(1, 1))],
            },
            OrderId("ord-1".to_string()),
            Utc::now(),
        )
        .expect("representable total")
    }

    #[test]
    fn placed_order_is_pending_with_derived_total() {
        let order = order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Decimal::new(2130, 2));
        assert!(order.ensure_consistent().is_ok());
    }

    #[test]
    fn decisions_are_resettable_from_any_state() {
        let mut order = order();
        order.apply(OrderDecision::Approve);
        assert_eq!(order.status, OrderStatus::Approved);

        order.apply(OrderDecision::Reject);
        assert_eq!(order.status, OrderStatus::Rejected);

        order.apply(OrderDecision::Reject);
        assert_eq!(order.status, OrderStatus::Rejected);
    }

    #[test]
    fn unrepresentable_total_is_refused_instead_of_overflowing() {
        let request = NewOrder {
            customer_email: "a@b.com".to_string(),
            customer_name: "A B".to_string(),
            shipping_address: "1 St".to_string(),
            phone: "123".to_string(),
            items: vec![item("p1", 2, Decimal::MAX)],
        };
        assert_eq!(request.items[0].subtotal(), None);
        assert_eq!(request.total_amount(), None);

        let error = Order::place(request, OrderId("ord-big".to_string()), Utc::now())
            .expect_err("overflowing total must not produce an order");
        assert!(matches!(error, crate::errors::DomainError::InvariantViolation(_)));
    }

    #[test]
    fn drifted_total_is_an_invariant_violation() {
        let mut order = order();
        order.total_amount += Decimal::ONE;
        let error = order.ensure_consistent().expect_err("total drift must be detected");
        assert!(matches!(error, crate::errors::DomainError::InvariantViolation(_)));
    }

    #[test]
    fn serializes_with_camel_case_keys_and_numeric_amounts() {
        let value = serde_json::to_value(order()).expect("serialize order");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["totalAmount"].as_f64(), Some(21.3));
        assert_eq!(value["items"][0]["productId"], "p1");
        assert!(value.get("createdAt").is_some());
    }
}
