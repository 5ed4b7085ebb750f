use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use storefront_core::domain::order::{Order, OrderDecision, OrderId, OrderLineItem, OrderStatus};
use storefront_core::domain::product::ProductId;
use storefront_core::errors::ApplicationError;
use storefront_core::orders::store::OrderStore;

use super::{decode_decimal, decode_timestamp, decode_u32, encode_timestamp, RepositoryError};
use crate::DbPool;

const ORDER_COLUMNS: &str = "id, customer_email, customer_name, shipping_address, phone, \
                             total_amount, status, created_at";

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO customer_order (
                id, customer_email, customer_name, shipping_address, phone,
                total_amount, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id.0)
        .bind(&order.customer_email)
        .bind(&order.customer_name)
        .bind(&order.shipping_address)
        .bind(&order.phone)
        .bind(order.total_amount.to_string())
        .bind(order.status.as_str())
        .bind(encode_timestamp(&order.created_at))
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_item (
                    order_id, position, product_id, name, size, color, quantity, price
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&order.id.0)
            .bind(position as i64)
            .bind(&item.product_id.0)
            .bind(&item.name)
            .bind(&item.size)
            .bind(&item.color)
            .bind(i64::from(item.quantity))
            .bind(item.price.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM customer_order WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query(
            r#"
            SELECT order_id, product_id, name, size, color, quantity, price
            FROM order_item
            WHERE order_id = ?
            ORDER BY position
            "#,
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(item_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        order_from_row(&row, items).map(Some)
    }

    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let result = sqlx::query("UPDATE customer_order SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_order(id).await
    }

    async fn delete_order(&self, id: &OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM customer_order WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let order_rows =
            sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM customer_order ORDER BY rowid"))
                .fetch_all(&self.pool)
                .await?;

        let item_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, name, size, color, quantity, price
            FROM order_item
            ORDER BY order_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<String, Vec<OrderLineItem>> = HashMap::new();
        for row in &item_rows {
            let order_id: String = row
                .try_get("order_id")
                .map_err(|error| RepositoryError::Decode(error.to_string()))?;
            items_by_order.entry(order_id).or_default().push(item_from_row(row)?);
        }

        order_rows
            .iter()
            .map(|row| {
                let id: String = row
                    .try_get("id")
                    .map_err(|error| RepositoryError::Decode(error.to_string()))?;
                let items = items_by_order.remove(&id).unwrap_or_default();
                order_from_row(row, items)
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for SqlOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), ApplicationError> {
        Ok(self.insert_order(order).await?)
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, ApplicationError> {
        Ok(self.fetch_order(id).await?)
    }

    async fn apply_decision(
        &self,
        id: &OrderId,
        decision: OrderDecision,
    ) -> Result<Option<Order>, ApplicationError> {
        Ok(self.update_status(id, decision.target_status()).await?)
    }

    async fn delete(&self, id: &OrderId) -> Result<bool, ApplicationError> {
        Ok(self.delete_order(id).await?)
    }

    async fn list(&self) -> Result<Vec<Order>, ApplicationError> {
        Ok(self.list_orders().await?)
    }
}

fn order_from_row(row: &SqliteRow, items: Vec<OrderLineItem>) -> Result<Order, RepositoryError> {
    let status_raw: String =
        row.try_get("status").map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let total_raw: String =
        row.try_get("total_amount").map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let created_raw: String =
        row.try_get("created_at").map_err(|error| RepositoryError::Decode(error.to_string()))?;

    let order = Order {
        id: OrderId(row.try_get("id").map_err(|error| RepositoryError::Decode(error.to_string()))?),
        customer_email: row
            .try_get("customer_email")
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        customer_name: row
            .try_get("customer_name")
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        shipping_address: row
            .try_get("shipping_address")
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        phone: row.try_get("phone").map_err(|error| RepositoryError::Decode(error.to_string()))?,
        items,
        total_amount: decode_decimal("total_amount", &total_raw)?,
        status: status_raw
            .parse::<OrderStatus>()
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        created_at: decode_timestamp("created_at", &created_raw)?,
    };

    order.ensure_consistent().map_err(|error| RepositoryError::Decode(error.to_string()))?;
    Ok(order)
}

fn item_from_row(row: &SqliteRow) -> Result<OrderLineItem, RepositoryError> {
    let quantity: i64 =
        row.try_get("quantity").map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let price_raw: String =
        row.try_get("price").map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(OrderLineItem {
        product_id: ProductId(
            row.try_get("product_id").map_err(|error| RepositoryError::Decode(error.to_string()))?,
        ),
        name: row.try_get("name").map_err(|error| RepositoryError::Decode(error.to_string()))?,
        size: row.try_get("size").map_err(|error| RepositoryError::Decode(error.to_string()))?,
        color: row.try_get("color").map_err(|error| RepositoryError::Decode(error.to_string()))?,
        quantity: decode_u32("quantity", quantity)?,
        price: decode_decimal("price", &price_raw)?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    use storefront_core::audit::{AuditContext, InMemoryAuditSink};
    use storefront_core::domain::order::{
        NewOrder, Order, OrderDecision, OrderId, OrderLineItem, OrderStatus,
    };
    use storefront_core::domain::product::ProductId;
    use storefront_core::errors::ApplicationError;
    use storefront_core::orders::store::OrderStore;
    use storefront_core::orders::OrderLifecycle;

    use super::SqlOrderRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn order(id: &str, seconds: i64) -> Order {
        Order::place(
            NewOrder {
                customer_email: "a@b.com".to_string(),
                customer_name: "A B".to_string(),
                shipping_address: "1 St".to_string(),
                phone: "123".to_string(),
                items: vec![
                    OrderLineItem {
                        product_id: ProductId("p1".to_string()),
                        name: "Shirt".to_string(),
                        size: "Standard".to_string(),
                        color: "N/A".to_string(),
                        quantity: 2,
                        price: Decimal::new(1050, 2),
                    },
                    OrderLineItem {
                        product_id: ProductId("p2".to_string()),
                        name: "Cap".to_string(),
                        size: "M".to_string(),
                        color: "#112233".to_string(),
                        quantity: 3,
                        price: Decimal::new(1, 1),
                    },
                ],
            },
            OrderId(id.to_string()),
            Utc.timestamp_opt(1_700_000_000 + seconds, 123_456_000).single().expect("timestamp"),
        )
        .expect("representable total")
    }

    #[tokio::test]
    async fn insert_then_find_round_trips_items_and_exact_total() {
        let repo = SqlOrderRepository::new(pool().await);
        let original = order("ord-1", 0);

        repo.insert(&original).await.expect("insert");
        let loaded = repo.find_by_id(&original.id).await.expect("find").expect("present");

        assert_eq!(loaded, original);
        assert_eq!(loaded.total_amount, Decimal::new(2130, 2));
    }

    #[tokio::test]
    async fn created_order_reads_back_with_identical_created_at() {
        let pool = pool().await;
        let lifecycle = OrderLifecycle::new(
            Arc::new(SqlOrderRepository::new(pool.clone())),
            Arc::new(InMemoryAuditSink::default()),
        );
        let raw = json!({
            "customerEmail": "a@b.com",
            "customerName": "A B",
            "shippingAddress": "1 St",
            "phone": "123",
            "items": [{ "productId": "p1", "name": "Shirt", "price": "10", "quantity": "2" }]
        });
        let context = AuditContext::anonymous("req-1");

        let created = lifecycle.create(&raw, &context).await.expect("create");
        let fetched = lifecycle.get(&created.id).await.expect("get");
        let listed = lifecycle.list().await.expect("list");

        assert_eq!(fetched, created);
        assert_eq!(listed[0].created_at, created.created_at);

        let approved = lifecycle.approve(&created.id, &context).await.expect("approve");
        assert_eq!(approved.created_at, created.created_at);
    }

    #[tokio::test]
    async fn apply_decision_updates_status_and_misses_unknown_ids() {
        let repo = SqlOrderRepository::new(pool().await);
        repo.insert(&order("ord-1", 0)).await.expect("insert");

        let approved = repo
            .apply_decision(&OrderId("ord-1".to_string()), OrderDecision::Approve)
            .await
            .expect("approve")
            .expect("present");
        assert_eq!(approved.status, OrderStatus::Approved);

        let rejected = repo
            .apply_decision(&OrderId("ord-1".to_string()), OrderDecision::Reject)
            .await
            .expect("reject")
            .expect("present");
        assert_eq!(rejected.status, OrderStatus::Rejected);

        let missing = repo
            .apply_decision(&OrderId("nope".to_string()), OrderDecision::Approve)
            .await
            .expect("query");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_cascades_items_and_leaves_other_orders() {
        let pool = pool().await;
        let repo = SqlOrderRepository::new(pool.clone());
        repo.insert(&order("keep", 0)).await.expect("insert");
        repo.insert(&order("drop", 1)).await.expect("insert");

        assert!(repo.delete(&OrderId("drop".to_string())).await.expect("delete"));
        assert!(!repo.delete(&OrderId("drop".to_string())).await.expect("delete again"));

        let orphaned: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM order_item WHERE order_id = 'drop'")
                .fetch_one(&pool)
                .await
                .expect("count items");
        assert_eq!(orphaned, 0);

        let remaining = repo.list().await.expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].items.len(), 2);
    }

    #[tokio::test]
    async fn list_returns_insertion_order() {
        let repo = SqlOrderRepository::new(pool().await);
        repo.insert(&order("second-oldest", 5)).await.expect("insert");
        repo.insert(&order("oldest", 0)).await.expect("insert");
        repo.insert(&order("newest", 9)).await.expect("insert");

        let ids: Vec<_> =
            repo.list().await.expect("list").into_iter().map(|order| order.id.0).collect();
        assert_eq!(ids, ["second-oldest", "oldest", "newest"]);
    }

    #[tokio::test]
    async fn drifted_total_is_reported_as_persistence_failure() {
        let pool = pool().await;
        let repo = SqlOrderRepository::new(pool.clone());
        repo.insert(&order("ord-1", 0)).await.expect("insert");

        sqlx::query("UPDATE customer_order SET total_amount = '1' WHERE id = 'ord-1'")
            .execute(&pool)
            .await
            .expect("tamper total");

        let error =
            repo.find_by_id(&OrderId("ord-1".to_string())).await.expect_err("drift detected");
        assert!(matches!(error, ApplicationError::Persistence(ref message) if message.contains("decode")));
    }

    #[tokio::test]
    async fn duplicate_id_fails_without_partial_items() {
        let pool = pool().await;
        let repo = SqlOrderRepository::new(pool.clone());
        repo.insert(&order("ord-1", 0)).await.expect("insert");

        let error = repo.insert(&order("ord-1", 1)).await.expect_err("duplicate id");
        assert!(matches!(error, ApplicationError::Persistence(_)));

        let items: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM order_item")
            .fetch_one(&pool)
            .await
            .expect("count items");
        assert_eq!(items, 2);
    }
}
