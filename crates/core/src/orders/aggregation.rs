//! Best-seller ranking and the revenue summary.
//!
//! Both views are recomputed from the order store on every call. Ranking happens on ids
//! first and products are joined afterwards, so the catalog is hit once per request.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::ProductCatalog;
use crate::domain::order::Order;
use crate::domain::product::{Product, ProductId};
use crate::errors::ApplicationError;
use crate::orders::store::OrderStore;

pub const DEFAULT_BEST_SELLERS_LIMIT: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub total_sold: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestSeller {
    #[serde(flatten)]
    pub product: Product,
    pub total_sold: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub orders_count: u64,
    pub products_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
}

/// Sums quantities per product across every order regardless of status, then ranks by
/// total descending. Ties keep first-seen order (orders as given, items by position).
pub fn rank_best_sellers(orders: &[Order], limit: usize) -> Vec<ProductSales> {
    let mut positions: HashMap<&ProductId, usize> = HashMap::new();
    let mut ranked: Vec<ProductSales> = Vec::new();

    for item in orders.iter().flat_map(|order| order.items.iter()) {
        match positions.get(&item.product_id) {
            Some(&position) => ranked[position].total_sold += u64::from(item.quantity),
            None => {
                positions.insert(&item.product_id, ranked.len());
                ranked.push(ProductSales {
                    product_id: item.product_id.clone(),
                    total_sold: u64::from(item.quantity),
                });
            }
        }
    }

    ranked.sort_by(|left, right| right.total_sold.cmp(&left.total_sold));
    ranked.truncate(limit);
    ranked
}

/// Keeps ranking order and drops ids the catalog does not know.
pub fn join_ranked(ranked: &[ProductSales], products: Vec<Product>) -> Vec<BestSeller> {
    let mut by_id: HashMap<ProductId, Product> =
        products.into_iter().map(|product| (product.id.clone(), product)).collect();

    ranked
        .iter()
        .filter_map(|sales| {
            by_id
                .remove(&sales.product_id)
                .map(|product| BestSeller { product, total_sold: sales.total_sold })
        })
        .collect()
}

/// `None` when the approved totals no longer fit in a `Decimal`.
pub fn approved_revenue(orders: &[Order]) -> Option<Decimal> {
    orders
        .iter()
        .filter(|order| order.status.counts_as_revenue())
        .try_fold(Decimal::ZERO, |total, order| total.checked_add(order.total_amount))
}

/// Interprets a raw `limit` query value. Leading digits are honoured (`"5abc"` is 5);
/// anything missing, non-numeric, zero or negative falls back to `default`.
pub fn resolve_limit(raw: Option<&str>, default: usize) -> usize {
    let Some(raw) = raw.map(str::trim) else {
        return default;
    };
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let digits: String = digits.chars().take_while(char::is_ascii_digit).collect();
    if negative || digits.is_empty() {
        return default;
    }
    match digits.parse::<usize>() {
        Ok(0) => default,
        Ok(limit) => limit,
        Err(_) => usize::MAX,
    }
}

pub struct AggregationEngine {
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn ProductCatalog>,
}

impl AggregationEngine {
    pub fn new(orders: Arc<dyn OrderStore>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { orders, catalog }
    }

    pub async fn best_sellers(&self, limit: usize) -> Result<Vec<BestSeller>, ApplicationError> {
        let orders = self.orders.list().await?;
        let ranked = rank_best_sellers(&orders, limit);
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ProductId> = ranked.iter().map(|sales| sales.product_id.clone()).collect();
        let products = self.catalog.find_by_ids(&ids).await?;
        Ok(join_ranked(&ranked, products))
    }

    pub async fn stats(&self) -> Result<StoreStats, ApplicationError> {
        let orders = self.orders.list().await?;
        let products_count = self.catalog.count().await?;
        let total_revenue = approved_revenue(&orders).ok_or_else(|| {
            ApplicationError::Integration("approved revenue exceeds the decimal range".to_string())
        })?;
        Ok(StoreStats { orders_count: orders.len() as u64, products_count, total_revenue })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{
        approved_revenue, join_ranked, rank_best_sellers, resolve_limit, AggregationEngine,
        ProductSales,
    };
    use crate::domain::order::{NewOrder, Order, OrderId, OrderLineItem, OrderStatus};
    use crate::domain::product::{Product, ProductId};
    use crate::errors::ApplicationError;
    use crate::memory::{InMemoryOrderStore, InMemoryProductCatalog};
    use crate::orders::store::OrderStore;

    fn order(id: &str, lines: &[(&str, u32, i64)], status: OrderStatus) -> Order {
        let mut order = Order::place(
            NewOrder {
                customer_email: "a@b.com".to_string(),
                customer_name: "A B".to_string(),
                shipping_address: "1 St".to_string(),
                phone: "123".to_string(),
                items: lines
                    .iter()
                    .map(|(product, quantity, price)| OrderLineItem {
                        product_id: ProductId(product.to_string()),
                        name: product.to_string(),
                        size: "Standard".to_string(),
                        color: "N/A".to_string(),
                        quantity: *quantity,
                        price: Decimal::from(*price),
                    })
                    .collect(),
            },
            OrderId(id.to_string()),
            Utc::now(),
        )
        .expect("representable total");
        order.status = status;
        order
    }

    fn product(id: &str) -> Product {
        Product {
            id: ProductId(id.to_string()),
            name: format!("Product {id}"),
            description: String::new(),
            price: Decimal::TEN,
            category: None,
            sizes: vec![],
            colors: vec![],
            stock: 5,
            is_new: false,
            is_featured: false,
            created_at: Utc::now(),
        }
    }

    fn ids(ranked: &[ProductSales]) -> Vec<(&str, u64)> {
        ranked.iter().map(|sales| (sales.product_id.0.as_str(), sales.total_sold)).collect()
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let orders = vec![
            order("o1", &[("A", 3, 1)], OrderStatus::Pending),
            order("o2", &[("B", 5, 1)], OrderStatus::Pending),
            order("o3", &[("A", 2, 1)], OrderStatus::Pending),
        ];

        assert_eq!(ids(&rank_best_sellers(&orders, 12)), [("A", 5), ("B", 5)]);
    }

    #[test]
    fn ranking_counts_every_status_and_truncates() {
        let orders = vec![
            order("o1", &[("X", 4, 1)], OrderStatus::Rejected),
            order("o2", &[("Y", 9, 1), ("X", 1, 1)], OrderStatus::Approved),
            order("o3", &[("Z", 1, 1)], OrderStatus::Pending),
        ];

        assert_eq!(ids(&rank_best_sellers(&orders, 2)), [("Y", 9), ("X", 5)]);
        assert!(rank_best_sellers(&[], 12).is_empty());
    }

    #[test]
    fn join_preserves_rank_and_drops_unknown_products() {
        let ranked = vec![
            ProductSales { product_id: ProductId("B".to_string()), total_sold: 7 },
            ProductSales { product_id: ProductId("gone".to_string()), total_sold: 6 },
            ProductSales { product_id: ProductId("A".to_string()), total_sold: 2 },
        ];

        let joined = join_ranked(&ranked, vec![product("A"), product("B")]);

        let pairs: Vec<_> =
            joined.iter().map(|entry| (entry.product.id.0.as_str(), entry.total_sold)).collect();
        assert_eq!(pairs, [("B", 7), ("A", 2)]);
    }

    #[test]
    fn revenue_counts_only_approved_orders() {
        let orders = vec![
            order("o1", &[("A", 1, 100)], OrderStatus::Approved),
            order("o2", &[("A", 1, 50)], OrderStatus::Pending),
            order("o3", &[("A", 1, 30)], OrderStatus::Rejected),
        ];

        assert_eq!(approved_revenue(&orders), Some(Decimal::from(100)));
        assert_eq!(approved_revenue(&[]), Some(Decimal::ZERO));
    }

    #[test]
    fn revenue_overflow_is_reported_instead_of_panicking() {
        let huge = Decimal::from_str_exact("50000000000000000000000000000").expect("decimal");
        let mut orders = vec![
            order("o1", &[("A", 1, 1)], OrderStatus::Approved),
            order("o2", &[("A", 1, 1)], OrderStatus::Approved),
        ];
        for order in &mut orders {
            order.items[0].price = huge;
            order.total_amount = huge;
        }

        assert_eq!(approved_revenue(&orders), None);

        orders[1].status = OrderStatus::Pending;
        assert_eq!(approved_revenue(&orders), Some(huge));
    }

    #[tokio::test]
    async fn stats_with_overflowing_revenue_is_an_internal_failure() {
        let huge = Decimal::from_str_exact("50000000000000000000000000000").expect("decimal");
        let store = Arc::new(InMemoryOrderStore::new());
        for id in ["o1", "o2"] {
            let mut big = order(id, &[("A", 1, 1)], OrderStatus::Approved);
            big.items[0].price = huge;
            big.total_amount = huge;
            store.insert(&big).await.expect("insert");
        }

        let engine = AggregationEngine::new(store, Arc::new(InMemoryProductCatalog::new()));
        let error = engine.stats().await.expect_err("revenue overflow");

        assert!(matches!(error, ApplicationError::Integration(_)));
        assert_eq!(error.into_interface("req-1").status_code(), 500);
    }

    #[test]
    fn limit_falls_back_to_default() {
        assert_eq!(resolve_limit(None, 12), 12);
        assert_eq!(resolve_limit(Some("abc"), 12), 12);
        assert_eq!(resolve_limit(Some("0"), 12), 12);
        assert_eq!(resolve_limit(Some("-4"), 12), 12);
        assert_eq!(resolve_limit(Some(""), 12), 12);
        assert_eq!(resolve_limit(Some("3"), 12), 3);
        assert_eq!(resolve_limit(Some("5abc"), 12), 5);
        assert_eq!(resolve_limit(Some("2.9"), 12), 2);
    }

    #[tokio::test]
    async fn engine_joins_ranked_products_and_summarizes_stats() {
        let store = Arc::new(InMemoryOrderStore::new());
        let catalog = Arc::new(InMemoryProductCatalog::new());
        catalog.save(product("X")).await;
        catalog.save(product("Y")).await;
        catalog.save(product("unsold")).await;
        store.insert(&order("o1", &[("X", 4, 10)], OrderStatus::Approved)).await.expect("insert");
        store.insert(&order("o2", &[("Y", 9, 2)], OrderStatus::Pending)).await.expect("insert");

        let engine = AggregationEngine::new(store, catalog);

        let best = engine.best_sellers(1).await.expect("best sellers");
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].product.id.0, "Y");
        assert_eq!(best[0].total_sold, 9);

        let value = serde_json::to_value(&best[0]).expect("serialize best seller");
        assert_eq!(value["totalSold"], 9);
        assert_eq!(value["name"], "Product Y");

        let stats = engine.stats().await.expect("stats");
        assert_eq!(stats.orders_count, 2);
        assert_eq!(stats.products_count, 3);
        assert_eq!(stats.total_revenue, Decimal::from(40));
    }
}
