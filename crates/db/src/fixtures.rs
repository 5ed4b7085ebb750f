use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical demo orders and the state the seed must leave them in.
const SEED_ORDERS: &[SeedOrderContract] = &[
    SeedOrderContract {
        order_id: "ord-demo-001",
        status: "approved",
        expected_item_count: 2,
        total_amount: "65.5",
    },
    SeedOrderContract {
        order_id: "ord-demo-002",
        status: "pending",
        expected_item_count: 2,
        total_amount: "104.9",
    },
    SeedOrderContract {
        order_id: "ord-demo-003",
        status: "rejected",
        expected_item_count: 1,
        total_amount: "189",
    },
    SeedOrderContract {
        order_id: "ord-demo-004",
        status: "approved",
        expected_item_count: 2,
        total_amount: "99.5",
    },
];

const SEED_PRODUCT_IDS: &[&str] = &[
    "prod-tee-classic",
    "prod-hoodie-zip",
    "prod-cap-logo",
    "prod-sneaker-run",
    "prod-tote-canvas",
];

/// Demo storefront dataset: a small catalog plus orders in every status.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &'static str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Loads the dataset. Rows that already exist are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(SeedResult {
            products_seeded: SEED_PRODUCT_IDS.len(),
            orders_seeded: SEED_ORDERS.iter().map(|order| order.order_id).collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let quoted_products = sql_array_from_ids(SEED_PRODUCT_IDS);
        let product_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product WHERE id IN {quoted_products}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("products", product_count == SEED_PRODUCT_IDS.len() as i64));

        for order in SEED_ORDERS {
            let order_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM customer_order WHERE id = ?1 AND status = ?2 AND total_amount = ?3)",
            )
            .bind(order.order_id)
            .bind(order.status)
            .bind(order.total_amount)
            .fetch_one(pool)
            .await?;
            checks.push((order.order_id, order_ok == 1));

            let item_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM order_item WHERE order_id = ?1")
                    .bind(order.order_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((order.item_count_label(), item_count == order.expected_item_count));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded rows; items go with their orders.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let order_ids: Vec<&str> = SEED_ORDERS.iter().map(|order| order.order_id).collect();
        let quoted_orders = sql_array_from_ids(&order_ids);
        let quoted_products = sql_array_from_ids(SEED_PRODUCT_IDS);

        sqlx::query(&format!("DELETE FROM customer_order WHERE id IN {quoted_orders}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM product WHERE id IN {quoted_products}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedOrderContract {
    order_id: &'static str,
    status: &'static str,
    expected_item_count: i64,
    total_amount: &'static str,
}

impl SeedOrderContract {
    fn item_count_label(&self) -> &'static str {
        match self.order_id {
            "ord-demo-001" => "ord-demo-001-items",
            "ord-demo-002" => "ord-demo-002-items",
            "ord-demo-003" => "ord-demo-003-items",
            _ => "ord-demo-004-items",
        }
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub products_seeded: usize,
    pub orders_seeded: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
