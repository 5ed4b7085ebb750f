use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use storefront_core::catalog::ProductCatalog;
use storefront_core::domain::product::{Product, ProductColor, ProductId};
use storefront_core::errors::ApplicationError;

use super::{decode_decimal, decode_timestamp, decode_u32, RepositoryError};
use crate::DbPool;

/// Ids bound per `IN (...)` lookup, well under SQLite's bound-parameter limit.
const LOOKUP_CHUNK: usize = 500;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub(crate) async fn save(&self, product: &Product) -> Result<(), RepositoryError> {
        let sizes = serde_json::to_string(&product.sizes)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let colors = serde_json::to_string(&product.colors)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO product (
                id, name, description, price, category, sizes_json, colors_json,
                stock, is_new, is_featured, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id.0)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(product.category.as_deref())
        .bind(sizes)
        .bind(colors)
        .bind(i64::from(product.stock))
        .bind(product.is_new)
        .bind(product.is_featured)
        .bind(super::encode_timestamp(&product.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let mut products = Vec::new();
        for chunk in ids.chunks(LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT id, name, description, price, category, sizes_json, colors_json, \
                 stock, is_new, is_featured, created_at FROM product WHERE id IN ({placeholders})"
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(&id.0);
            }

            for row in query.fetch_all(&self.pool).await? {
                products.push(product_from_row(&row)?);
            }
        }
        Ok(products)
    }

    async fn count_products(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM product")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(count).map_err(|_| RepositoryError::Decode(format!("negative count {count}")))
    }
}

#[async_trait]
impl ProductCatalog for SqlProductRepository {
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApplicationError> {
        Ok(self.fetch_by_ids(ids).await?)
    }

    async fn count(&self) -> Result<u64, ApplicationError> {
        Ok(self.count_products().await?)
    }
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let price_raw: String =
        row.try_get("price").map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let sizes_raw: String =
        row.try_get("sizes_json").map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let colors_raw: String =
        row.try_get("colors_json").map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let stock: i64 =
        row.try_get("stock").map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let created_raw: String =
        row.try_get("created_at").map_err(|error| RepositoryError::Decode(error.to_string()))?;

    let sizes: Vec<String> = serde_json::from_str(&sizes_raw)
        .map_err(|error| RepositoryError::Decode(format!("sizes_json: {error}")))?;
    let colors: Vec<ProductColor> = serde_json::from_str(&colors_raw)
        .map_err(|error| RepositoryError::Decode(format!("colors_json: {error}")))?;

    Ok(Product {
        id: ProductId(row.try_get("id").map_err(|error| RepositoryError::Decode(error.to_string()))?),
        name: row.try_get("name").map_err(|error| RepositoryError::Decode(error.to_string()))?,
        description: row
            .try_get("description")
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        price: decode_decimal("price", &price_raw)?,
        category: row
            .try_get("category")
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        sizes,
        colors,
        stock: decode_u32("stock", stock)?,
        is_new: row.try_get("is_new").map_err(|error| RepositoryError::Decode(error.to_string()))?,
        is_featured: row
            .try_get("is_featured")
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        created_at: decode_timestamp("created_at", &created_raw)?,
    })
}
