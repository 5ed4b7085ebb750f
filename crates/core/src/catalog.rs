use async_trait::async_trait;

use crate::domain::product::{Product, ProductId};
use crate::errors::ApplicationError;

/// Read side of the product catalog, as far as aggregation needs it.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Resolves a batch of ids in one lookup. Unknown ids are skipped and the result
    /// order is unspecified.
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApplicationError>;

    async fn count(&self) -> Result<u64, ApplicationError>;
}
