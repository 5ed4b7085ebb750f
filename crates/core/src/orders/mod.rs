pub mod aggregation;
pub mod lifecycle;
pub mod store;
pub mod validation;

pub use aggregation::{AggregationEngine, BestSeller, ProductSales, StoreStats};
pub use lifecycle::OrderLifecycle;
pub use store::OrderStore;
pub use validation::{validate_order_input, ItemDefect, ValidationFailure};
