use std::sync::Arc;

use serde_json::json;
use storefront_core::{AggregationEngine, BestSeller, StoreStats};
use storefront_db::{DbPool, SqlOrderRepository, SqlProductRepository};

use crate::commands::{connect, prepare, CommandResult, StepError, EXIT_VERIFICATION};

/// Read-only: reports over whatever the database holds and never migrates it.
pub fn run(limit: Option<usize>) -> CommandResult {
    let (config, runtime) = match prepare("stats") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };
    let limit =
        limit.filter(|limit| *limit > 0).unwrap_or(config.catalog.best_sellers_default_limit);

    let result = runtime.block_on(async {
        let pool = connect(&config).await?;
        let report = aggregate(&pool, limit).await;
        pool.close().await;
        report
    });

    match result {
        Ok((stats, best_sellers)) => {
            let message = format!(
                "{} orders, {} products, approved revenue {}",
                stats.orders_count, stats.products_count, stats.total_revenue
            );
            CommandResult::success_with_data(
                "stats",
                message,
                Some(json!({ "stats": stats, "bestSellers": best_sellers })),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("stats", error_class, message, exit_code)
        }
    }
}

async fn aggregate(
    pool: &DbPool,
    limit: usize,
) -> Result<(StoreStats, Vec<BestSeller>), StepError> {
    let engine = AggregationEngine::new(
        Arc::new(SqlOrderRepository::new(pool.clone())),
        Arc::new(SqlProductRepository::new(pool.clone())),
    );

    let stats =
        engine.stats().await.map_err(|error| ("query", error.to_string(), EXIT_VERIFICATION))?;
    let best_sellers = engine
        .best_sellers(limit)
        .await
        .map_err(|error| ("query", error.to_string(), EXIT_VERIFICATION))?;

    Ok((stats, best_sellers))
}
