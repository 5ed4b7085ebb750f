use serde_json::json;
use storefront_db::{DbPool, DemoSeedDataset, SeedResult};

use crate::commands::{
    connect, migrate, prepare, CommandResult, StepError, EXIT_MIGRATION, EXIT_VERIFICATION,
};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config).await?;
        let outcome = load_and_verify(&pool).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => {
            let message = format!(
                "demo dataset loaded: {} products, {} orders ({})",
                seeded.products_seeded,
                seeded.orders_seeded.len(),
                seeded.orders_seeded.join(", ")
            );
            CommandResult::success_with_data(
                "seed",
                message,
                Some(json!({
                    "products_seeded": seeded.products_seeded,
                    "orders_seeded": seeded.orders_seeded,
                })),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

async fn load_and_verify(pool: &DbPool) -> Result<SeedResult, StepError> {
    migrate(pool).await?;

    let seeded = DemoSeedDataset::load(pool)
        .await
        .map_err(|error| ("seed_execution", error.to_string(), EXIT_MIGRATION))?;

    let verification = DemoSeedDataset::verify(pool)
        .await
        .map_err(|error| ("seed_verification", error.to_string(), EXIT_VERIFICATION))?;

    if !verification.all_present {
        return Err((
            "seed_verification",
            verification_message(&verification.checks),
            EXIT_VERIFICATION,
        ));
    }

    Ok(seeded)
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
