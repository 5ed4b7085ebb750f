use std::sync::Arc;

use storefront_core::audit::{AuditSink, TracingAuditSink};
use storefront_core::config::AppConfig;
use storefront_core::{AggregationEngine, OrderLifecycle, OrderStore, ProductCatalog};
use storefront_db::{
    connect_with_settings, migrations, DbPool, SqlOrderRepository, SqlProductRepository,
};
use thiserror::Error;
use tracing::info;

use crate::auth::TokenVerifier;
use crate::pdf::{InvoiceRenderer, PdfError};
use crate::routes::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("invoice renderer initialization failed: {0}")]
    Invoice(#[source] PdfError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let state = build_state(&config, db_pool.clone())?;

    Ok(Application { config, db_pool, state })
}

/// Wires the SQL repositories into the core services behind the handler state.
pub fn build_state(config: &AppConfig, db_pool: DbPool) -> Result<AppState, BootstrapError> {
    let orders: Arc<dyn OrderStore> = Arc::new(SqlOrderRepository::new(db_pool.clone()));
    let catalog: Arc<dyn ProductCatalog> = Arc::new(SqlProductRepository::new(db_pool));
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    let invoices = InvoiceRenderer::new(&config.invoice).map_err(BootstrapError::Invoice)?;

    Ok(AppState {
        lifecycle: Arc::new(OrderLifecycle::new(orders.clone(), audit)),
        aggregation: Arc::new(AggregationEngine::new(orders, catalog)),
        tokens: Arc::new(TokenVerifier::new(&config.auth.jwt_secret)),
        invoices: Arc::new(invoices),
        best_sellers_default_limit: config.catalog.best_sellers_default_limit,
    })
}
