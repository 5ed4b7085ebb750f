use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use storefront_db::DbPool;
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Probe {
    pub status: Readiness,
    pub detail: String,
}

impl Probe {
    fn ready(detail: &str) -> Self {
        Self { status: Readiness::Ready, detail: detail.to_string() }
    }

    fn degraded(detail: String) -> Self {
        Self { status: Readiness::Degraded, detail }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: Readiness,
    pub database: Probe,
    pub order_store: Probe,
    pub checked_at: String,
}

/// `GET /health`: 200 when the database answers and the order schema is in place, 503
/// otherwise.
pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let database = probe_database(&state.db_pool).await;
    let order_store = if database.status == Readiness::Ready {
        probe_order_store(&state.db_pool).await
    } else {
        Probe::degraded("skipped: database unreachable".to_string())
    };

    let ready = database.status == Readiness::Ready && order_store.status == Readiness::Ready;
    if !ready {
        warn!(
            event_name = "system.health.degraded",
            correlation_id = "health",
            database = %database.detail,
            order_store = %order_store.detail,
            "health probe degraded"
        );
    }

    let report = HealthReport {
        status: if ready { Readiness::Ready } else { Readiness::Degraded },
        database,
        order_store,
        checked_at: Utc::now().to_rfc3339(),
    };
    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(report))
}

async fn probe_database(pool: &DbPool) -> Probe {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => Probe::ready("database query succeeded"),
        Err(error) => Probe::degraded(format!("database query failed: {error}")),
    }
}

async fn probe_order_store(pool: &DbPool) -> Probe {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM customer_order").fetch_one(pool).await
    {
        Ok(_) => Probe::ready("order tables reachable"),
        Err(error) => Probe::degraded(format!("order tables unavailable: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use storefront_db::{connect_with_settings, migrations};

    use super::{health, HealthState, Readiness};

    #[tokio::test]
    async fn ready_once_migrations_are_applied() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");

        let (status, Json(report)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, Readiness::Ready);
        assert_eq!(report.order_store.status, Readiness::Ready);

        pool.close().await;
    }

    #[tokio::test]
    async fn degraded_without_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");

        let (status, Json(report)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.database.status, Readiness::Ready);
        assert_eq!(report.order_store.status, Readiness::Degraded);

        pool.close().await;
    }

    #[tokio::test]
    async fn degraded_when_database_is_closed() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        pool.close().await;

        let (status, Json(report)) = health(State(HealthState { db_pool: pool })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.status, Readiness::Degraded);
        assert_eq!(report.database.status, Readiness::Degraded);
    }
}
