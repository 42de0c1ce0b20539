use axum::extract::FromRef;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// State handed to every handler. `FromRef` lets extractors pull the pool
/// out directly as `State<Pool<Postgres>>`.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: Pool<Postgres>,
}

/// Build the Postgres pool from `DATABASE_URL`.
///
/// Connections open lazily, so startup succeeds without a reachable
/// database and the first query pays the connection cost. Pool size comes
/// from `DATABASE_MAX_CONNECTIONS`; acquisition is capped so a saturated
/// pool surfaces as an error rather than a hung request.
pub fn create_pool() -> Pool<Postgres> {
    let _ = dotenvy::dotenv();

    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy(&url)
        .expect("invalid DATABASE_URL")
}

/// Apply pending migrations. Called once at startup, before the listener
/// accepts traffic and before the scheduler spawns.
pub async fn run_migrations(pool: &Pool<Postgres>) {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .expect("database migrations failed");
}
