use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use sqlx::{Pool, Postgres};
use std::sync::OnceLock;
use std::time::Instant;
use uuid::Uuid;

use shared_types::{AppError, ComplianceHealthComponent, Data};

use crate::auth::CurrentUser;
use crate::compliance::scoring;
use crate::error_convert::sqlx_to_app_error;
use crate::repo;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Record the application start time. Call once during startup.
pub fn record_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Health check response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub db: String,
    pub uptime_seconds: u64,
    pub version: String,
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(pool): State<Pool<Postgres>>) -> Json<HealthResponse> {
    let db_status = match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&pool).await {
        Ok(_) => "connected".to_string(),
        Err(e) => format!("error: {e}"),
    };

    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    Json(HealthResponse {
        status: "ok".to_string(),
        db: db_status,
        uptime_seconds: uptime,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/projects/{pid}/health/compliance
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/health/compliance",
    params(("pid" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Compliance health component", body = Data<ComplianceHealthComponent>),
        (status = 404, description = "Project not found", body = AppError)
    ),
    tag = "health"
)]
pub async fn compliance_health(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path(pid): Path<Uuid>,
) -> Result<Json<Data<ComplianceHealthComponent>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let component = scoring::health_component(&pool, pid).await?;
    Ok(Json(Data::new(component)))
}
