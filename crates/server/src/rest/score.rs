use axum::{
    extract::{Path, Query, State},
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    is_valid_period_type, AppError, Data, ScoreHistoryParams, ScoreHistoryResponse, ScoreResponse,
};

use crate::auth::CurrentUser;
use crate::compliance::scoring;
use crate::error_convert::sqlx_to_app_error;
use crate::repo;

/// GET /api/projects/{pid}/compliance/score
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/score",
    params(("pid" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Current score", body = Data<ScoreResponse>)
    ),
    tag = "compliance"
)]
pub async fn get_score(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path(pid): Path<Uuid>,
) -> Result<Json<Data<ScoreResponse>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let score = scoring::current_score(&pool, pid).await?;
    Ok(Json(Data::new(ScoreResponse::from(score))))
}

/// POST /api/projects/{pid}/compliance/score/recalculate
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/score/recalculate",
    params(("pid" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Recomputed score", body = Data<ScoreResponse>)
    ),
    tag = "compliance"
)]
pub async fn recalculate_score(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path(pid): Path<Uuid>,
) -> Result<Json<Data<ScoreResponse>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let score = scoring::recalculate(&pool, pid).await?;
    Ok(Json(Data::new(ScoreResponse::from(score))))
}

/// GET /api/projects/{pid}/compliance/score/history
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/score/history",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ScoreHistoryParams
    ),
    responses(
        (status = 200, description = "Score history", body = Data<Vec<ScoreHistoryResponse>>),
        (status = 400, description = "Invalid period", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn score_history(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path(pid): Path<Uuid>,
    Query(params): Query<ScoreHistoryParams>,
) -> Result<Json<Data<Vec<ScoreHistoryResponse>>>, AppError> {
    let period = params.period.as_deref().unwrap_or("daily");
    if !is_valid_period_type(period) {
        return Err(AppError::bad_request(format!(
            "Invalid period: {}. Valid values: daily, weekly, monthly",
            period
        )));
    }

    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let limit = params.limit.unwrap_or(30);
    let history = scoring::score_history(&pool, pid, period, limit).await?;
    Ok(Json(Data::new(
        history.into_iter().map(ScoreHistoryResponse::from).collect(),
    )))
}
