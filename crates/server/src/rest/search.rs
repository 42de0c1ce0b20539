use axum::{
    extract::{Path, Query, State},
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    is_valid_deadline_status, is_valid_notice_status, is_valid_severity, parse_search_types,
    AppError, ComplianceSearchParams, ComplianceSearchResult, Data,
};

use crate::auth::CurrentUser;
use crate::error_convert::sqlx_to_app_error;
use crate::repo;

/// GET /api/projects/{pid}/compliance/search
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/search",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ComplianceSearchParams
    ),
    responses(
        (status = 200, description = "Search results", body = Data<Vec<ComplianceSearchResult>>),
        (status = 400, description = "Invalid filter", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn search_compliance(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path(pid): Path<Uuid>,
    Query(params): Query<ComplianceSearchParams>,
) -> Result<Json<Data<Vec<ComplianceSearchResult>>>, AppError> {
    if params.q.trim().is_empty() {
        return Err(AppError::bad_request("q must not be empty"));
    }

    let types = parse_search_types(params.types.as_deref()).map_err(AppError::bad_request)?;

    // The status filter applies to deadlines and notices, whose status sets
    // differ; accept values from either.
    if let Some(status) = params.status.as_deref() {
        if !is_valid_deadline_status(status) && !is_valid_notice_status(status) {
            return Err(AppError::bad_request(format!("Invalid status: {}", status)));
        }
    }
    if let Some(severity) = params.severity.as_deref() {
        if !is_valid_severity(severity) {
            return Err(AppError::bad_request(format!("Invalid severity: {}", severity)));
        }
    }

    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;

    let results = repo::search::search(
        &mut conn,
        pid,
        params.q.trim(),
        &types,
        params.status.as_deref(),
        params.severity.as_deref(),
    )
    .await?;

    Ok(Json(Data::new(results)))
}
