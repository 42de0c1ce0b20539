use axum::{
    extract::{Path, Query, State},
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    is_valid_clause_kind, AppError, ClauseListParams, ClauseResponse, Data, ParseContractRequest,
    ParseContractResponse,
};

use crate::auth::CurrentUser;
use crate::compliance::extractor;
use crate::error_convert::sqlx_to_app_error;
use crate::repo;

/// POST /api/projects/{pid}/compliance/parse-contract
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/parse-contract",
    request_body = ParseContractRequest,
    params(("pid" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Clauses extracted", body = Data<ParseContractResponse>),
        (status = 400, description = "Invalid document", body = AppError),
        (status = 502, description = "Language model failure", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn parse_contract(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path(pid): Path<Uuid>,
    Json(body): Json<ParseContractRequest>,
) -> Result<Json<Data<ParseContractResponse>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let clauses = extractor::extract_clauses(&pool, pid, body.document_id, &user.0).await?;

    Ok(Json(Data::new(ParseContractResponse {
        clauses_extracted: clauses.len(),
        clauses: clauses.into_iter().map(ClauseResponse::from).collect(),
    })))
}

/// GET /api/projects/{pid}/compliance/clauses
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/clauses",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ClauseListParams
    ),
    responses(
        (status = 200, description = "Clauses", body = Data<Vec<ClauseResponse>>)
    ),
    tag = "compliance"
)]
pub async fn list_clauses(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path(pid): Path<Uuid>,
    Query(params): Query<ClauseListParams>,
) -> Result<Json<Data<Vec<ClauseResponse>>>, AppError> {
    if let Some(kind) = params.kind.as_deref() {
        if !is_valid_clause_kind(kind) {
            return Err(AppError::bad_request(format!("Invalid clause kind: {}", kind)));
        }
    }

    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;

    let clauses = repo::clause::list(&mut conn, pid, params.kind.as_deref(), params.confirmed).await?;
    Ok(Json(Data::new(
        clauses.into_iter().map(ClauseResponse::from).collect(),
    )))
}

/// GET /api/projects/{pid}/compliance/clauses/{cid}
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/clauses/{cid}",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("cid" = Uuid, Path, description = "Clause ID")
    ),
    responses(
        (status = 200, description = "Clause", body = Data<ClauseResponse>),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn get_clause(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path((pid, cid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Data<ClauseResponse>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    let clause = repo::clause::find_by_id(&mut conn, pid, cid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Clause {} not found", cid)))?;

    Ok(Json(Data::new(ClauseResponse::from(clause))))
}

/// PATCH /api/projects/{pid}/compliance/clauses/{cid}/confirm
#[utoipa::path(
    patch,
    path = "/api/projects/{pid}/compliance/clauses/{cid}/confirm",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("cid" = Uuid, Path, description = "Clause ID")
    ),
    responses(
        (status = 200, description = "Clause confirmed", body = Data<ClauseResponse>),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn confirm_clause(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path((pid, cid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Data<ClauseResponse>>, AppError> {
    let clause = extractor::confirm_clause(&pool, pid, cid, &user.0).await?;
    Ok(Json(Data::new(ClauseResponse::from(clause))))
}
