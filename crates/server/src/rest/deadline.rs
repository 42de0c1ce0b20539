use axum::{
    extract::{Path, Query, State},
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    is_valid_trigger_event_type, AppError, AuditLogResponse, ChangeEventTriggerRequest,
    CreateDeadlineRequest, Data, DeadlineListParams, DeadlineResponse, RfiComplianceCheck,
    RfiTriggerRequest, WaiveDeadlineRequest,
};

use crate::auth::CurrentUser;
use crate::compliance::deadlines::{self, CreateDeadlineParams};
use crate::compliance::triggers;
use crate::error_convert::{sqlx_to_app_error, ValidateRequest};
use crate::repo;

/// GET /api/projects/{pid}/compliance/deadlines
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/deadlines",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        DeadlineListParams
    ),
    responses(
        (status = 200, description = "Deadlines", body = Data<Vec<DeadlineResponse>>)
    ),
    tag = "compliance"
)]
pub async fn list_deadlines(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path(pid): Path<Uuid>,
    Query(params): Query<DeadlineListParams>,
) -> Result<Json<Data<Vec<DeadlineResponse>>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let deadlines =
        deadlines::list_deadlines(&pool, pid, params.status.as_deref(), params.severity.as_deref())
            .await?;
    Ok(Json(Data::new(
        deadlines.into_iter().map(DeadlineResponse::from).collect(),
    )))
}

/// POST /api/projects/{pid}/compliance/deadlines
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/deadlines",
    request_body = CreateDeadlineRequest,
    params(("pid" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Deadline created", body = Data<DeadlineResponse>),
        (status = 400, description = "Bad clause parameters", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn create_deadline(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path(pid): Path<Uuid>,
    Json(body): Json<CreateDeadlineRequest>,
) -> Result<Json<Data<DeadlineResponse>>, AppError> {
    body.validate_request()?;
    if !is_valid_trigger_event_type(&body.trigger_event_type) {
        return Err(AppError::bad_request(format!(
            "Invalid triggerEventType: {}",
            body.trigger_event_type
        )));
    }

    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let created = deadlines::create_deadline(
        &pool,
        CreateDeadlineParams {
            project_id: pid,
            clause_id: body.clause_id,
            trigger_event_type: body.trigger_event_type,
            trigger_event_id: body.trigger_event_id,
            trigger_description: body.trigger_description,
            triggered_at: body.triggered_at.naive_utc(),
            triggered_by: Some(user.0.id),
        },
    )
    .await?;

    let response = DeadlineResponse::from(created.deadline).with_cure_deadline(created.cure_deadline);
    Ok(Json(Data::new(response)))
}

/// GET /api/projects/{pid}/compliance/deadlines/{did}
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/deadlines/{did}",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("did" = Uuid, Path, description = "Deadline ID")
    ),
    responses(
        (status = 200, description = "Deadline", body = Data<DeadlineResponse>),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn get_deadline(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path((pid, did)): Path<(Uuid, Uuid)>,
) -> Result<Json<Data<DeadlineResponse>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    let deadline = repo::deadline::find_by_id(&mut conn, pid, did)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Deadline {} not found", did)))?;

    Ok(Json(Data::new(DeadlineResponse::from(deadline))))
}

/// POST /api/projects/{pid}/compliance/deadlines/{did}/waive
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/deadlines/{did}/waive",
    request_body = WaiveDeadlineRequest,
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("did" = Uuid, Path, description = "Deadline ID")
    ),
    responses(
        (status = 200, description = "Deadline waived", body = Data<DeadlineResponse>),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn waive_deadline(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path((pid, did)): Path<(Uuid, Uuid)>,
    Json(body): Json<WaiveDeadlineRequest>,
) -> Result<Json<Data<DeadlineResponse>>, AppError> {
    body.validate_request()?;

    let deadline = deadlines::waive_deadline(&pool, pid, did, user.0.id, &body.reason).await?;
    Ok(Json(Data::new(DeadlineResponse::from(deadline))))
}

/// GET /api/projects/{pid}/compliance/deadlines/{did}/audit
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/deadlines/{did}/audit",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("did" = Uuid, Path, description = "Deadline ID")
    ),
    responses(
        (status = 200, description = "Audit trail for the deadline", body = Data<Vec<AuditLogResponse>>),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn deadline_audit(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path((pid, did)): Path<(Uuid, Uuid)>,
) -> Result<Json<Data<Vec<AuditLogResponse>>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::deadline::find_by_id(&mut conn, pid, did)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Deadline {} not found", did)))?;

    let entries =
        repo::audit::list_for_entity(&mut conn, pid, "ComplianceDeadline", &did.to_string(), 100)
            .await?;
    Ok(Json(Data::new(
        entries.into_iter().map(AuditLogResponse::from).collect(),
    )))
}

/// POST /api/projects/{pid}/compliance/triggers/rfi
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/triggers/rfi",
    request_body = RfiTriggerRequest,
    params(("pid" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Deadlines created (possibly zero)", body = Data<Vec<DeadlineResponse>>)
    ),
    tag = "compliance"
)]
pub async fn trigger_rfi(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path(pid): Path<Uuid>,
    Json(body): Json<RfiTriggerRequest>,
) -> Result<Json<Data<Vec<DeadlineResponse>>>, AppError> {
    body.validate_request()?;

    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let created = triggers::trigger_rfi_compliance(
        &pool,
        pid,
        &body.rfi_id,
        &body.rfi_number,
        &body.rfi_subject,
        Some(user.0.id),
    )
    .await?;

    Ok(Json(Data::new(
        created
            .into_iter()
            .map(|c| DeadlineResponse::from(c.deadline).with_cure_deadline(c.cure_deadline))
            .collect(),
    )))
}

/// POST /api/projects/{pid}/compliance/change-events
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/change-events",
    request_body = ChangeEventTriggerRequest,
    params(("pid" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Deadlines created (possibly zero)", body = Data<Vec<DeadlineResponse>>)
    ),
    tag = "compliance"
)]
pub async fn trigger_change_event(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path(pid): Path<Uuid>,
    Json(body): Json<ChangeEventTriggerRequest>,
) -> Result<Json<Data<Vec<DeadlineResponse>>>, AppError> {
    body.validate_request()?;

    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let created = triggers::trigger_change_event_compliance(
        &pool,
        pid,
        &body.change_event_id,
        &body.description,
        Some(user.0.id),
    )
    .await?;

    Ok(Json(Data::new(
        created
            .into_iter()
            .map(|c| DeadlineResponse::from(c.deadline).with_cure_deadline(c.cure_deadline))
            .collect(),
    )))
}

/// GET /api/projects/{pid}/compliance/rfis/{rfi_id}/check
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/rfis/{rfi_id}/check",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("rfi_id" = String, Path, description = "RFI ID")
    ),
    responses(
        (status = 200, description = "Deadlines triggered by this RFI", body = Data<RfiComplianceCheck>)
    ),
    tag = "compliance"
)]
pub async fn check_rfi(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path((pid, rfi_id)): Path<(Uuid, String)>,
) -> Result<Json<Data<RfiComplianceCheck>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let check = triggers::check_rfi_compliance(&pool, pid, &rfi_id).await?;
    Ok(Json(Data::new(check)))
}
