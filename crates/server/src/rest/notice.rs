use axum::{
    extract::{Path, Query, State},
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    is_valid_notice_status, is_valid_notice_type, AppError, ConfirmDeliveryRequest,
    CreateNoticeRequest, Data, NoticeListParams, NoticeResponse, RegenerateNoticeRequest,
    UpdateNoticeRequest,
};

use crate::auth::CurrentUser;
use crate::compliance::notices;
use crate::error_convert::{sqlx_to_app_error, ValidateRequest};
use crate::repo;

/// GET /api/projects/{pid}/compliance/notices
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/notices",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        NoticeListParams
    ),
    responses(
        (status = 200, description = "Notices", body = Data<Vec<NoticeResponse>>)
    ),
    tag = "compliance"
)]
pub async fn list_notices(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path(pid): Path<Uuid>,
    Query(params): Query<NoticeListParams>,
) -> Result<Json<Data<Vec<NoticeResponse>>>, AppError> {
    if let Some(status) = params.status.as_deref() {
        if !is_valid_notice_status(status) {
            return Err(AppError::bad_request(format!("Invalid status: {}", status)));
        }
    }
    if let Some(notice_type) = params.notice_type.as_deref() {
        if !is_valid_notice_type(notice_type) {
            return Err(AppError::bad_request(format!("Invalid type: {}", notice_type)));
        }
    }

    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;

    let notices = repo::notice::list(
        &mut conn,
        pid,
        params.status.as_deref(),
        params.notice_type.as_deref(),
    )
    .await?;
    Ok(Json(Data::new(
        notices.into_iter().map(NoticeResponse::from).collect(),
    )))
}

/// POST /api/projects/{pid}/compliance/notices
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/notices",
    request_body = CreateNoticeRequest,
    params(("pid" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Notice created", body = Data<NoticeResponse>),
        (status = 400, description = "Invalid request", body = AppError),
        (status = 502, description = "Language model failure", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn create_notice(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path(pid): Path<Uuid>,
    Json(body): Json<CreateNoticeRequest>,
) -> Result<Json<Data<NoticeResponse>>, AppError> {
    body.validate_request()?;

    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;
    drop(conn);

    let notice = notices::create_notice(&pool, pid, body, &user.0).await?;
    Ok(Json(Data::new(NoticeResponse::from(notice))))
}

/// GET /api/projects/{pid}/compliance/notices/{nid}
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/notices/{nid}",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("nid" = Uuid, Path, description = "Notice ID")
    ),
    responses(
        (status = 200, description = "Notice", body = Data<NoticeResponse>),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn get_notice(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path((pid, nid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Data<NoticeResponse>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    let notice = repo::notice::find_by_id(&mut conn, pid, nid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Notice {} not found", nid)))?;

    Ok(Json(Data::new(NoticeResponse::from(notice))))
}

/// PATCH /api/projects/{pid}/compliance/notices/{nid}
#[utoipa::path(
    patch,
    path = "/api/projects/{pid}/compliance/notices/{nid}",
    request_body = UpdateNoticeRequest,
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("nid" = Uuid, Path, description = "Notice ID")
    ),
    responses(
        (status = 200, description = "Notice updated", body = Data<NoticeResponse>),
        (status = 400, description = "Not editable in current status", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn update_notice(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path((pid, nid)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateNoticeRequest>,
) -> Result<Json<Data<NoticeResponse>>, AppError> {
    body.validate_request()?;

    let notice = notices::update_notice(&pool, pid, nid, body, &user.0).await?;
    Ok(Json(Data::new(NoticeResponse::from(notice))))
}

/// DELETE /api/projects/{pid}/compliance/notices/{nid}
#[utoipa::path(
    delete,
    path = "/api/projects/{pid}/compliance/notices/{nid}",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("nid" = Uuid, Path, description = "Notice ID")
    ),
    responses(
        (status = 200, description = "Notice deleted"),
        (status = 400, description = "Not deletable in current status", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn delete_notice(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path((pid, nid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Data<serde_json::Value>>, AppError> {
    notices::delete_notice(&pool, pid, nid, &user.0).await?;
    Ok(Json(Data::new(serde_json::json!({ "deleted": true }))))
}

/// POST /api/projects/{pid}/compliance/notices/{nid}/send
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/notices/{nid}/send",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("nid" = Uuid, Path, description = "Notice ID")
    ),
    responses(
        (status = 200, description = "Notice sent", body = Data<NoticeResponse>),
        (status = 400, description = "Missing recipient or bad state", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn send_notice(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path((pid, nid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Data<NoticeResponse>>, AppError> {
    let notice = notices::send_notice(&pool, pid, nid, &user.0).await?;
    Ok(Json(Data::new(NoticeResponse::from(notice))))
}

/// POST /api/projects/{pid}/compliance/notices/{nid}/confirm-delivery
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/notices/{nid}/confirm-delivery",
    request_body = ConfirmDeliveryRequest,
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("nid" = Uuid, Path, description = "Notice ID")
    ),
    responses(
        (status = 200, description = "Delivery confirmed", body = Data<NoticeResponse>),
        (status = 400, description = "Unknown method or bad state", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn confirm_delivery(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path((pid, nid)): Path<(Uuid, Uuid)>,
    Json(body): Json<ConfirmDeliveryRequest>,
) -> Result<Json<Data<NoticeResponse>>, AppError> {
    body.validate_request()?;

    let notice = notices::confirm_delivery(&pool, pid, nid, body, &user.0).await?;
    Ok(Json(Data::new(NoticeResponse::from(notice))))
}

/// POST /api/projects/{pid}/compliance/notices/{nid}/regenerate
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/notices/{nid}/regenerate",
    request_body = RegenerateNoticeRequest,
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("nid" = Uuid, Path, description = "Notice ID")
    ),
    responses(
        (status = 200, description = "Notice regenerated", body = Data<NoticeResponse>),
        (status = 400, description = "Bad state", body = AppError),
        (status = 502, description = "Language model failure", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn regenerate_notice(
    State(pool): State<Pool<Postgres>>,
    user: CurrentUser,
    Path((pid, nid)): Path<(Uuid, Uuid)>,
    Json(body): Json<RegenerateNoticeRequest>,
) -> Result<Json<Data<NoticeResponse>>, AppError> {
    let notice =
        notices::regenerate_notice(&pool, pid, nid, body.custom_instructions.as_deref(), &user.0)
            .await?;
    Ok(Json(Data::new(NoticeResponse::from(notice))))
}
