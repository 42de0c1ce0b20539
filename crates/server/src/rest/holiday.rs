use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{AppError, CreateHolidayRequest, Data, HolidayResponse};

use crate::auth::CurrentUser;
use crate::error_convert::{sqlx_to_app_error, ValidateRequest};
use crate::repo;

/// GET /api/projects/{pid}/compliance/holidays
#[utoipa::path(
    get,
    path = "/api/projects/{pid}/compliance/holidays",
    params(("pid" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project holidays", body = Data<Vec<HolidayResponse>>)
    ),
    tag = "compliance"
)]
pub async fn list_holidays(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path(pid): Path<Uuid>,
) -> Result<Json<Data<Vec<HolidayResponse>>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;

    let holidays = repo::holiday::list(&mut conn, pid).await?;
    Ok(Json(Data::new(
        holidays.into_iter().map(HolidayResponse::from).collect(),
    )))
}

/// POST /api/projects/{pid}/compliance/holidays
#[utoipa::path(
    post,
    path = "/api/projects/{pid}/compliance/holidays",
    request_body = CreateHolidayRequest,
    params(("pid" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Holiday created", body = Data<HolidayResponse>),
        (status = 400, description = "Invalid date", body = AppError),
        (status = 409, description = "Duplicate date", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn create_holiday(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path(pid): Path<Uuid>,
    Json(body): Json<CreateHolidayRequest>,
) -> Result<Json<Data<HolidayResponse>>, AppError> {
    body.validate_request()?;

    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::project::require(&mut conn, pid).await?;

    let holiday = repo::holiday::insert(
        &mut conn,
        pid,
        body.date,
        &body.name,
        body.description.as_deref(),
        body.recurring,
    )
    .await?;

    Ok(Json(Data::new(HolidayResponse::from(holiday))))
}

/// DELETE /api/projects/{pid}/compliance/holidays/{hid}
#[utoipa::path(
    delete,
    path = "/api/projects/{pid}/compliance/holidays/{hid}",
    params(
        ("pid" = Uuid, Path, description = "Project ID"),
        ("hid" = Uuid, Path, description = "Holiday ID")
    ),
    responses(
        (status = 200, description = "Holiday deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "compliance"
)]
pub async fn delete_holiday(
    State(pool): State<Pool<Postgres>>,
    _user: CurrentUser,
    Path((pid, hid)): Path<(Uuid, Uuid)>,
) -> Result<Json<Data<serde_json::Value>>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    let deleted = repo::holiday::delete(&mut conn, pid, hid).await?;

    if deleted {
        Ok(Json(Data::new(serde_json::json!({ "deleted": true }))))
    } else {
        Err(AppError::not_found(format!("Holiday {} not found", hid)))
    }
}
