use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{AppError, User};

use crate::config::settings;
use crate::error_convert::SqlxErrorExt;

/// Email of the auto-provisioned development user.
const DEV_USER_EMAIL: &str = "dev@noticeguard.local";

/// Extractor that resolves the authenticated user for a request.
///
/// Identity/SSO lives outside this service; requests carry an opaque user id
/// issued by the identity layer, either as `Authorization: Bearer <uuid>` or
/// an `X-User-Id` header. In development, requests without credentials
/// resolve to an auto-provisioned admin user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Extract the raw credential from request headers, if any.
    fn credential(parts: &Parts) -> Option<String> {
        if let Some(val) = parts.headers.get("authorization") {
            if let Ok(s) = val.to_str() {
                if let Some(token) = s.strip_prefix("Bearer ") {
                    return Some(token.trim().to_string());
                }
            }
        }
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Pool<Postgres>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = Pool::<Postgres>::from_ref(state);

        if let Some(raw) = Self::credential(parts) {
            let user_id = Uuid::parse_str(&raw)
                .map_err(|_| AppError::unauthorized("Invalid credentials"))?;

            let mut conn = pool.acquire().await.map_err(SqlxErrorExt::into_app_error)?;
            return match crate::repo::user::find_by_id(&mut conn, user_id).await? {
                Some(user) => Ok(CurrentUser(user)),
                None => Err(AppError::unauthorized("Unknown user")),
            };
        }

        if settings().is_development() {
            let user = dev_user(&pool).await?;
            return Ok(CurrentUser(user));
        }

        Err(AppError::unauthorized("Missing credentials"))
    }
}

/// Fetch or create the development bypass user.
async fn dev_user(pool: &Pool<Postgres>) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name, role)
        VALUES ($1, 'Dev User', 'ADMIN')
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING id, email, name, role, created_at
        "#,
    )
    .bind(DEV_USER_EMAIL)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(user)
}
