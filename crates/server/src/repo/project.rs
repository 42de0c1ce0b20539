use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::{AppError, Project};

use crate::error_convert::SqlxErrorExt;

const COLUMNS: &str = "id, name, gc_company_name, gc_contact_name, gc_contact_email, created_at";

/// Find a project by id.
pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Project>, AppError> {
    let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
    sqlx::query_as::<_, Project>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Load a project or fail with NotFound. Every project-scoped endpoint
/// verifies ownership through this.
pub async fn require(conn: &mut PgConnection, id: Uuid) -> Result<Project, AppError> {
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Project {} not found", id)))
}

/// All project ids, for scheduled jobs that sweep every project.
pub async fn all_ids(conn: &mut PgConnection) -> Result<Vec<Uuid>, AppError> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM projects ORDER BY created_at")
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// All projects, for the weekly digest.
pub async fn all(conn: &mut PgConnection) -> Result<Vec<Project>, AppError> {
    let query = format!("SELECT {COLUMNS} FROM projects ORDER BY created_at");
    sqlx::query_as::<_, Project>(&query)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}
