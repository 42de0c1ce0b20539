use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::{AppError, User, ALERT_ROLES};

use crate::error_convert::SqlxErrorExt;

const COLUMNS: &str = "id, email, name, role, created_at";

/// Find a user by id.
pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, AppError> {
    let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
    sqlx::query_as::<_, User>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Users who receive deadline alerts and weekly summaries
/// (admins, project managers, executives).
pub async fn alert_recipients(conn: &mut PgConnection) -> Result<Vec<User>, AppError> {
    let query = format!("SELECT {COLUMNS} FROM users WHERE role = ANY($1) ORDER BY email");
    sqlx::query_as::<_, User>(&query)
        .bind(ALERT_ROLES)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}
