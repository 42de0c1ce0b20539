use chrono::NaiveDate;
use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::{AppError, ProjectHoliday};

use crate::error_convert::SqlxErrorExt;

const COLUMNS: &str = "id, project_id, date, name, description, recurring, source, created_at, updated_at";

/// List holidays for a project, earliest first.
pub async fn list(conn: &mut PgConnection, project_id: Uuid) -> Result<Vec<ProjectHoliday>, AppError> {
    let query = format!("SELECT {COLUMNS} FROM project_holidays WHERE project_id = $1 ORDER BY date");
    sqlx::query_as::<_, ProjectHoliday>(&query)
        .bind(project_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Insert a holiday. Duplicate (project, date) surfaces as Conflict.
pub async fn insert(
    conn: &mut PgConnection,
    project_id: Uuid,
    date: NaiveDate,
    name: &str,
    description: Option<&str>,
    recurring: bool,
) -> Result<ProjectHoliday, AppError> {
    let query = format!(
        r#"
        INSERT INTO project_holidays (project_id, date, name, description, recurring, source)
        VALUES ($1, $2, $3, $4, $5, 'MANUAL')
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ProjectHoliday>(&query)
        .bind(project_id)
        .bind(date)
        .bind(name)
        .bind(description)
        .bind(recurring)
        .fetch_one(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Delete a holiday. Returns true if a row was deleted.
pub async fn delete(conn: &mut PgConnection, project_id: Uuid, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM project_holidays WHERE id = $1 AND project_id = $2")
        .bind(id)
        .bind(project_id)
        .execute(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
