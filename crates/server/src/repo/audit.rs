use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::{AppError, ComplianceAuditLog, NewAuditEntry};

use crate::error_convert::SqlxErrorExt;

/// Append an audit entry. The log is append-only; nothing updates or
/// deletes rows here.
pub async fn append(conn: &mut PgConnection, entry: NewAuditEntry) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO compliance_audit_log
            (project_id, event_type, entity_type, entity_id, user_id, actor_type, action, details)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(entry.project_id)
    .bind(entry.event_type)
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(entry.user_id)
    .bind(entry.actor_type)
    .bind(entry.action)
    .bind(entry.details)
    .execute(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

/// Audit entries for one entity within a project, newest first.
pub async fn list_for_entity(
    conn: &mut PgConnection,
    project_id: Uuid,
    entity_type: &str,
    entity_id: &str,
    limit: i64,
) -> Result<Vec<ComplianceAuditLog>, AppError> {
    sqlx::query_as::<_, ComplianceAuditLog>(
        r#"
        SELECT id, project_id, event_type, entity_type, entity_id, user_id, user_email,
               actor_type, action, details, created_at
        FROM compliance_audit_log
        WHERE project_id = $1 AND entity_type = $2 AND entity_id = $3
        ORDER BY created_at DESC
        LIMIT $4
        "#,
    )
    .bind(project_id)
    .bind(entity_type)
    .bind(entity_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
