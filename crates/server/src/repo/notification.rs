use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::AppError;

use crate::error_convert::SqlxErrorExt;

/// Fields for a new in-app notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub notification_type: &'static str,
    pub severity: &'static str,
    pub title: String,
    pub message: String,
    pub entity_type: Option<&'static str>,
    pub entity_id: Option<String>,
}

/// Insert an in-app notification.
pub async fn insert(conn: &mut PgConnection, notification: &NewNotification) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO notifications
            (user_id, project_id, notification_type, severity, channel, title, message,
             entity_type, entity_id)
        VALUES ($1, $2, $3, $4, 'IN_APP', $5, $6, $7, $8)
        "#,
    )
    .bind(notification.user_id)
    .bind(notification.project_id)
    .bind(notification.notification_type)
    .bind(notification.severity)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.entity_type)
    .bind(&notification.entity_id)
    .execute(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}
