use chrono::NaiveDateTime;
use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::{AppError, ComplianceNotice};

use crate::error_convert::SqlxErrorExt;

const COLUMNS: &str = "id, project_id, notice_type, status, title, content, recipient_name, \
    recipient_email, due_date, sent_at, delivered_at, acknowledged_at, clause_id, \
    delivery_methods, delivery_confirmation, on_time_status, generated_by_ai, ai_model, \
    created_by_id, created_at, updated_at";

/// Fields for a new draft notice.
#[derive(Debug, Clone)]
pub struct NewNotice {
    pub project_id: Uuid,
    pub notice_type: String,
    pub title: String,
    pub content: String,
    pub clause_id: Option<Uuid>,
    pub due_date: Option<NaiveDateTime>,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub generated_by_ai: bool,
    pub ai_model: Option<String>,
    pub created_by_id: Uuid,
}

/// Insert a new notice in DRAFT status. Returns the created row.
pub async fn insert(conn: &mut PgConnection, notice: &NewNotice) -> Result<ComplianceNotice, AppError> {
    let query = format!(
        r#"
        INSERT INTO compliance_notices
            (project_id, notice_type, status, title, content, clause_id, due_date,
             recipient_name, recipient_email, generated_by_ai, ai_model, created_by_id)
        VALUES ($1, $2, 'DRAFT', $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceNotice>(&query)
        .bind(notice.project_id)
        .bind(&notice.notice_type)
        .bind(&notice.title)
        .bind(&notice.content)
        .bind(notice.clause_id)
        .bind(notice.due_date)
        .bind(&notice.recipient_name)
        .bind(&notice.recipient_email)
        .bind(notice.generated_by_ai)
        .bind(&notice.ai_model)
        .bind(notice.created_by_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Find a notice within a project.
pub async fn find_by_id(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
) -> Result<Option<ComplianceNotice>, AppError> {
    let query = format!("SELECT {COLUMNS} FROM compliance_notices WHERE id = $1 AND project_id = $2");
    sqlx::query_as::<_, ComplianceNotice>(&query)
        .bind(id)
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// List notices for a project with optional filters, newest first.
pub async fn list(
    conn: &mut PgConnection,
    project_id: Uuid,
    status: Option<&str>,
    notice_type: Option<&str>,
) -> Result<Vec<ComplianceNotice>, AppError> {
    let query = format!(
        r#"
        SELECT {COLUMNS} FROM compliance_notices
        WHERE project_id = $1
          AND ($2::TEXT IS NULL OR status = $2)
          AND ($3::TEXT IS NULL OR notice_type = $3)
        ORDER BY created_at DESC
        "#
    );
    sqlx::query_as::<_, ComplianceNotice>(&query)
        .bind(project_id)
        .bind(status)
        .bind(notice_type)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Partial update of an editable notice. Returns the updated row or None.
pub async fn update_fields(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
    title: Option<&str>,
    content: Option<&str>,
    recipient_name: Option<&str>,
    recipient_email: Option<&str>,
    due_date: Option<NaiveDateTime>,
    status: Option<&str>,
    now: NaiveDateTime,
) -> Result<Option<ComplianceNotice>, AppError> {
    let query = format!(
        r#"
        UPDATE compliance_notices SET
            title           = COALESCE($3, title),
            content         = COALESCE($4, content),
            recipient_name  = COALESCE($5, recipient_name),
            recipient_email = COALESCE($6, recipient_email),
            due_date        = COALESCE($7, due_date),
            status          = COALESCE($8, status),
            updated_at      = $9
        WHERE id = $1 AND project_id = $2
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceNotice>(&query)
        .bind(id)
        .bind(project_id)
        .bind(title)
        .bind(content)
        .bind(recipient_name)
        .bind(recipient_email)
        .bind(due_date)
        .bind(status)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Transition a notice into SENT, freezing its on-time outcome.
pub async fn mark_sent(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
    sent_at: NaiveDateTime,
    delivered_at: Option<NaiveDateTime>,
    on_time: bool,
) -> Result<Option<ComplianceNotice>, AppError> {
    let query = format!(
        r#"
        UPDATE compliance_notices
        SET status = 'SENT', sent_at = $3, delivered_at = $4, on_time_status = $5,
            delivery_methods = ARRAY['EMAIL'], updated_at = $3
        WHERE id = $1 AND project_id = $2
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceNotice>(&query)
        .bind(id)
        .bind(project_id)
        .bind(sent_at)
        .bind(delivered_at)
        .bind(on_time)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Record an out-of-band delivery confirmation and transition to
/// ACKNOWLEDGED.
pub async fn confirm_delivery(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
    delivery_confirmation: serde_json::Value,
    delivery_methods: &[String],
    delivered_at: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<Option<ComplianceNotice>, AppError> {
    let query = format!(
        r#"
        UPDATE compliance_notices
        SET status = 'ACKNOWLEDGED', delivery_confirmation = $3, delivery_methods = $4,
            delivered_at = $5, acknowledged_at = $6, updated_at = $6
        WHERE id = $1 AND project_id = $2
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceNotice>(&query)
        .bind(id)
        .bind(project_id)
        .bind(delivery_confirmation)
        .bind(delivery_methods)
        .bind(delivered_at)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Replace a draft's content with regenerated text.
pub async fn replace_content(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
    content: &str,
    ai_model: &str,
    now: NaiveDateTime,
) -> Result<Option<ComplianceNotice>, AppError> {
    let query = format!(
        r#"
        UPDATE compliance_notices
        SET content = $3, generated_by_ai = TRUE, ai_model = $4, updated_at = $5
        WHERE id = $1 AND project_id = $2
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceNotice>(&query)
        .bind(id)
        .bind(project_id)
        .bind(content)
        .bind(ai_model)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Record email-webhook delivery for a SENT notice.
pub async fn record_email_delivery(
    conn: &mut PgConnection,
    id: Uuid,
    delivered_at: NaiveDateTime,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE compliance_notices SET delivered_at = $2 WHERE id = $1 AND status = 'SENT'",
    )
    .bind(id)
    .bind(delivered_at)
    .execute(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

/// Delete a draft notice. Returns true if a row was deleted.
pub async fn delete(conn: &mut PgConnection, project_id: Uuid, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM compliance_notices WHERE id = $1 AND project_id = $2")
        .bind(id)
        .bind(project_id)
        .execute(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

/// Notices that count toward the score: SENT or ACKNOWLEDGED.
pub async fn sent_notices(
    conn: &mut PgConnection,
    project_id: Uuid,
) -> Result<Vec<ComplianceNotice>, AppError> {
    let query = format!(
        r#"
        SELECT {COLUMNS} FROM compliance_notices
        WHERE project_id = $1 AND status IN ('SENT', 'ACKNOWLEDGED')
        "#
    );
    sqlx::query_as::<_, ComplianceNotice>(&query)
        .bind(project_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}
