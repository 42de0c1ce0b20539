use chrono::NaiveDateTime;
use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::{AppError, ComplianceDeadline, DEADLINE_OPEN_STATUSES};

use crate::error_convert::SqlxErrorExt;

const COLUMNS: &str = "id, project_id, clause_id, trigger_event_type, trigger_event_id, \
    trigger_description, triggered_at, triggered_by, calculated_deadline, deadline_timezone, \
    status, severity, notice_id, notice_created_at, waived_at, waived_by, waiver_reason, \
    created_at, updated_at";

/// Fields for a new deadline row.
#[derive(Debug, Clone)]
pub struct NewDeadline {
    pub project_id: Uuid,
    pub clause_id: Uuid,
    pub trigger_event_type: String,
    pub trigger_event_id: Option<String>,
    pub trigger_description: String,
    pub triggered_at: NaiveDateTime,
    pub triggered_by: Option<Uuid>,
    pub calculated_deadline: NaiveDateTime,
    pub severity: String,
}

/// Insert a new deadline in ACTIVE status. Returns the created row.
pub async fn insert(conn: &mut PgConnection, deadline: &NewDeadline) -> Result<ComplianceDeadline, AppError> {
    let query = format!(
        r#"
        INSERT INTO compliance_deadlines
            (project_id, clause_id, trigger_event_type, trigger_event_id, trigger_description,
             triggered_at, triggered_by, calculated_deadline, status, severity)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'ACTIVE', $9)
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(deadline.project_id)
        .bind(deadline.clause_id)
        .bind(&deadline.trigger_event_type)
        .bind(&deadline.trigger_event_id)
        .bind(&deadline.trigger_description)
        .bind(deadline.triggered_at)
        .bind(deadline.triggered_by)
        .bind(deadline.calculated_deadline)
        .bind(&deadline.severity)
        .fetch_one(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Find a deadline within a project.
pub async fn find_by_id(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
) -> Result<Option<ComplianceDeadline>, AppError> {
    let query = format!("SELECT {COLUMNS} FROM compliance_deadlines WHERE id = $1 AND project_id = $2");
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(id)
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Find the deadline linked to a notice, if any.
pub async fn find_by_notice(
    conn: &mut PgConnection,
    project_id: Uuid,
    notice_id: Uuid,
) -> Result<Option<ComplianceDeadline>, AppError> {
    let query = format!("SELECT {COLUMNS} FROM compliance_deadlines WHERE notice_id = $1 AND project_id = $2");
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(notice_id)
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// List deadlines for a project with optional filters, soonest first.
pub async fn list(
    conn: &mut PgConnection,
    project_id: Uuid,
    status: Option<&str>,
    severity: Option<&str>,
) -> Result<Vec<ComplianceDeadline>, AppError> {
    let query = format!(
        r#"
        SELECT {COLUMNS} FROM compliance_deadlines
        WHERE project_id = $1
          AND ($2::TEXT IS NULL OR status = $2)
          AND ($3::TEXT IS NULL OR severity = $3)
        ORDER BY calculated_deadline ASC
        "#
    );
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(project_id)
        .bind(status)
        .bind(severity)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Deadlines created by one trigger event, regardless of status.
pub async fn list_for_trigger_event(
    conn: &mut PgConnection,
    project_id: Uuid,
    trigger_event_id: &str,
    trigger_event_type: &str,
) -> Result<Vec<ComplianceDeadline>, AppError> {
    let query = format!(
        r#"
        SELECT {COLUMNS} FROM compliance_deadlines
        WHERE project_id = $1 AND trigger_event_id = $2 AND trigger_event_type = $3
        ORDER BY created_at
        "#
    );
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(project_id)
        .bind(trigger_event_id)
        .bind(trigger_event_type)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Idempotency probe: an existing non-terminal deadline for the same
/// (clause, trigger event) tuple suppresses re-creation.
pub async fn find_open_for_trigger(
    conn: &mut PgConnection,
    project_id: Uuid,
    clause_id: Uuid,
    trigger_event_id: &str,
    trigger_event_type: &str,
) -> Result<Option<ComplianceDeadline>, AppError> {
    let query = format!(
        r#"
        SELECT {COLUMNS} FROM compliance_deadlines
        WHERE project_id = $1 AND clause_id = $2
          AND trigger_event_id = $3 AND trigger_event_type = $4
          AND status NOT IN ('EXPIRED', 'WAIVED')
        LIMIT 1
        "#
    );
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(project_id)
        .bind(clause_id)
        .bind(trigger_event_id)
        .bind(trigger_event_type)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Deadlines the hourly severity pass operates on (ACTIVE, NOTICE_DRAFTED).
pub async fn open_deadlines(
    conn: &mut PgConnection,
    project_id: Uuid,
) -> Result<Vec<ComplianceDeadline>, AppError> {
    let query = format!(
        "SELECT {COLUMNS} FROM compliance_deadlines WHERE project_id = $1 AND status = ANY($2)"
    );
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(project_id)
        .bind(DEADLINE_OPEN_STATUSES)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Distinct project ids with open deadlines, for the severity pass.
pub async fn projects_with_open_deadlines(conn: &mut PgConnection) -> Result<Vec<Uuid>, AppError> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT DISTINCT project_id FROM compliance_deadlines WHERE status = ANY($1)",
    )
    .bind(DEADLINE_OPEN_STATUSES)
    .fetch_all(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Active deadlines due within `cutoff`, soonest first, for the weekly digest.
pub async fn upcoming_within(
    conn: &mut PgConnection,
    project_id: Uuid,
    cutoff: NaiveDateTime,
    limit: i64,
) -> Result<Vec<ComplianceDeadline>, AppError> {
    let query = format!(
        r#"
        SELECT {COLUMNS} FROM compliance_deadlines
        WHERE project_id = $1 AND status = 'ACTIVE' AND calculated_deadline <= $2
        ORDER BY calculated_deadline ASC
        LIMIT $3
        "#
    );
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(project_id)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Set a deadline's status. Returns the updated row or None.
pub async fn update_status(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
    status: &str,
    now: NaiveDateTime,
) -> Result<Option<ComplianceDeadline>, AppError> {
    let query = format!(
        r#"
        UPDATE compliance_deadlines SET status = $3, updated_at = $4
        WHERE id = $1 AND project_id = $2
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(id)
        .bind(project_id)
        .bind(status)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Link a freshly drafted notice: status NOTICE_DRAFTED plus the notice
/// reference, atomically.
pub async fn link_notice(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
    notice_id: Uuid,
    now: NaiveDateTime,
) -> Result<Option<ComplianceDeadline>, AppError> {
    let query = format!(
        r#"
        UPDATE compliance_deadlines
        SET status = 'NOTICE_DRAFTED', notice_id = $3, notice_created_at = $4, updated_at = $4
        WHERE id = $1 AND project_id = $2
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(id)
        .bind(project_id)
        .bind(notice_id)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Unlink a deleted draft notice, returning the deadline to ACTIVE.
pub async fn unlink_notice(
    conn: &mut PgConnection,
    project_id: Uuid,
    notice_id: Uuid,
    now: NaiveDateTime,
) -> Result<Option<ComplianceDeadline>, AppError> {
    let query = format!(
        r#"
        UPDATE compliance_deadlines
        SET status = 'ACTIVE', notice_id = NULL, notice_created_at = NULL, updated_at = $3
        WHERE notice_id = $1 AND project_id = $2
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(notice_id)
        .bind(project_id)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Waive a deadline: terminal status, severity forced LOW, waiver fields
/// recorded.
pub async fn waive(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
    user_id: Uuid,
    reason: &str,
    now: NaiveDateTime,
) -> Result<Option<ComplianceDeadline>, AppError> {
    let query = format!(
        r#"
        UPDATE compliance_deadlines
        SET status = 'WAIVED', severity = 'LOW', waived_at = $3, waived_by = $4,
            waiver_reason = $5, updated_at = $3
        WHERE id = $1 AND project_id = $2
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceDeadline>(&query)
        .bind(id)
        .bind(project_id)
        .bind(now)
        .bind(user_id)
        .bind(reason)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Apply a severity (and possibly EXPIRED status) computed by the
/// classifier.
pub async fn apply_severity(
    conn: &mut PgConnection,
    id: Uuid,
    severity: &str,
    status: &str,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE compliance_deadlines SET severity = $2, status = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(id)
    .bind(severity)
    .bind(status)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}
