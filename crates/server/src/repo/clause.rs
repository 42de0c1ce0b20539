use chrono::NaiveDateTime;
use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::{AppError, ContractClause};

use crate::error_convert::SqlxErrorExt;

const COLUMNS: &str = "id, project_id, kind, title, content, section_ref, deadline_days, \
    deadline_type, notice_method, trigger, cure_period_days, cure_period_type, \
    flow_down_provisions, parent_clause_ref, requires_review, review_reason, confirmed, \
    confirmed_at, confirmed_by, ai_extracted, ai_model, source_doc_id, created_at, updated_at";

/// Fields for a newly extracted or manually entered clause.
#[derive(Debug, Clone)]
pub struct NewClause {
    pub project_id: Uuid,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub section_ref: Option<String>,
    pub deadline_days: Option<i32>,
    pub deadline_type: Option<String>,
    pub notice_method: Option<String>,
    pub trigger: Option<String>,
    pub cure_period_days: Option<i32>,
    pub cure_period_type: Option<String>,
    pub flow_down_provisions: Option<String>,
    pub parent_clause_ref: Option<String>,
    pub requires_review: bool,
    pub review_reason: Option<String>,
    pub ai_extracted: bool,
    pub ai_model: Option<String>,
    pub source_doc_id: Option<Uuid>,
}

/// Insert a new clause. Returns the created row.
pub async fn insert(conn: &mut PgConnection, clause: &NewClause) -> Result<ContractClause, AppError> {
    let query = format!(
        r#"
        INSERT INTO contract_clauses
            (project_id, kind, title, content, section_ref, deadline_days, deadline_type,
             notice_method, trigger, cure_period_days, cure_period_type, flow_down_provisions,
             parent_clause_ref, requires_review, review_reason, ai_extracted, ai_model, source_doc_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ContractClause>(&query)
        .bind(clause.project_id)
        .bind(&clause.kind)
        .bind(&clause.title)
        .bind(&clause.content)
        .bind(&clause.section_ref)
        .bind(clause.deadline_days)
        .bind(&clause.deadline_type)
        .bind(&clause.notice_method)
        .bind(&clause.trigger)
        .bind(clause.cure_period_days)
        .bind(&clause.cure_period_type)
        .bind(&clause.flow_down_provisions)
        .bind(&clause.parent_clause_ref)
        .bind(clause.requires_review)
        .bind(&clause.review_reason)
        .bind(clause.ai_extracted)
        .bind(&clause.ai_model)
        .bind(clause.source_doc_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Find a clause within a project.
pub async fn find_by_id(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
) -> Result<Option<ContractClause>, AppError> {
    let query = format!("SELECT {COLUMNS} FROM contract_clauses WHERE id = $1 AND project_id = $2");
    sqlx::query_as::<_, ContractClause>(&query)
        .bind(id)
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// List clauses for a project with optional filters, newest first.
pub async fn list(
    conn: &mut PgConnection,
    project_id: Uuid,
    kind: Option<&str>,
    confirmed: Option<bool>,
) -> Result<Vec<ContractClause>, AppError> {
    let query = format!(
        r#"
        SELECT {COLUMNS} FROM contract_clauses
        WHERE project_id = $1
          AND ($2::TEXT IS NULL OR kind = $2)
          AND ($3::BOOLEAN IS NULL OR confirmed = $3)
        ORDER BY created_at DESC
        "#
    );
    sqlx::query_as::<_, ContractClause>(&query)
        .bind(project_id)
        .bind(kind)
        .bind(confirmed)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Delete prior AI-extracted clauses for a document so re-extraction
/// replaces rather than duplicates. Manually confirmed clauses from other
/// documents are untouched by the source filter.
pub async fn delete_ai_extracted(
    conn: &mut PgConnection,
    project_id: Uuid,
    source_doc_id: Uuid,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        "DELETE FROM contract_clauses WHERE project_id = $1 AND source_doc_id = $2 AND ai_extracted = TRUE",
    )
    .bind(project_id)
    .bind(source_doc_id)
    .execute(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected())
}

/// Confirm a clause: one-way latch that also clears the review flag.
pub async fn confirm(
    conn: &mut PgConnection,
    project_id: Uuid,
    id: Uuid,
    user_id: Uuid,
    now: NaiveDateTime,
) -> Result<Option<ContractClause>, AppError> {
    let query = format!(
        r#"
        UPDATE contract_clauses SET
            confirmed = TRUE,
            confirmed_at = $3,
            confirmed_by = $4,
            requires_review = FALSE,
            updated_at = $3
        WHERE id = $1 AND project_id = $2
        RETURNING {COLUMNS}
        "#
    );
    sqlx::query_as::<_, ContractClause>(&query)
        .bind(id)
        .bind(project_id)
        .bind(now)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Clauses of the given kinds that carry deadline parameters — the
/// candidates the trigger adapter fans out over.
pub async fn trigger_candidates(
    conn: &mut PgConnection,
    project_id: Uuid,
    kinds: &[&str],
) -> Result<Vec<ContractClause>, AppError> {
    let query = format!(
        r#"
        SELECT {COLUMNS} FROM contract_clauses
        WHERE project_id = $1 AND kind = ANY($2) AND deadline_days IS NOT NULL
        ORDER BY created_at
        "#
    );
    sqlx::query_as::<_, ContractClause>(&query)
        .bind(project_id)
        .bind(kinds)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}
