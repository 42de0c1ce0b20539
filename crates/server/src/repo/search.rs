//! Keyword search across compliance entities (clauses, deadlines, notices).
//!
//! Database-backed ILIKE matching, 20 rows per type. Deadlines join their
//! clause for display titles.

use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::{AppError, ComplianceSearchResult, ContractClause};

use crate::error_convert::SqlxErrorExt;

const PER_TYPE_LIMIT: i64 = 20;

/// Run a compliance search for the requested entity types.
pub async fn search(
    conn: &mut PgConnection,
    project_id: Uuid,
    query: &str,
    types: &[&str],
    status: Option<&str>,
    severity: Option<&str>,
) -> Result<Vec<ComplianceSearchResult>, AppError> {
    let term = format!("%{}%", query);
    let mut results = Vec::new();

    if types.contains(&"contract_clause") {
        results.extend(search_clauses(conn, project_id, &term).await?);
    }
    if types.contains(&"compliance_deadline") {
        results.extend(search_deadlines(conn, project_id, &term, status, severity).await?);
    }
    if types.contains(&"compliance_notice") {
        results.extend(search_notices(conn, project_id, &term, status).await?);
    }

    Ok(results)
}

async fn search_clauses(
    conn: &mut PgConnection,
    project_id: Uuid,
    term: &str,
) -> Result<Vec<ComplianceSearchResult>, AppError> {
    let clauses = sqlx::query_as::<_, ContractClause>(
        r#"
        SELECT id, project_id, kind, title, content, section_ref, deadline_days, deadline_type,
               notice_method, trigger, cure_period_days, cure_period_type, flow_down_provisions,
               parent_clause_ref, requires_review, review_reason, confirmed, confirmed_at,
               confirmed_by, ai_extracted, ai_model, source_doc_id, created_at, updated_at
        FROM contract_clauses
        WHERE project_id = $1
          AND (title ILIKE $2 OR content ILIKE $2 OR section_ref ILIKE $2 OR trigger ILIKE $2)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(project_id)
    .bind(term)
    .bind(PER_TYPE_LIMIT)
    .fetch_all(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(clauses.into_iter().map(clause_result).collect())
}

fn clause_result(c: ContractClause) -> ComplianceSearchResult {
    let kind_display = c.kind.replace('_', " ");
    let dl_display = match (c.deadline_days, c.deadline_type.as_deref()) {
        (Some(days), Some(t)) => format!("{} {}", days, t.replace('_', " ").to_lowercase()),
        _ => "N/A".to_string(),
    };
    let method_display = c
        .notice_method
        .as_deref()
        .map(|m| m.replace('_', " ").to_lowercase())
        .unwrap_or_else(|| "N/A".to_string());

    let status = if c.confirmed {
        "Confirmed"
    } else if c.requires_review {
        "Needs Review"
    } else {
        "Pending"
    };

    ComplianceSearchResult {
        id: c.id.to_string(),
        entity_type: "contract_clause".to_string(),
        title: format!("{} {}", c.section_ref.as_deref().unwrap_or(""), c.title)
            .trim()
            .to_string(),
        description: format!("{} · {} · {}", kind_display, dl_display, method_display),
        status: status.to_string(),
        severity: None,
        metadata: serde_json::json!({
            "kind": c.kind,
            "deadlineDays": c.deadline_days,
            "deadlineType": c.deadline_type,
            "noticeMethod": c.notice_method,
            "aiExtracted": c.ai_extracted,
        }),
        created_at: Some(shared_types::fmt_ts(c.created_at)),
    }
}

#[derive(sqlx::FromRow)]
struct DeadlineHit {
    id: Uuid,
    clause_id: Uuid,
    trigger_description: String,
    trigger_event_type: String,
    trigger_event_id: Option<String>,
    calculated_deadline: chrono::NaiveDateTime,
    status: String,
    severity: String,
    created_at: chrono::NaiveDateTime,
    clause_title: Option<String>,
    clause_ref: Option<String>,
}

async fn search_deadlines(
    conn: &mut PgConnection,
    project_id: Uuid,
    term: &str,
    status: Option<&str>,
    severity: Option<&str>,
) -> Result<Vec<ComplianceSearchResult>, AppError> {
    let hits = sqlx::query_as::<_, DeadlineHit>(
        r#"
        SELECT d.id, d.clause_id, d.trigger_description, d.trigger_event_type,
               d.trigger_event_id, d.calculated_deadline, d.status, d.severity, d.created_at,
               c.title AS clause_title, c.section_ref AS clause_ref
        FROM compliance_deadlines d
        LEFT JOIN contract_clauses c ON c.id = d.clause_id
        WHERE d.project_id = $1
          AND d.trigger_description ILIKE $2
          AND ($3::TEXT IS NULL OR d.status = $3)
          AND ($4::TEXT IS NULL OR d.severity = $4)
        ORDER BY d.calculated_deadline ASC
        LIMIT $5
        "#,
    )
    .bind(project_id)
    .bind(term)
    .bind(status)
    .bind(severity)
    .bind(PER_TYPE_LIMIT)
    .fetch_all(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(hits
        .into_iter()
        .map(|h| ComplianceSearchResult {
            id: h.id.to_string(),
            entity_type: "compliance_deadline".to_string(),
            title: format!(
                "Deadline: {} ({})",
                h.clause_title.as_deref().unwrap_or("Unknown"),
                h.clause_ref.as_deref().unwrap_or("N/A"),
            ),
            description: h.trigger_description,
            status: h.status,
            severity: Some(h.severity),
            metadata: serde_json::json!({
                "clauseId": h.clause_id.to_string(),
                "calculatedDeadline": shared_types::fmt_ts(h.calculated_deadline),
                "triggerEventType": h.trigger_event_type,
                "triggerEventId": h.trigger_event_id,
            }),
            created_at: Some(shared_types::fmt_ts(h.created_at)),
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct NoticeHit {
    id: Uuid,
    notice_type: String,
    status: String,
    title: String,
    sent_at: Option<chrono::NaiveDateTime>,
    on_time_status: Option<bool>,
    generated_by_ai: bool,
    created_at: chrono::NaiveDateTime,
}

async fn search_notices(
    conn: &mut PgConnection,
    project_id: Uuid,
    term: &str,
    status: Option<&str>,
) -> Result<Vec<ComplianceSearchResult>, AppError> {
    let hits = sqlx::query_as::<_, NoticeHit>(
        r#"
        SELECT id, notice_type, status, title, sent_at, on_time_status, generated_by_ai, created_at
        FROM compliance_notices
        WHERE project_id = $1
          AND (title ILIKE $2 OR content ILIKE $2)
          AND ($3::TEXT IS NULL OR status = $3)
        ORDER BY created_at DESC
        LIMIT $4
        "#,
    )
    .bind(project_id)
    .bind(term)
    .bind(status)
    .bind(PER_TYPE_LIMIT)
    .fetch_all(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(hits
        .into_iter()
        .map(|h| {
            let sent_str = h
                .sent_at
                .map(|s| format!("Sent {}", s.format("%Y-%m-%d")))
                .unwrap_or_else(|| "Not sent".to_string());
            ComplianceSearchResult {
                id: h.id.to_string(),
                entity_type: "compliance_notice".to_string(),
                title: h.title,
                description: format!(
                    "{} · {} · {}",
                    h.notice_type.replace('_', " "),
                    h.status,
                    sent_str
                ),
                status: h.status.clone(),
                severity: None,
                metadata: serde_json::json!({
                    "noticeType": h.notice_type,
                    "sentAt": h.sent_at.map(shared_types::fmt_ts),
                    "onTimeStatus": h.on_time_status,
                    "generatedByAI": h.generated_by_ai,
                }),
                created_at: Some(shared_types::fmt_ts(h.created_at)),
            }
        })
        .collect())
}
