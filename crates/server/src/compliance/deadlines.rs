//! Deadline engine: creation, queries, waiver, severity recalculation.
//!
//! Every mutation commits together with exactly one audit entry. Engine
//! functions either run inside a caller-held transaction (`*_in_tx`) or open
//! their own.

use chrono::NaiveDateTime;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use shared_types::{
    AppError, ComplianceDeadline, DeadlineType, NewAuditEntry, Severity, is_valid_deadline_status,
    is_valid_severity,
};

use crate::repo;

use super::calculator::calculate_deadline;
use super::now_utc;
use super::severity::{classify_severity, severity_escalated};

/// Parameters for deadline creation.
#[derive(Debug, Clone)]
pub struct CreateDeadlineParams {
    pub project_id: Uuid,
    pub clause_id: Uuid,
    pub trigger_event_type: String,
    pub trigger_event_id: Option<String>,
    pub trigger_description: String,
    pub triggered_at: NaiveDateTime,
    pub triggered_by: Option<Uuid>,
}

/// A created deadline plus its computed (unstored) cure deadline.
#[derive(Debug, Clone)]
pub struct DeadlineCreation {
    pub deadline: ComplianceDeadline,
    pub cure_deadline: Option<NaiveDateTime>,
}

/// Create a deadline inside a caller-held transaction.
///
/// The clause must exist in the project and carry deadline parameters;
/// otherwise nothing is persisted and a domain error is returned.
pub async fn create_in_tx(
    conn: &mut PgConnection,
    params: CreateDeadlineParams,
    now: NaiveDateTime,
) -> Result<DeadlineCreation, AppError> {
    let clause = repo::clause::find_by_id(conn, params.project_id, params.clause_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Clause {} not found", params.clause_id)))?;

    let deadline_days = clause
        .deadline_days
        .ok_or_else(|| AppError::bad_request("Clause has no deadlineDays set"))?;
    if deadline_days < 0 {
        return Err(AppError::bad_request("deadlineDays must not be negative"));
    }
    let deadline_type = clause
        .deadline_type
        .as_deref()
        .and_then(|t| DeadlineType::from_str(t).ok())
        .ok_or_else(|| AppError::bad_request("Clause has no deadlineType set"))?;
    let cure_period_type = clause
        .cure_period_type
        .as_deref()
        .and_then(|t| DeadlineType::from_str(t).ok());

    let calc = calculate_deadline(
        conn,
        params.project_id,
        params.triggered_at,
        deadline_days,
        deadline_type,
        clause.cure_period_days,
        cure_period_type,
        now,
    )
    .await?;

    let deadline = repo::deadline::insert(
        conn,
        &repo::deadline::NewDeadline {
            project_id: params.project_id,
            clause_id: params.clause_id,
            trigger_event_type: params.trigger_event_type.clone(),
            trigger_event_id: params.trigger_event_id.clone(),
            trigger_description: params.trigger_description.clone(),
            triggered_at: params.triggered_at,
            triggered_by: params.triggered_by,
            calculated_deadline: calc.deadline,
            severity: calc.severity.as_str().to_string(),
        },
    )
    .await?;

    repo::audit::append(
        conn,
        NewAuditEntry::system(
            params.project_id,
            "DEADLINE_CREATED",
            "ComplianceDeadline",
            deadline.id.to_string(),
            "create_deadline",
            json!({
                "clauseId": params.clause_id.to_string(),
                "clauseTitle": clause.title,
                "triggerType": params.trigger_event_type,
                "triggerDescription": params.trigger_description,
                "calculatedDeadline": shared_types::fmt_ts(calc.deadline),
                "severity": calc.severity.as_str(),
            }),
        )
        .by_user(params.triggered_by),
    )
    .await?;

    tracing::info!(
        deadline_id = %deadline.id,
        clause_id = %params.clause_id,
        due = %shared_types::fmt_ts(calc.deadline),
        severity = %calc.severity,
        "Created compliance deadline"
    );

    Ok(DeadlineCreation {
        deadline,
        cure_deadline: calc.cure_deadline,
    })
}

/// Create a deadline in its own transaction.
pub async fn create_deadline(
    pool: &PgPool,
    params: CreateDeadlineParams,
) -> Result<DeadlineCreation, AppError> {
    let mut tx = pool.begin().await.map_err(crate::error_convert::sqlx_to_app_error)?;
    let created = create_in_tx(&mut tx, params, now_utc()).await?;
    tx.commit().await.map_err(crate::error_convert::sqlx_to_app_error)?;
    Ok(created)
}

/// List deadlines with validated filters.
pub async fn list_deadlines(
    pool: &PgPool,
    project_id: Uuid,
    status: Option<&str>,
    severity: Option<&str>,
) -> Result<Vec<ComplianceDeadline>, AppError> {
    if let Some(s) = status {
        if !is_valid_deadline_status(s) {
            return Err(AppError::bad_request(format!("Invalid status: {}", s)));
        }
    }
    if let Some(s) = severity {
        if !is_valid_severity(s) {
            return Err(AppError::bad_request(format!("Invalid severity: {}", s)));
        }
    }

    let mut conn = pool.acquire().await.map_err(crate::error_convert::sqlx_to_app_error)?;
    repo::deadline::list(&mut conn, project_id, status, severity).await
}

/// Waive a deadline with reason tracking. Waiving an already-waived
/// deadline returns the row unchanged.
pub async fn waive_deadline(
    pool: &PgPool,
    project_id: Uuid,
    deadline_id: Uuid,
    user_id: Uuid,
    reason: &str,
) -> Result<ComplianceDeadline, AppError> {
    let mut tx = pool.begin().await.map_err(crate::error_convert::sqlx_to_app_error)?;

    let existing = repo::deadline::find_by_id(&mut tx, project_id, deadline_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Deadline {} not found", deadline_id)))?;

    if existing.status == "WAIVED" {
        tx.commit().await.map_err(crate::error_convert::sqlx_to_app_error)?;
        return Ok(existing);
    }

    let now = now_utc();
    let waived = repo::deadline::waive(&mut tx, project_id, deadline_id, user_id, reason, now)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Deadline {} not found", deadline_id)))?;

    repo::audit::append(
        &mut tx,
        NewAuditEntry::system(
            project_id,
            "DEADLINE_WAIVED",
            "ComplianceDeadline",
            deadline_id.to_string(),
            "waive_deadline",
            json!({ "reason": reason, "previousStatus": existing.status }),
        )
        .by_user(Some(user_id)),
    )
    .await?;

    tx.commit().await.map_err(crate::error_convert::sqlx_to_app_error)?;
    Ok(waived)
}

/// One deadline's severity transition from a recalculation pass.
#[derive(Debug, Clone)]
pub struct SeverityChange {
    pub deadline: ComplianceDeadline,
    pub old_severity: Severity,
    pub new_severity: Severity,
    pub expired: bool,
}

/// Outcome counts of a severity recalculation pass.
#[derive(Debug, Clone, Default)]
pub struct SeverityPassOutcome {
    pub total: usize,
    pub changed: usize,
    pub escalated: usize,
    pub expired: usize,
    pub changes: Vec<SeverityChange>,
}

/// Recalculate severities for every open deadline in a project.
///
/// A fixed point: re-running with the same clock changes nothing and writes
/// no audit entries. Deadlines crossing `now` transition to EXPIRED.
pub async fn recalculate_severities(
    conn: &mut PgConnection,
    project_id: Uuid,
    now: NaiveDateTime,
) -> Result<SeverityPassOutcome, AppError> {
    let deadlines = repo::deadline::open_deadlines(conn, project_id).await?;
    let mut outcome = SeverityPassOutcome {
        total: deadlines.len(),
        ..Default::default()
    };

    for deadline in deadlines {
        let old_severity = Severity::from_str(&deadline.severity).unwrap_or(Severity::Low);
        let new_severity = classify_severity(deadline.calculated_deadline, now, Some(&deadline.status));

        if old_severity == new_severity {
            continue;
        }

        let expired = new_severity == Severity::Expired;
        let new_status = if expired { "EXPIRED" } else { deadline.status.as_str() };

        repo::deadline::apply_severity(conn, deadline.id, new_severity.as_str(), new_status, now)
            .await?;

        repo::audit::append(
            conn,
            NewAuditEntry::system(
                project_id,
                if expired { "DEADLINE_EXPIRED" } else { "DEADLINE_SEVERITY_CHANGE" },
                "ComplianceDeadline",
                deadline.id.to_string(),
                "recalculate_severity",
                json!({
                    "oldSeverity": old_severity.as_str(),
                    "newSeverity": new_severity.as_str(),
                    "status": new_status,
                }),
            ),
        )
        .await?;

        outcome.changed += 1;
        if severity_escalated(old_severity, new_severity) {
            outcome.escalated += 1;
        }
        if expired {
            outcome.expired += 1;
        }
        outcome.changes.push(SeverityChange {
            deadline,
            old_severity,
            new_severity,
            expired,
        });
    }

    if outcome.changed > 0 {
        tracing::info!(
            project_id = %project_id,
            changed = outcome.changed,
            escalated = outcome.escalated,
            expired = outcome.expired,
            "Recalculated deadline severities"
        );
    }

    Ok(outcome)
}
