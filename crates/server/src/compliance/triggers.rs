//! Trigger adapter: maps external events (RFIs flagged as potential change
//! orders, change events) onto deadline creation.
//!
//! Fan-out is idempotent on (project, clause, trigger event id, trigger
//! event type): a non-terminal deadline for that tuple suppresses
//! re-creation. A project with no qualifying clauses yields zero deadlines,
//! which is success.

use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use shared_types::{AppError, ContractClause, DeadlineType, RfiComplianceCheck};

use crate::error_convert::sqlx_to_app_error;
use crate::repo;

use super::deadlines::{create_in_tx, CreateDeadlineParams, DeadlineCreation};
use super::now_utc;

/// Clause kinds matched when an RFI is flagged as a potential change order.
const RFI_CO_CLAUSE_KINDS: &[&str] = &["CLAIMS_PROCEDURE", "CHANGE_ORDER_PROCESS"];

/// Clause kinds matched when a change event is created.
const CHANGE_EVENT_CLAUSE_KINDS: &[&str] =
    &["CHANGE_ORDER_PROCESS", "CLAIMS_PROCEDURE", "NOTICE_REQUIREMENTS"];

/// Deadline-count phrase for a clause: "10 calendar days".
fn deadline_phrase(clause: &ContractClause) -> String {
    let unit = clause
        .deadline_type
        .as_deref()
        .and_then(|t| DeadlineType::from_str(t).ok())
        .map(|t| t.unit_label())
        .unwrap_or("days");
    format!("{} {}", clause.deadline_days.unwrap_or(0), unit)
}

/// Trigger description for an RFI flagged as a potential change order.
fn rfi_trigger_description(rfi_number: &str, rfi_subject: &str, clause: &ContractClause) -> String {
    format!(
        "RFI #{} \"{}\" flagged as potential change order. Per {}, notice is required within {}.",
        rfi_number,
        rfi_subject,
        clause.reference(),
        deadline_phrase(clause),
    )
}

/// Trigger description for a change event.
fn change_event_trigger_description(description: &str, clause: &ContractClause) -> String {
    format!(
        "Change event: {}. Per {}, notice is required within {}.",
        description,
        clause.reference(),
        deadline_phrase(clause),
    )
}

async fn fan_out(
    pool: &PgPool,
    project_id: Uuid,
    kinds: &[&str],
    trigger_event_type: &str,
    trigger_event_id: &str,
    describe: impl Fn(&ContractClause) -> String,
    user_id: Option<Uuid>,
) -> Result<Vec<DeadlineCreation>, AppError> {
    let now = now_utc();
    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    let clauses = repo::clause::trigger_candidates(&mut tx, project_id, kinds).await?;
    if clauses.is_empty() {
        tracing::info!(
            project_id = %project_id,
            trigger_event_id = trigger_event_id,
            "No matching clauses for trigger"
        );
        tx.commit().await.map_err(sqlx_to_app_error)?;
        return Ok(Vec::new());
    }

    let mut created = Vec::new();
    for clause in clauses {
        let existing = repo::deadline::find_open_for_trigger(
            &mut tx,
            project_id,
            clause.id,
            trigger_event_id,
            trigger_event_type,
        )
        .await?;
        if existing.is_some() {
            tracing::debug!(
                clause_id = %clause.id,
                trigger_event_id = trigger_event_id,
                "Deadline already exists for trigger"
            );
            continue;
        }

        let creation = create_in_tx(
            &mut tx,
            CreateDeadlineParams {
                project_id,
                clause_id: clause.id,
                trigger_event_type: trigger_event_type.to_string(),
                trigger_event_id: Some(trigger_event_id.to_string()),
                trigger_description: describe(&clause),
                triggered_at: now,
                triggered_by: user_id,
            },
            now,
        )
        .await?;
        created.push(creation);
    }

    tx.commit().await.map_err(sqlx_to_app_error)?;

    if !created.is_empty() {
        tracing::info!(
            project_id = %project_id,
            trigger_event_id = trigger_event_id,
            count = created.len(),
            "Created compliance deadlines from trigger"
        );
    }

    Ok(created)
}

/// An RFI flagged as a potential change order: create deadlines for every
/// matching claims/change-order clause.
pub async fn trigger_rfi_compliance(
    pool: &PgPool,
    project_id: Uuid,
    rfi_id: &str,
    rfi_number: &str,
    rfi_subject: &str,
    user_id: Option<Uuid>,
) -> Result<Vec<DeadlineCreation>, AppError> {
    fan_out(
        pool,
        project_id,
        RFI_CO_CLAUSE_KINDS,
        "RFI",
        rfi_id,
        |clause| rfi_trigger_description(rfi_number, rfi_subject, clause),
        user_id,
    )
    .await
}

/// A change event was created: create deadlines for every matching clause.
pub async fn trigger_change_event_compliance(
    pool: &PgPool,
    project_id: Uuid,
    change_event_id: &str,
    change_description: &str,
    user_id: Option<Uuid>,
) -> Result<Vec<DeadlineCreation>, AppError> {
    fan_out(
        pool,
        project_id,
        CHANGE_EVENT_CLAUSE_KINDS,
        "CHANGE_ORDER",
        change_event_id,
        |clause| change_event_trigger_description(change_description, clause),
        user_id,
    )
    .await
}

/// Summary of the deadlines one RFI has triggered.
pub async fn check_rfi_compliance(
    pool: &PgPool,
    project_id: Uuid,
    rfi_id: &str,
) -> Result<RfiComplianceCheck, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    let deadlines =
        repo::deadline::list_for_trigger_event(&mut conn, project_id, rfi_id, "RFI").await?;

    Ok(RfiComplianceCheck {
        rfi_id: rfi_id.to_string(),
        deadline_count: deadlines.len(),
        deadlines: deadlines.into_iter().map(Into::into).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn clause(section_ref: Option<&str>, days: i32, deadline_type: &str) -> ContractClause {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        ContractClause {
            id: Uuid::nil(),
            project_id: Uuid::nil(),
            kind: "CLAIMS_PROCEDURE".to_string(),
            title: "Claims Procedure".to_string(),
            content: "Claims shall be submitted in writing.".to_string(),
            section_ref: section_ref.map(|s| s.to_string()),
            deadline_days: Some(days),
            deadline_type: Some(deadline_type.to_string()),
            notice_method: None,
            trigger: None,
            cure_period_days: None,
            cure_period_type: None,
            flow_down_provisions: None,
            parent_clause_ref: None,
            requires_review: false,
            review_reason: None,
            confirmed: false,
            confirmed_at: None,
            confirmed_by: None,
            ai_extracted: true,
            ai_model: None,
            source_doc_id: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn rfi_description_names_number_subject_section_and_count() {
        let c = clause(Some("Article 14.2"), 10, "CALENDAR_DAYS");
        let desc = rfi_trigger_description("42", "Ductwork conflict", &c);
        assert_eq!(
            desc,
            "RFI #42 \"Ductwork conflict\" flagged as potential change order. \
             Per Article 14.2, notice is required within 10 calendar days."
        );
    }

    #[test]
    fn description_falls_back_to_clause_title() {
        let c = clause(None, 5, "BUSINESS_DAYS");
        let desc = rfi_trigger_description("7", "Added scope", &c);
        assert!(desc.contains("Per Claims Procedure"));
        assert!(desc.contains("5 business days"));
    }

    #[test]
    fn change_event_description_shape() {
        let c = clause(Some("Section 8.3"), 48, "HOURS");
        let desc = change_event_trigger_description("Owner-directed rework", &c);
        assert_eq!(
            desc,
            "Change event: Owner-directed rework. Per Section 8.3, notice is required within 48 hours."
        );
    }
}
