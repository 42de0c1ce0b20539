//! Notice engine: draft, edit, send, confirm delivery, regenerate, delete.
//!
//! Language-model and email-transport calls happen outside any database
//! transaction; the resulting state change and its audit entry commit
//! together afterwards.

use chrono::NaiveDateTime;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use shared_types::{
    canonical_delivery_method, is_notice_editable, is_valid_notice_status, is_valid_notice_type,
    AppError, ComplianceNotice, ConfirmDeliveryRequest, ContractClause, CreateNoticeRequest,
    NewAuditEntry, Project, UpdateNoticeRequest, User,
};

use crate::error_convert::sqlx_to_app_error;
use crate::{ai, email, repo};

use super::now_utc;
use super::prompts::{notice_generation_user, NoticePromptInputs, NOTICE_GENERATION_SYSTEM};

/// Model tier and budget for notice drafting.
const DRAFT_MODEL_TIER: &str = "sonnet";
const DRAFT_MAX_TOKENS: u32 = 4000;
const DRAFT_TEMPERATURE: f32 = 0.2;
const DRAFT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Email transport retries: the transport itself never retries, the engine
/// does, with backoff and jitter.
const SEND_ATTEMPTS: u32 = 3;

fn editable_guard(notice: &ComplianceNotice, verb: &str) -> Result<(), AppError> {
    if !is_notice_editable(&notice.status) {
        return Err(AppError::bad_state(format!(
            "Cannot {} notice in {} status",
            verb, notice.status
        )));
    }
    Ok(())
}

/// On-time outcome, frozen at the moment a notice transitions into SENT.
fn on_time(sent_at: NaiveDateTime, due_date: Option<NaiveDateTime>) -> bool {
    match due_date {
        None => true,
        Some(due) => sent_at <= due,
    }
}

/// A generated draft body.
#[derive(Debug, Clone)]
pub struct GeneratedDraft {
    pub content: String,
    pub model: String,
}

/// Run the draft computation for a clause + trigger facts. Pure prompt
/// assembly plus one model call; no database writes.
async fn generate_draft(
    notice_type: &str,
    clause: &ContractClause,
    project: &Project,
    author: Option<&User>,
    trigger_description: &str,
    trigger_date: NaiveDateTime,
    deadline_date: NaiveDateTime,
    additional_context: Option<&str>,
) -> Result<GeneratedDraft, AppError> {
    let inputs = NoticePromptInputs {
        notice_type,
        project_name: &project.name,
        clause_title: &clause.title,
        clause_section_ref: clause.section_ref.as_deref(),
        clause_content: &clause.content,
        trigger_description,
        trigger_date,
        deadline_date,
        notice_method: clause.notice_method.as_deref(),
        from_name: author.map(|u| u.name.as_str()).unwrap_or("Project Manager"),
        from_company: &project.name,
        to_name: project.gc_contact_name.as_deref().unwrap_or("General Contractor"),
        to_company: project.gc_company_name.as_deref().unwrap_or(""),
        to_email: project.gc_contact_email.as_deref().unwrap_or(""),
        additional_context,
    };

    let response = ai::generate_response(
        NOTICE_GENERATION_SYSTEM,
        &notice_generation_user(&inputs),
        DRAFT_MODEL_TIER,
        DRAFT_MAX_TOKENS,
        DRAFT_TEMPERATURE,
        DRAFT_TIMEOUT,
    )
    .await?;

    Ok(GeneratedDraft {
        content: response.content,
        model: response.model,
    })
}

/// Create a notice (draft), optionally generating the body with the
/// language model, and link the deadline if one is given.
pub async fn create_notice(
    pool: &PgPool,
    project_id: Uuid,
    req: CreateNoticeRequest,
    user: &User,
) -> Result<ComplianceNotice, AppError> {
    if !is_valid_notice_type(&req.notice_type) {
        return Err(AppError::bad_request(format!("Invalid notice type: {}", req.notice_type)));
    }

    // Resolve context reads before any transaction; the model call must not
    // run inside one.
    let (content, generated_by_ai, ai_model) = if req.generate_with_ai {
        let clause_id = req
            .clause_id
            .ok_or_else(|| AppError::bad_request("clauseId is required to generate with AI"))?;

        let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
        let clause = repo::clause::find_by_id(&mut conn, project_id, clause_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Clause {} not found", clause_id)))?;
        let project = repo::project::require(&mut conn, project_id).await?;

        let linked_deadline = match req.deadline_id {
            Some(deadline_id) => repo::deadline::find_by_id(&mut conn, project_id, deadline_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Deadline {} not found", deadline_id)))
                .map(Some)?,
            None => None,
        };
        drop(conn);

        let now = now_utc();
        let trigger_description = linked_deadline
            .as_ref()
            .map(|d| d.trigger_description.clone())
            .or_else(|| req.trigger_description.clone())
            .unwrap_or_else(|| "Manual notice".to_string());
        let trigger_date = linked_deadline
            .as_ref()
            .map(|d| d.triggered_at)
            .or(req.trigger_date.map(|d| d.naive_utc()))
            .unwrap_or(now);
        let deadline_date = linked_deadline
            .as_ref()
            .map(|d| d.calculated_deadline)
            .or(req.deadline_date.map(|d| d.naive_utc()))
            .or(req.due_date.map(|d| d.naive_utc()))
            .unwrap_or(now);

        let draft = generate_draft(
            &req.notice_type,
            &clause,
            &project,
            Some(user),
            &trigger_description,
            trigger_date,
            deadline_date,
            req.additional_context.as_deref(),
        )
        .await?;

        (draft.content, true, Some(draft.model))
    } else {
        let content = req
            .content
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::bad_request("content is required unless generateWithAI is set"))?;
        (content, false, None)
    };

    let now = now_utc();
    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    // Notices may carry their own due date; default to the linked
    // deadline's calculated date.
    let due_date = match (req.due_date, req.deadline_id) {
        (Some(due), _) => Some(due.naive_utc()),
        (None, Some(deadline_id)) => repo::deadline::find_by_id(&mut tx, project_id, deadline_id)
            .await?
            .map(|d| d.calculated_deadline),
        (None, None) => None,
    };

    let notice = repo::notice::insert(
        &mut tx,
        &repo::notice::NewNotice {
            project_id,
            notice_type: req.notice_type.clone(),
            title: req.title.clone(),
            content,
            clause_id: req.clause_id,
            due_date,
            recipient_name: req.recipient_name.clone(),
            recipient_email: req.recipient_email.clone(),
            generated_by_ai,
            ai_model,
            created_by_id: user.id,
        },
    )
    .await?;

    if let Some(deadline_id) = req.deadline_id {
        let linked = repo::deadline::link_notice(&mut tx, project_id, deadline_id, notice.id, now)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Deadline {} not found", deadline_id)))?;

        repo::audit::append(
            &mut tx,
            NewAuditEntry::system(
                project_id,
                "DEADLINE_STATUS_CHANGE",
                "ComplianceDeadline",
                deadline_id.to_string(),
                "link_notice",
                json!({
                    "oldStatus": "ACTIVE",
                    "newStatus": linked.status,
                    "noticeId": notice.id.to_string(),
                }),
            )
            .by_user(Some(user.id)),
        )
        .await?;
    }

    repo::audit::append(
        &mut tx,
        NewAuditEntry::system(
            project_id,
            "NOTICE_CREATED",
            "ComplianceNotice",
            notice.id.to_string(),
            "create_notice",
            json!({
                "type": req.notice_type,
                "title": req.title,
                "deadlineId": req.deadline_id.map(|d| d.to_string()),
                "generatedByAI": generated_by_ai,
            }),
        )
        .by_user(Some(user.id)),
    )
    .await?;

    tx.commit().await.map_err(sqlx_to_app_error)?;
    Ok(notice)
}

/// Update an editable notice's fields.
pub async fn update_notice(
    pool: &PgPool,
    project_id: Uuid,
    notice_id: Uuid,
    req: UpdateNoticeRequest,
    user: &User,
) -> Result<ComplianceNotice, AppError> {
    if let Some(status) = req.status.as_deref() {
        if !is_valid_notice_status(status) {
            return Err(AppError::bad_request(format!("Invalid status: {}", status)));
        }
        if !is_notice_editable(status) {
            return Err(AppError::bad_request(
                "Status may only move between DRAFT and PENDING_REVIEW here",
            ));
        }
    }

    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    let existing = repo::notice::find_by_id(&mut tx, project_id, notice_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Notice {} not found", notice_id)))?;
    editable_guard(&existing, "edit")?;

    let now = now_utc();
    let updated = repo::notice::update_fields(
        &mut tx,
        project_id,
        notice_id,
        req.title.as_deref(),
        req.content.as_deref(),
        req.recipient_name.as_deref(),
        req.recipient_email.as_deref(),
        req.due_date.map(|d| d.naive_utc()),
        req.status.as_deref(),
        now,
    )
    .await?
    .ok_or_else(|| AppError::not_found(format!("Notice {} not found", notice_id)))?;

    repo::audit::append(
        &mut tx,
        NewAuditEntry::system(
            project_id,
            "NOTICE_UPDATED",
            "ComplianceNotice",
            notice_id.to_string(),
            "update_notice",
            json!({
                "fields": {
                    "title": req.title.is_some(),
                    "content": req.content.is_some(),
                    "recipientName": req.recipient_name.is_some(),
                    "recipientEmail": req.recipient_email.is_some(),
                    "dueDate": req.due_date.is_some(),
                    "status": req.status,
                },
            }),
        )
        .by_user(Some(user.id)),
    )
    .await?;

    tx.commit().await.map_err(sqlx_to_app_error)?;
    Ok(updated)
}

/// Send a notice via the email transport.
///
/// The transport result never blocks the state transition: the notice moves
/// to SENT with `deliveredAt` set only on transport success, and the audit
/// entry records the outcome either way.
pub async fn send_notice(
    pool: &PgPool,
    project_id: Uuid,
    notice_id: Uuid,
    user: &User,
) -> Result<ComplianceNotice, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    let notice = repo::notice::find_by_id(&mut conn, project_id, notice_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Notice {} not found", notice_id)))?;
    editable_guard(&notice, "send")?;

    let recipient_email = notice
        .recipient_email
        .clone()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Notice has no recipient email"))?;

    let project = repo::project::require(&mut conn, project_id).await?;
    drop(conn);

    // Transport outside any transaction, with engine-level retries.
    let mut sent = false;
    for attempt in 0..SEND_ATTEMPTS {
        if attempt > 0 {
            let jitter: u64 = rand::Rng::gen_range(&mut rand::thread_rng(), 0..250);
            let backoff = std::time::Duration::from_millis(500 * 2u64.pow(attempt - 1) + jitter);
            tokio::time::sleep(backoff).await;
        }
        sent = email::send_notice_email(
            &recipient_email,
            notice.recipient_name.as_deref(),
            Some(&user.email),
            Some(&user.email),
            &notice.title,
            &notice.content,
            &project.name,
            &notice_id.to_string(),
        )
        .await;
        if sent {
            break;
        }
    }

    let now = now_utc();
    let on_time_status = on_time(now, notice.due_date);

    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    // Re-check under the transaction; a concurrent sender loses here.
    let current = repo::notice::find_by_id(&mut tx, project_id, notice_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Notice {} not found", notice_id)))?;
    editable_guard(&current, "send")?;

    let updated = repo::notice::mark_sent(
        &mut tx,
        project_id,
        notice_id,
        now,
        if sent { Some(now) } else { None },
        on_time_status,
    )
    .await?
    .ok_or_else(|| AppError::not_found(format!("Notice {} not found", notice_id)))?;

    if let Some(deadline) = repo::deadline::find_by_notice(&mut tx, project_id, notice_id).await? {
        repo::deadline::update_status(&mut tx, project_id, deadline.id, "NOTICE_SENT", now).await?;
        repo::audit::append(
            &mut tx,
            NewAuditEntry::system(
                project_id,
                "DEADLINE_STATUS_CHANGE",
                "ComplianceDeadline",
                deadline.id.to_string(),
                "notice_sent",
                json!({
                    "oldStatus": deadline.status,
                    "newStatus": "NOTICE_SENT",
                    "noticeId": notice_id.to_string(),
                }),
            )
            .by_user(Some(user.id)),
        )
        .await?;
    }

    repo::audit::append(
        &mut tx,
        NewAuditEntry::system(
            project_id,
            "NOTICE_SENT",
            "ComplianceNotice",
            notice_id.to_string(),
            "send_notice",
            json!({
                "recipientEmail": recipient_email,
                "emailSent": sent,
                "onTime": on_time_status,
            }),
        )
        .by_user(Some(user.id)),
    )
    .await?;

    tx.commit().await.map_err(sqlx_to_app_error)?;
    Ok(updated)
}

/// Record an out-of-band delivery confirmation. Allowed only from SENT.
pub async fn confirm_delivery(
    pool: &PgPool,
    project_id: Uuid,
    notice_id: Uuid,
    req: ConfirmDeliveryRequest,
    user: &User,
) -> Result<ComplianceNotice, AppError> {
    let method_key = canonical_delivery_method(&req.method)
        .ok_or_else(|| AppError::bad_request(format!("Unknown delivery method: {}", req.method)))?;

    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    let notice = repo::notice::find_by_id(&mut tx, project_id, notice_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Notice {} not found", notice_id)))?;

    if notice.status != "SENT" {
        return Err(AppError::bad_state(format!(
            "Cannot confirm delivery for notice in {} status",
            notice.status
        )));
    }

    let now = now_utc();
    let delivered_at = req.delivered_at.map(|d| d.naive_utc()).unwrap_or(now);

    let mut entry = json!({
        "status": "delivered",
        "deliveredAt": shared_types::fmt_ts(delivered_at),
    });
    let entry_map = entry.as_object_mut().expect("entry is an object");
    if let Some(tracking) = &req.tracking_number {
        entry_map.insert("trackingNumber".into(), json!(tracking));
    }
    if let Some(carrier) = &req.carrier {
        entry_map.insert("carrier".into(), json!(carrier));
    }
    if let Some(signed_by) = &req.signed_by {
        entry_map.insert("signedBy".into(), json!(signed_by));
    }
    if let Some(received_by) = &req.received_by {
        entry_map.insert("receivedBy".into(), json!(received_by));
    }

    let mut confirmation = notice
        .delivery_confirmation
        .clone()
        .unwrap_or_else(|| json!({}));
    confirmation
        .as_object_mut()
        .ok_or_else(|| AppError::internal("deliveryConfirmation is not an object"))?
        .insert(method_key.to_string(), entry);

    let mut methods = notice.delivery_methods.clone();
    if !methods.iter().any(|m| m == method_key) {
        methods.push(method_key.to_string());
    }

    let updated = repo::notice::confirm_delivery(
        &mut tx,
        project_id,
        notice_id,
        confirmation,
        &methods,
        delivered_at,
        now,
    )
    .await?
    .ok_or_else(|| AppError::not_found(format!("Notice {} not found", notice_id)))?;

    repo::audit::append(
        &mut tx,
        NewAuditEntry::system(
            project_id,
            "DELIVERY_CONFIRMED",
            "ComplianceNotice",
            notice_id.to_string(),
            "confirm_delivery",
            json!({
                "method": method_key,
                "trackingNumber": req.tracking_number,
            }),
        )
        .by_user(Some(user.id)),
    )
    .await?;

    tx.commit().await.map_err(sqlx_to_app_error)?;
    Ok(updated)
}

/// Regenerate a draft's body against its linked clause and deadline.
pub async fn regenerate_notice(
    pool: &PgPool,
    project_id: Uuid,
    notice_id: Uuid,
    custom_instructions: Option<&str>,
    user: &User,
) -> Result<ComplianceNotice, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;

    let notice = repo::notice::find_by_id(&mut conn, project_id, notice_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Notice {} not found", notice_id)))?;
    editable_guard(&notice, "regenerate")?;

    let clause_id = notice
        .clause_id
        .ok_or_else(|| AppError::bad_request("Notice has no linked clause"))?;
    let clause = repo::clause::find_by_id(&mut conn, project_id, clause_id)
        .await?
        .ok_or_else(|| AppError::not_found("Linked clause not found"))?;
    let project = repo::project::require(&mut conn, project_id).await?;
    let deadline = repo::deadline::find_by_notice(&mut conn, project_id, notice_id).await?;
    drop(conn);

    let now = now_utc();
    let trigger_description = deadline
        .as_ref()
        .map(|d| d.trigger_description.clone())
        .unwrap_or_else(|| "Manual notice".to_string());
    let trigger_date = deadline.as_ref().map(|d| d.triggered_at).unwrap_or(now);
    let deadline_date = deadline
        .as_ref()
        .map(|d| d.calculated_deadline)
        .or(notice.due_date)
        .unwrap_or(now);

    let draft = generate_draft(
        &notice.notice_type,
        &clause,
        &project,
        Some(user),
        &trigger_description,
        trigger_date,
        deadline_date,
        custom_instructions,
    )
    .await?;

    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    let updated = repo::notice::replace_content(
        &mut tx,
        project_id,
        notice_id,
        &draft.content,
        &draft.model,
        now_utc(),
    )
    .await?
    .ok_or_else(|| AppError::not_found(format!("Notice {} not found", notice_id)))?;

    repo::audit::append(
        &mut tx,
        NewAuditEntry::system(
            project_id,
            "NOTICE_REGENERATED",
            "ComplianceNotice",
            notice_id.to_string(),
            "regenerate_notice",
            json!({
                "model": draft.model,
                "customInstructions": custom_instructions,
            }),
        )
        .by_ai(),
    )
    .await?;

    tx.commit().await.map_err(sqlx_to_app_error)?;
    Ok(updated)
}

/// Delete a draft notice, unlinking its deadline.
pub async fn delete_notice(
    pool: &PgPool,
    project_id: Uuid,
    notice_id: Uuid,
    user: &User,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    let notice = repo::notice::find_by_id(&mut tx, project_id, notice_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Notice {} not found", notice_id)))?;
    editable_guard(&notice, "delete")?;

    let now = now_utc();
    if let Some(deadline) = repo::deadline::unlink_notice(&mut tx, project_id, notice_id, now).await? {
        repo::audit::append(
            &mut tx,
            NewAuditEntry::system(
                project_id,
                "DEADLINE_STATUS_CHANGE",
                "ComplianceDeadline",
                deadline.id.to_string(),
                "unlink_notice",
                json!({
                    "oldStatus": "NOTICE_DRAFTED",
                    "newStatus": "ACTIVE",
                    "noticeId": notice_id.to_string(),
                }),
            )
            .by_user(Some(user.id)),
        )
        .await?;
    }

    repo::audit::append(
        &mut tx,
        NewAuditEntry::system(
            project_id,
            "NOTICE_DELETED",
            "ComplianceNotice",
            notice_id.to_string(),
            "delete_notice",
            json!({ "title": notice.title, "type": notice.notice_type }),
        )
        .by_user(Some(user.id)),
    )
    .await?;

    repo::notice::delete(&mut tx, project_id, notice_id).await?;

    tx.commit().await.map_err(sqlx_to_app_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn on_time_when_sent_before_due() {
        assert!(on_time(ts(19, 12), Some(ts(20, 23))));
    }

    #[test]
    fn on_time_at_exact_due_instant() {
        assert!(on_time(ts(20, 23), Some(ts(20, 23))));
    }

    #[test]
    fn late_when_sent_after_due() {
        assert!(!on_time(ts(21, 0), Some(ts(20, 23))));
    }

    #[test]
    fn null_due_date_is_on_time() {
        assert!(on_time(ts(21, 0), None));
    }
}
