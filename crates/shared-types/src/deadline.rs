use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::common::{fmt_ts, fmt_ts_opt};

/// Compliance deadline row from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ComplianceDeadline {
    pub id: Uuid,
    pub project_id: Uuid,
    pub clause_id: Uuid,
    pub trigger_event_type: String,
    pub trigger_event_id: Option<String>,
    pub trigger_description: String,
    pub triggered_at: NaiveDateTime,
    pub triggered_by: Option<Uuid>,
    pub calculated_deadline: NaiveDateTime,
    pub deadline_timezone: String,
    pub status: String,
    pub severity: String,
    pub notice_id: Option<Uuid>,
    pub notice_created_at: Option<NaiveDateTime>,
    pub waived_at: Option<NaiveDateTime>,
    pub waived_by: Option<Uuid>,
    pub waiver_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// API response shape for a deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineResponse {
    pub id: String,
    pub project_id: String,
    pub clause_id: String,
    pub trigger_event_type: String,
    pub trigger_event_id: Option<String>,
    pub trigger_description: String,
    pub triggered_at: String,
    pub triggered_by: Option<String>,
    pub calculated_deadline: String,
    /// Display hint only; all stored timestamps are UTC.
    pub deadline_timezone: String,
    pub status: String,
    pub severity: String,
    pub notice_id: Option<String>,
    pub notice_created_at: Option<String>,
    /// Secondary cure-period deadline, present only on creation responses
    /// when the clause defines a cure period. Computed, never stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cure_deadline: Option<String>,
    pub waived_at: Option<String>,
    pub waived_by: Option<String>,
    pub waiver_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ComplianceDeadline> for DeadlineResponse {
    fn from(d: ComplianceDeadline) -> Self {
        Self {
            id: d.id.to_string(),
            project_id: d.project_id.to_string(),
            clause_id: d.clause_id.to_string(),
            trigger_event_type: d.trigger_event_type,
            trigger_event_id: d.trigger_event_id,
            trigger_description: d.trigger_description,
            triggered_at: fmt_ts(d.triggered_at),
            triggered_by: d.triggered_by.map(|u| u.to_string()),
            calculated_deadline: fmt_ts(d.calculated_deadline),
            deadline_timezone: d.deadline_timezone,
            status: d.status,
            severity: d.severity,
            notice_id: d.notice_id.map(|u| u.to_string()),
            notice_created_at: fmt_ts_opt(d.notice_created_at),
            cure_deadline: None,
            waived_at: fmt_ts_opt(d.waived_at),
            waived_by: d.waived_by.map(|u| u.to_string()),
            waiver_reason: d.waiver_reason,
            created_at: fmt_ts(d.created_at),
            updated_at: fmt_ts(d.updated_at),
        }
    }
}

impl DeadlineResponse {
    pub fn with_cure_deadline(mut self, cure: Option<NaiveDateTime>) -> Self {
        self.cure_deadline = fmt_ts_opt(cure);
        self
    }
}

/// Request to create a deadline from a trigger event.
///
/// Timestamps arrive RFC 3339 with offset and are normalized to naive UTC at
/// the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeadlineRequest {
    pub clause_id: Uuid,
    pub trigger_event_type: String,
    #[validate(length(min = 1, message = "triggerDescription must not be empty"))]
    pub trigger_description: String,
    pub triggered_at: DateTime<Utc>,
    #[serde(default)]
    pub trigger_event_id: Option<String>,
}

/// Request to waive a deadline.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct WaiveDeadlineRequest {
    #[validate(length(min = 1, message = "reason must not be empty"))]
    pub reason: String,
}

/// Query parameters for deadline listing.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct DeadlineListParams {
    pub status: Option<String>,
    pub severity: Option<String>,
}

/// Request body for the change-event trigger endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventTriggerRequest {
    pub change_event_id: String,
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: String,
}

/// Summary of deadlines created by one RFI trigger.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RfiComplianceCheck {
    pub rfi_id: String,
    pub deadline_count: usize,
    pub deadlines: Vec<DeadlineResponse>,
}

/// Request body for the RFI trigger endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RfiTriggerRequest {
    pub rfi_id: String,
    #[validate(length(min = 1, message = "rfiNumber must not be empty"))]
    pub rfi_number: String,
    pub rfi_subject: String,
}
