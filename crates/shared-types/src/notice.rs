use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::common::{fmt_ts, fmt_ts_opt};

/// Compliance notice row from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ComplianceNotice {
    pub id: Uuid,
    pub project_id: Uuid,
    pub notice_type: String,
    pub status: String,
    pub title: String,
    pub content: String,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub sent_at: Option<NaiveDateTime>,
    pub delivered_at: Option<NaiveDateTime>,
    pub acknowledged_at: Option<NaiveDateTime>,
    pub clause_id: Option<Uuid>,
    pub delivery_methods: Vec<String>,
    pub delivery_confirmation: Option<serde_json::Value>,
    pub on_time_status: Option<bool>,
    pub generated_by_ai: bool,
    pub ai_model: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// API response shape for a notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoticeResponse {
    pub id: String,
    pub project_id: String,
    #[serde(rename = "type")]
    pub notice_type: String,
    pub status: String,
    pub title: String,
    pub content: String,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub due_date: Option<String>,
    pub sent_at: Option<String>,
    pub delivered_at: Option<String>,
    pub acknowledged_at: Option<String>,
    pub clause_id: Option<String>,
    pub delivery_methods: Vec<String>,
    pub delivery_confirmation: Option<serde_json::Value>,
    pub on_time_status: Option<bool>,
    #[serde(rename = "generatedByAI")]
    pub generated_by_ai: bool,
    pub ai_model: Option<String>,
    pub created_by_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ComplianceNotice> for NoticeResponse {
    fn from(n: ComplianceNotice) -> Self {
        Self {
            id: n.id.to_string(),
            project_id: n.project_id.to_string(),
            notice_type: n.notice_type,
            status: n.status,
            title: n.title,
            content: n.content,
            recipient_name: n.recipient_name,
            recipient_email: n.recipient_email,
            due_date: fmt_ts_opt(n.due_date),
            sent_at: fmt_ts_opt(n.sent_at),
            delivered_at: fmt_ts_opt(n.delivered_at),
            acknowledged_at: fmt_ts_opt(n.acknowledged_at),
            clause_id: n.clause_id.map(|u| u.to_string()),
            delivery_methods: n.delivery_methods,
            delivery_confirmation: n.delivery_confirmation,
            on_time_status: n.on_time_status,
            generated_by_ai: n.generated_by_ai,
            ai_model: n.ai_model,
            created_by_id: n.created_by_id.to_string(),
            created_at: fmt_ts(n.created_at),
            updated_at: fmt_ts(n.updated_at),
        }
    }
}

/// Request to create a notice, optionally drafting the body with AI.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoticeRequest {
    #[serde(rename = "type")]
    pub notice_type: String,
    #[validate(length(min = 1, max = 500, message = "title must be 1-500 characters"))]
    pub title: String,
    /// Manual content; ignored when `generateWithAI` is set.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub clause_id: Option<Uuid>,
    #[serde(default)]
    pub deadline_id: Option<Uuid>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "recipientEmail must be a valid email"))]
    pub recipient_email: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, rename = "generateWithAI")]
    pub generate_with_ai: bool,
    #[serde(default)]
    pub trigger_description: Option<String>,
    #[serde(default)]
    pub trigger_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deadline_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additional_context: Option<String>,
}

/// Partial update of a draft notice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateNoticeRequest {
    #[validate(length(min = 1, max = 500, message = "title must be 1-500 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: Option<String>,
    pub recipient_name: Option<String>,
    #[validate(email(message = "recipientEmail must be a valid email"))]
    pub recipient_email: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// Only DRAFT <-> PENDING_REVIEW moves are accepted here.
    pub status: Option<String>,
}

/// Request to record an out-of-band delivery confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmDeliveryRequest {
    #[validate(length(min = 1, message = "method must not be empty"))]
    pub method: String,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub signed_by: Option<String>,
    #[serde(default)]
    pub received_by: Option<String>,
}

/// Request to regenerate a draft notice body with AI.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RegenerateNoticeRequest {
    pub custom_instructions: Option<String>,
}

/// Query parameters for notice listing.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct NoticeListParams {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub notice_type: Option<String>,
}
