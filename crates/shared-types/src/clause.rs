use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{fmt_ts, fmt_ts_opt};

/// Contract clause row from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContractClause {
    pub id: Uuid,
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
    pub confirmed: bool,
    pub confirmed_at: Option<NaiveDateTime>,
    pub confirmed_by: Option<Uuid>,
    pub ai_extracted: bool,
    pub ai_model: Option<String>,
    pub source_doc_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ContractClause {
    /// Display reference for alerts and trigger descriptions: the section
    /// ref when present, otherwise the clause title.
    pub fn reference(&self) -> &str {
        self.section_ref.as_deref().unwrap_or(&self.title)
    }
}

/// API response shape for a contract clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClauseResponse {
    pub id: String,
    pub project_id: String,
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
    pub confirmed: bool,
    pub confirmed_at: Option<String>,
    pub confirmed_by: Option<String>,
    pub ai_extracted: bool,
    pub ai_model: Option<String>,
    pub source_doc_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ContractClause> for ClauseResponse {
    fn from(c: ContractClause) -> Self {
        Self {
            id: c.id.to_string(),
            project_id: c.project_id.to_string(),
            kind: c.kind,
            title: c.title,
            content: c.content,
            section_ref: c.section_ref,
            deadline_days: c.deadline_days,
            deadline_type: c.deadline_type,
            notice_method: c.notice_method,
            trigger: c.trigger,
            cure_period_days: c.cure_period_days,
            cure_period_type: c.cure_period_type,
            flow_down_provisions: c.flow_down_provisions,
            parent_clause_ref: c.parent_clause_ref,
            requires_review: c.requires_review,
            review_reason: c.review_reason,
            confirmed: c.confirmed,
            confirmed_at: fmt_ts_opt(c.confirmed_at),
            confirmed_by: c.confirmed_by.map(|u| u.to_string()),
            ai_extracted: c.ai_extracted,
            ai_model: c.ai_model,
            source_doc_id: c.source_doc_id.map(|u| u.to_string()),
            created_at: fmt_ts(c.created_at),
            updated_at: fmt_ts(c.updated_at),
        }
    }
}

/// Request body for contract parsing.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParseContractRequest {
    pub document_id: Uuid,
}

/// Response body for contract parsing.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParseContractResponse {
    pub clauses_extracted: usize,
    pub clauses: Vec<ClauseResponse>,
}

/// Query parameters for clause listing.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ClauseListParams {
    pub kind: Option<String>,
    pub confirmed: Option<bool>,
}
