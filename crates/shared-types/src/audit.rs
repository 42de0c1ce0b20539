use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::fmt_ts;

/// Append-only audit log row. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ComplianceAuditLog {
    pub id: Uuid,
    pub project_id: Uuid,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub actor_type: String,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

/// Fields for a new audit entry. The id and timestamp are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub project_id: Uuid,
    pub event_type: &'static str,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub user_id: Option<Uuid>,
    pub actor_type: &'static str,
    pub action: &'static str,
    pub details: serde_json::Value,
}

impl NewAuditEntry {
    /// A SYSTEM-actor entry; attaching a user id flips the actor to USER,
    /// matching how engine operations attribute actions.
    pub fn system(
        project_id: Uuid,
        event_type: &'static str,
        entity_type: &'static str,
        entity_id: String,
        action: &'static str,
        details: serde_json::Value,
    ) -> Self {
        Self {
            project_id,
            event_type,
            entity_type,
            entity_id,
            user_id: None,
            actor_type: "SYSTEM",
            action,
            details,
        }
    }

    pub fn by_user(mut self, user_id: Option<Uuid>) -> Self {
        if user_id.is_some() {
            self.user_id = user_id;
            self.actor_type = "USER";
        }
        self
    }

    pub fn by_ai(mut self) -> Self {
        self.actor_type = "AI";
        self
    }
}

/// API response shape for an audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub id: String,
    pub project_id: String,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub user_id: Option<String>,
    pub actor_type: String,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

impl From<ComplianceAuditLog> for AuditLogResponse {
    fn from(entry: ComplianceAuditLog) -> Self {
        Self {
            id: entry.id.to_string(),
            project_id: entry.project_id.to_string(),
            event_type: entry.event_type,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            user_id: entry.user_id.map(|u| u.to_string()),
            actor_type: entry.actor_type,
            action: entry.action,
            details: entry.details,
            created_at: fmt_ts(entry.created_at),
        }
    }
}
