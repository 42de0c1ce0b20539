use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project row. Projects own every compliance entity; the compliance core
/// reads them but never creates or mutates them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub gc_company_name: Option<String>,
    pub gc_contact_name: Option<String>,
    pub gc_contact_email: Option<String>,
    pub created_at: NaiveDateTime,
}

/// User row, consumed for attribution, alerts, and role checks.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

/// Parsed document row, produced by the external ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub doc_type: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
}
