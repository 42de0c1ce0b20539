use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::common::fmt_ts;

/// Project-specific holiday row. Unique on (project_id, date).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectHoliday {
    pub id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub name: String,
    pub description: Option<String>,
    pub recurring: bool,
    pub source: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// API response shape for a project holiday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HolidayResponse {
    pub id: String,
    pub project_id: String,
    pub date: String,
    pub name: String,
    pub description: Option<String>,
    pub recurring: bool,
    pub source: String,
    pub created_at: String,
}

impl From<ProjectHoliday> for HolidayResponse {
    fn from(h: ProjectHoliday) -> Self {
        Self {
            id: h.id.to_string(),
            project_id: h.project_id.to_string(),
            date: h.date.format("%Y-%m-%d").to_string(),
            name: h.name,
            description: h.description,
            recurring: h.recurring,
            source: h.source,
            created_at: fmt_ts(h.created_at),
        }
    }
}

/// Request to add a project holiday.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateHolidayRequest {
    /// ISO date, YYYY-MM-DD.
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recurring: bool,
}
