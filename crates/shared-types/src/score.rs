use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{fmt_ts, fmt_ts_opt};

/// The single active compliance score row for a project.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ComplianceScore {
    pub id: Uuid,
    pub project_id: Uuid,
    pub score: i32,
    pub details: serde_json::Value,
    pub current_streak: i32,
    pub best_streak: i32,
    pub streak_broken_at: Option<NaiveDateTime>,
    pub protected_claims_value: Decimal,
    pub at_risk_value: Decimal,
    pub on_time_count: i32,
    pub total_count: i32,
    pub missed_count: i32,
    pub at_risk_count: i32,
    pub active_count: i32,
    pub upcoming_count: i32,
    pub last_calculated_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

/// API response shape for the compliance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub id: String,
    pub project_id: String,
    pub score: i32,
    pub details: serde_json::Value,
    pub current_streak: i32,
    pub best_streak: i32,
    pub streak_broken_at: Option<String>,
    pub protected_claims_value: Decimal,
    pub at_risk_value: Decimal,
    pub on_time_count: i32,
    pub total_count: i32,
    pub missed_count: i32,
    pub at_risk_count: i32,
    pub active_count: i32,
    pub upcoming_count: i32,
    pub last_calculated_at: String,
}

impl From<ComplianceScore> for ScoreResponse {
    fn from(s: ComplianceScore) -> Self {
        Self {
            id: s.id.to_string(),
            project_id: s.project_id.to_string(),
            score: s.score,
            details: s.details,
            current_streak: s.current_streak,
            best_streak: s.best_streak,
            streak_broken_at: fmt_ts_opt(s.streak_broken_at),
            protected_claims_value: s.protected_claims_value,
            at_risk_value: s.at_risk_value,
            on_time_count: s.on_time_count,
            total_count: s.total_count,
            missed_count: s.missed_count,
            at_risk_count: s.at_risk_count,
            active_count: s.active_count,
            upcoming_count: s.upcoming_count,
            last_calculated_at: fmt_ts(s.last_calculated_at),
        }
    }
}

/// Immutable point-in-time score snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ComplianceScoreHistory {
    pub id: Uuid,
    pub project_id: Uuid,
    pub snapshot_date: NaiveDateTime,
    pub compliance_percentage: Decimal,
    pub on_time_count: i32,
    pub total_count: i32,
    pub notices_sent_in_period: i32,
    pub protected_claims_value: Decimal,
    pub period_type: String,
    pub created_at: NaiveDateTime,
}

/// API response shape for a score history snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreHistoryResponse {
    pub id: String,
    pub project_id: String,
    pub snapshot_date: String,
    pub compliance_percentage: Decimal,
    pub on_time_count: i32,
    pub total_count: i32,
    pub notices_sent_in_period: i32,
    pub protected_claims_value: Decimal,
    pub period_type: String,
}

impl From<ComplianceScoreHistory> for ScoreHistoryResponse {
    fn from(h: ComplianceScoreHistory) -> Self {
        Self {
            id: h.id.to_string(),
            project_id: h.project_id.to_string(),
            snapshot_date: fmt_ts(h.snapshot_date),
            compliance_percentage: h.compliance_percentage,
            on_time_count: h.on_time_count,
            total_count: h.total_count,
            notices_sent_in_period: h.notices_sent_in_period,
            protected_claims_value: h.protected_claims_value,
            period_type: h.period_type,
        }
    }
}

/// Query parameters for score history.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ScoreHistoryParams {
    pub period: Option<String>,
    pub limit: Option<i64>,
}

/// Compliance component of the project health dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceHealthComponent {
    pub name: String,
    pub score: i32,
    pub weight: f64,
    pub status: String,
    pub details: serde_json::Value,
}
