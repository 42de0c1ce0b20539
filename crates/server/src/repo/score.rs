use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use shared_types::{AppError, ComplianceScore, ComplianceScoreHistory};

use crate::error_convert::SqlxErrorExt;

const SCORE_COLUMNS: &str = "id, project_id, score, details, current_streak, best_streak, \
    streak_broken_at, protected_claims_value, at_risk_value, on_time_count, total_count, \
    missed_count, at_risk_count, active_count, upcoming_count, last_calculated_at, created_at";

const HISTORY_COLUMNS: &str = "id, project_id, snapshot_date, compliance_percentage, \
    on_time_count, total_count, notices_sent_in_period, protected_claims_value, period_type, \
    created_at";

/// Computed score fields for the upsert.
#[derive(Debug, Clone)]
pub struct ScoreUpdate {
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
}

/// The current score row for a project, if one has been calculated.
pub async fn get(conn: &mut PgConnection, project_id: Uuid) -> Result<Option<ComplianceScore>, AppError> {
    let query = format!("SELECT {SCORE_COLUMNS} FROM compliance_scores WHERE project_id = $1");
    sqlx::query_as::<_, ComplianceScore>(&query)
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Upsert the single active score row for a project.
///
/// `streak_broken_at` is only overwritten when the new computation sets it;
/// `best_streak` is monotone by construction in the caller.
pub async fn upsert(
    conn: &mut PgConnection,
    project_id: Uuid,
    update: &ScoreUpdate,
    now: NaiveDateTime,
) -> Result<ComplianceScore, AppError> {
    let query = format!(
        r#"
        INSERT INTO compliance_scores
            (project_id, score, details, current_streak, best_streak, streak_broken_at,
             protected_claims_value, at_risk_value, on_time_count, total_count, missed_count,
             at_risk_count, active_count, upcoming_count, last_calculated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        ON CONFLICT (project_id) DO UPDATE SET
            score = EXCLUDED.score,
            details = EXCLUDED.details,
            current_streak = EXCLUDED.current_streak,
            best_streak = EXCLUDED.best_streak,
            streak_broken_at = COALESCE(EXCLUDED.streak_broken_at, compliance_scores.streak_broken_at),
            protected_claims_value = EXCLUDED.protected_claims_value,
            at_risk_value = EXCLUDED.at_risk_value,
            on_time_count = EXCLUDED.on_time_count,
            total_count = EXCLUDED.total_count,
            missed_count = EXCLUDED.missed_count,
            at_risk_count = EXCLUDED.at_risk_count,
            active_count = EXCLUDED.active_count,
            upcoming_count = EXCLUDED.upcoming_count,
            last_calculated_at = EXCLUDED.last_calculated_at
        RETURNING {SCORE_COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceScore>(&query)
        .bind(project_id)
        .bind(update.score)
        .bind(&update.details)
        .bind(update.current_streak)
        .bind(update.best_streak)
        .bind(update.streak_broken_at)
        .bind(update.protected_claims_value)
        .bind(update.at_risk_value)
        .bind(update.on_time_count)
        .bind(update.total_count)
        .bind(update.missed_count)
        .bind(update.at_risk_count)
        .bind(update.active_count)
        .bind(update.upcoming_count)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Upsert a history snapshot, unique on (project, snapshot date, period).
/// Re-running a snapshot job replaces the same-day row.
pub async fn upsert_history(
    conn: &mut PgConnection,
    project_id: Uuid,
    snapshot_date: NaiveDateTime,
    period_type: &str,
    compliance_percentage: Decimal,
    on_time_count: i32,
    total_count: i32,
    notices_sent_in_period: i32,
    protected_claims_value: Decimal,
) -> Result<ComplianceScoreHistory, AppError> {
    let query = format!(
        r#"
        INSERT INTO compliance_score_history
            (project_id, snapshot_date, period_type, compliance_percentage, on_time_count,
             total_count, notices_sent_in_period, protected_claims_value)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (project_id, snapshot_date, period_type) DO UPDATE SET
            compliance_percentage = EXCLUDED.compliance_percentage,
            on_time_count = EXCLUDED.on_time_count,
            total_count = EXCLUDED.total_count,
            notices_sent_in_period = EXCLUDED.notices_sent_in_period,
            protected_claims_value = EXCLUDED.protected_claims_value
        RETURNING {HISTORY_COLUMNS}
        "#
    );
    sqlx::query_as::<_, ComplianceScoreHistory>(&query)
        .bind(project_id)
        .bind(snapshot_date)
        .bind(period_type)
        .bind(compliance_percentage)
        .bind(on_time_count)
        .bind(total_count)
        .bind(notices_sent_in_period)
        .bind(protected_claims_value)
        .fetch_one(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Score history for trending, newest first.
pub async fn history(
    conn: &mut PgConnection,
    project_id: Uuid,
    period_type: &str,
    limit: i64,
) -> Result<Vec<ComplianceScoreHistory>, AppError> {
    let query = format!(
        r#"
        SELECT {HISTORY_COLUMNS} FROM compliance_score_history
        WHERE project_id = $1 AND period_type = $2
        ORDER BY snapshot_date DESC
        LIMIT $3
        "#
    );
    sqlx::query_as::<_, ComplianceScoreHistory>(&query)
        .bind(project_id)
        .bind(period_type)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Notices sent within a window, for `noticesSentInPeriod`.
pub async fn count_sent_since(
    conn: &mut PgConnection,
    project_id: Uuid,
    since: NaiveDateTime,
) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM compliance_notices
        WHERE project_id = $1 AND sent_at >= $2 AND status IN ('SENT', 'ACKNOWLEDGED')
        "#,
    )
    .bind(project_id)
    .bind(since)
    .fetch_one(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
