//! Scoring engine: on-time performance score, streaks, claims values, and
//! periodic history snapshots.
//!
//! score = round(onTimeCount / totalCount * 100), or 100 with no sent
//! notices. The streak counts consecutive most-recent on-time notices by
//! sentAt descending; bestStreak only grows.

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use shared_types::{
    AppError, ComplianceHealthComponent, ComplianceNotice, ComplianceScore,
    ComplianceScoreHistory, Severity,
};

use crate::config::settings;
use crate::error_convert::sqlx_to_app_error;
use crate::repo;

use super::now_utc;

/// Count consecutive most-recent on-time notices, ordered by sentAt
/// descending. Notices without a sentAt are ignored.
pub fn compute_streak(notices: &[ComplianceNotice]) -> i32 {
    let mut sent: Vec<&ComplianceNotice> = notices.iter().filter(|n| n.sent_at.is_some()).collect();
    sent.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));

    let mut streak = 0;
    for notice in sent {
        if notice.on_time_status == Some(true) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// round(onTime / total * 100); empty input scores a clean 100.
pub fn compute_score_percentage(on_time_count: i32, total_count: i32) -> i32 {
    if total_count == 0 {
        return 100;
    }
    ((on_time_count as f64 / total_count as f64) * 100.0).round() as i32
}

fn build_details(
    score: i32,
    on_time: i32,
    total: i32,
    missed: i32,
    at_risk: i32,
    active: i32,
    streak: i32,
) -> serde_json::Value {
    json!({
        "score": score,
        "onTimeCount": on_time,
        "totalCount": total,
        "missedCount": missed,
        "atRiskCount": at_risk,
        "activeDeadlines": active,
        "currentStreak": streak,
        "formula": "onTimeCount / totalCount * 100",
    })
}

/// Calculate and upsert the compliance score for a project, inside the
/// caller's transaction.
pub async fn calculate_score(
    conn: &mut PgConnection,
    project_id: Uuid,
    now: NaiveDateTime,
) -> Result<ComplianceScore, AppError> {
    let notices = repo::notice::sent_notices(conn, project_id).await?;

    let total_count = notices.len() as i32;
    let on_time_count = notices.iter().filter(|n| n.on_time_status == Some(true)).count() as i32;
    let missed_count = notices.iter().filter(|n| n.on_time_status == Some(false)).count() as i32;
    let score = compute_score_percentage(on_time_count, total_count);

    let deadlines = repo::deadline::open_deadlines(conn, project_id).await?;
    let active_count = deadlines.len() as i32;
    let at_risk_count = deadlines
        .iter()
        .filter(|d| {
            matches!(
                Severity::from_str(&d.severity),
                Ok(Severity::Critical) | Ok(Severity::Warning)
            )
        })
        .count() as i32;
    let upcoming_count = deadlines
        .iter()
        .filter(|d| {
            matches!(Severity::from_str(&d.severity), Ok(Severity::Low) | Ok(Severity::Info))
        })
        .count() as i32;

    let claims_value = settings().claims_value_per_notice;
    let protected_claims_value = Decimal::from(on_time_count) * claims_value;
    let at_risk_value = Decimal::from(at_risk_count) * claims_value;

    let current_streak = compute_streak(&notices);

    let previous = repo::score::get(conn, project_id).await?;
    let (previous_best, previous_streak) = previous
        .map(|s| (s.best_streak, s.current_streak))
        .unwrap_or((0, 0));
    let best_streak = previous_best.max(current_streak);
    let streak_broken_at = (current_streak < previous_streak && previous_streak > 0).then_some(now);

    let score_record = repo::score::upsert(
        conn,
        project_id,
        &repo::score::ScoreUpdate {
            score,
            details: build_details(
                score,
                on_time_count,
                total_count,
                missed_count,
                at_risk_count,
                active_count,
                current_streak,
            ),
            current_streak,
            best_streak,
            streak_broken_at,
            protected_claims_value,
            at_risk_value,
            on_time_count,
            total_count,
            missed_count,
            at_risk_count,
            active_count,
            upcoming_count,
        },
        now,
    )
    .await?;

    tracing::info!(
        project_id = %project_id,
        score = score,
        on_time = on_time_count,
        total = total_count,
        streak = current_streak,
        "Calculated compliance score"
    );

    Ok(score_record)
}

/// Recalculate the score in its own transaction.
pub async fn recalculate(pool: &PgPool, project_id: Uuid) -> Result<ComplianceScore, AppError> {
    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;
    let score = calculate_score(&mut tx, project_id, now_utc()).await?;
    tx.commit().await.map_err(sqlx_to_app_error)?;
    Ok(score)
}

/// The current score, computing one if the project has none yet.
pub async fn current_score(pool: &PgPool, project_id: Uuid) -> Result<ComplianceScore, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    if let Some(score) = repo::score::get(&mut conn, project_id).await? {
        return Ok(score);
    }
    drop(conn);
    recalculate(pool, project_id).await
}

/// Create (or replace) a score history snapshot for the given period,
/// inside the caller's transaction. `snapshot_date` is the start of the
/// current UTC day; `noticesSentInPeriod` uses a 24h window for daily and
/// 7d for weekly snapshots.
pub async fn create_snapshot(
    conn: &mut PgConnection,
    project_id: Uuid,
    period_type: &str,
    now: NaiveDateTime,
) -> Result<ComplianceScoreHistory, AppError> {
    let score = calculate_score(conn, project_id, now).await?;

    let period_hours = if period_type == "daily" { 24 } else { 168 };
    let period_start = now - Duration::hours(period_hours);
    let sent_in_period = repo::score::count_sent_since(conn, project_id, period_start).await? as i32;

    let snapshot_date = now
        .date()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time");

    repo::score::upsert_history(
        conn,
        project_id,
        snapshot_date,
        period_type,
        Decimal::from(score.score),
        score.on_time_count,
        score.total_count,
        sent_in_period,
        score.protected_claims_value,
    )
    .await
}

/// Score history for trending, newest first.
pub async fn score_history(
    pool: &PgPool,
    project_id: Uuid,
    period_type: &str,
    limit: i64,
) -> Result<Vec<ComplianceScoreHistory>, AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    repo::score::history(&mut conn, project_id, period_type, limit.clamp(1, 365)).await
}

/// Compliance as a component of project health (20% weight). At-risk
/// deadlines dock 5 points each; thresholds set warning/critical status.
pub async fn health_component(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<ComplianceHealthComponent, AppError> {
    let score = recalculate(pool, project_id).await?;

    let mut component_score = score.score;
    if score.at_risk_count > 0 {
        component_score = (component_score - score.at_risk_count * 5).max(0);
    }

    let status = if component_score < 60 || score.at_risk_count > 5 {
        "critical"
    } else if component_score < 80 || score.at_risk_count > 2 {
        "warning"
    } else {
        "good"
    };

    Ok(ComplianceHealthComponent {
        name: "Contract Compliance".to_string(),
        score: component_score,
        weight: 0.2,
        status: status.to_string(),
        details: json!({
            "compliancePercentage": score.score,
            "onTimeCount": score.on_time_count,
            "totalCount": score.total_count,
            "currentStreak": score.current_streak,
            "protectedClaimsValue": score.protected_claims_value,
            "atRiskCount": score.at_risk_count,
            "activeDeadlines": score.active_count,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn notice(sent_day: Option<u32>, on_time: Option<bool>) -> ComplianceNotice {
        let base = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        ComplianceNotice {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            notice_type: "CLAIM_NOTICE".to_string(),
            status: "SENT".to_string(),
            title: "Notice".to_string(),
            content: "Body".to_string(),
            recipient_name: None,
            recipient_email: None,
            due_date: None,
            sent_at: sent_day.map(|d| {
                NaiveDate::from_ymd_opt(2025, 3, d).unwrap().and_hms_opt(12, 0, 0).unwrap()
            }),
            delivered_at: None,
            acknowledged_at: None,
            clause_id: None,
            delivery_methods: vec![],
            delivery_confirmation: None,
            on_time_status: on_time,
            generated_by_ai: false,
            ai_model: None,
            created_by_id: Uuid::nil(),
            created_at: base,
            updated_at: base,
        }
    }

    #[test]
    fn empty_scores_one_hundred() {
        assert_eq!(compute_score_percentage(0, 0), 100);
        assert_eq!(compute_streak(&[]), 0);
    }

    #[test]
    fn score_rounds_to_nearest() {
        assert_eq!(compute_score_percentage(2, 3), 67);
        assert_eq!(compute_score_percentage(1, 3), 33);
        assert_eq!(compute_score_percentage(1, 1), 100);
        assert_eq!(compute_score_percentage(0, 4), 0);
    }

    #[test]
    fn streak_counts_leading_on_time() {
        // Most recent first by sent day: 5 (true), 4 (true), 3 (false), 2 (true).
        let notices = vec![
            notice(Some(2), Some(true)),
            notice(Some(5), Some(true)),
            notice(Some(3), Some(false)),
            notice(Some(4), Some(true)),
        ];
        assert_eq!(compute_streak(&notices), 2);
    }

    #[test]
    fn streak_zero_when_latest_missed() {
        let notices = vec![notice(Some(5), Some(false)), notice(Some(4), Some(true))];
        assert_eq!(compute_streak(&notices), 0);
    }

    #[test]
    fn streak_ignores_unsent_notices() {
        let notices = vec![notice(None, Some(true)), notice(Some(4), Some(true))];
        assert_eq!(compute_streak(&notices), 1);
    }

    #[test]
    fn single_on_time_notice_scores_100_streak_1() {
        let notices = vec![notice(Some(5), Some(true))];
        assert_eq!(compute_streak(&notices), 1);
        assert_eq!(compute_score_percentage(1, 1), 100);
    }

    #[test]
    fn details_blob_carries_formula() {
        let details = build_details(80, 4, 5, 1, 2, 3, 4);
        assert_eq!(details["formula"], "onTimeCount / totalCount * 100");
        assert_eq!(details["score"], 80);
        assert_eq!(details["atRiskCount"], 2);
    }
}
