//! Alert dispatcher: in-app notifications for severity transitions, alert
//! emails for CRITICAL/EXPIRED deadlines, and the weekly summary.

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use sqlx::PgConnection;

use shared_types::{AppError, ComplianceDeadline, ComplianceScore, Severity, User};

use crate::repo;

use super::severity::label_for_days_remaining;

/// Map deadline severity to notification severity.
pub fn notification_severity(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::Expired => "CRITICAL",
        Severity::Warning => "WARNING",
        _ => "INFO",
    }
}

/// Whole days until the deadline; negative when already past.
pub fn days_remaining(deadline: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (deadline - now).num_seconds() / 86_400
}

/// "EXPIRED", "1 day remaining", "4 days remaining".
pub fn days_remaining_label(days: i64) -> String {
    if days < 0 {
        "EXPIRED".to_string()
    } else if days == 1 {
        "1 day remaining".to_string()
    } else {
        format!("{} days remaining", days)
    }
}

/// Notification title: "CRITICAL: Claims Procedure".
pub fn alert_title(severity: Severity, clause_title: &str) -> String {
    format!("{}: {}", severity, clause_title)
}

/// Notification message with the remaining-time label, clause reference and
/// trigger description.
pub fn alert_message(remaining_label: &str, clause_ref: Option<&str>, trigger_description: &str) -> String {
    format!(
        "Notice due {} — {}. {}",
        remaining_label,
        clause_ref.unwrap_or("N/A"),
        trigger_description
    )
}

/// An alert email queued for delivery after the surrounding transaction
/// commits.
#[derive(Debug, Clone)]
pub struct PendingAlertEmail {
    pub to: String,
    pub to_name: String,
    pub title: String,
    pub message: String,
    pub deadline_label: String,
}

/// Record in-app notifications for one escalated deadline across the
/// eligible users, and return the alert emails to send (CRITICAL/EXPIRED
/// only) once the caller's transaction has committed.
pub async fn notify_deadline(
    conn: &mut PgConnection,
    deadline: &ComplianceDeadline,
    severity: Severity,
    now: NaiveDateTime,
    users: &[User],
) -> Result<Vec<PendingAlertEmail>, AppError> {
    let clause = repo::clause::find_by_id(conn, deadline.project_id, deadline.clause_id).await?;
    let (clause_title, clause_ref) = match &clause {
        Some(c) => (c.title.as_str(), c.section_ref.as_deref()),
        None => ("Unknown", None),
    };

    let days = days_remaining(deadline.calculated_deadline, now);
    let label = days_remaining_label(days);
    let title = alert_title(severity, clause_title);
    let message = alert_message(&label, clause_ref, &deadline.trigger_description);

    let mut emails = Vec::new();
    for user in users {
        repo::notification::insert(
            conn,
            &repo::notification::NewNotification {
                user_id: user.id,
                project_id: Some(deadline.project_id),
                notification_type: "COMPLIANCE_DEADLINE",
                severity: notification_severity(severity),
                title: title.clone(),
                message: message.clone(),
                entity_type: Some("ComplianceDeadline"),
                entity_id: Some(deadline.id.to_string()),
            },
        )
        .await?;

        if matches!(severity, Severity::Critical | Severity::Expired) {
            emails.push(PendingAlertEmail {
                to: user.email.clone(),
                to_name: user.name.clone(),
                title: title.clone(),
                message: message.clone(),
                deadline_label: deadline
                    .calculated_deadline
                    .format("%A, %B %d, %Y")
                    .to_string(),
            });
        }
    }

    Ok(emails)
}

/// Comma-grouped integer for dollar amounts in the digest: 50000 -> "50,000".
fn comma_grouped(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

/// An upcoming deadline with its clause display fields, for the digest.
#[derive(Debug, Clone)]
pub struct UpcomingDeadline {
    pub clause_title: String,
    pub clause_ref: Option<String>,
    pub calculated_deadline: NaiveDateTime,
}

/// Compose the weekly summary body: on-time percentage, streak, protected
/// claims dollars, and the next deadlines with severity labels.
pub fn compose_weekly_summary(
    project_name: &str,
    score: Option<&ComplianceScore>,
    upcoming: &[UpcomingDeadline],
    now: NaiveDateTime,
) -> String {
    let percentage = match score {
        Some(s) if s.total_count > 0 => {
            format!("{}%", super::scoring::compute_score_percentage(s.on_time_count, s.total_count))
        }
        _ => "N/A".to_string(),
    };
    let on_time = score.map(|s| s.on_time_count).unwrap_or(0);
    let total = score.map(|s| s.total_count).unwrap_or(0);
    let streak = score.map(|s| s.current_streak).unwrap_or(0);
    let protected = comma_grouped(
        score
            .map(|s| s.protected_claims_value.to_i64().unwrap_or(0))
            .unwrap_or(0),
    );

    let deadline_lines: Vec<String> = upcoming
        .iter()
        .map(|d| {
            let days = days_remaining(d.calculated_deadline, now);
            format!(
                "[{}] {} ({}) — {} days",
                label_for_days_remaining(days),
                d.clause_title,
                d.clause_ref.as_deref().unwrap_or("N/A"),
                days,
            )
        })
        .collect();
    let deadlines_block = if deadline_lines.is_empty() {
        "No upcoming deadlines.".to_string()
    } else {
        deadline_lines.join("\n")
    };

    format!(
        "Weekly Compliance Summary — {project_name}\n\n\
         PERFORMANCE\n\
         - Compliance Score: {percentage} ({on_time}/{total} on time)\n\
         - Current Streak: {streak} consecutive\n\
         - Claims Protected: ${protected}\n\n\
         UPCOMING DEADLINES (Next 14 Days)\n\
         {deadlines_block}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn severity_mapping() {
        assert_eq!(notification_severity(Severity::Critical), "CRITICAL");
        assert_eq!(notification_severity(Severity::Expired), "CRITICAL");
        assert_eq!(notification_severity(Severity::Warning), "WARNING");
        assert_eq!(notification_severity(Severity::Info), "INFO");
        assert_eq!(notification_severity(Severity::Low), "INFO");
    }

    #[test]
    fn remaining_labels() {
        assert_eq!(days_remaining_label(-1), "EXPIRED");
        assert_eq!(days_remaining_label(1), "1 day remaining");
        assert_eq!(days_remaining_label(4), "4 days remaining");
    }

    #[test]
    fn days_remaining_truncates() {
        // 36 hours out is 1 whole day.
        assert_eq!(days_remaining(ts(12, 0), ts(10, 12)), 1);
        assert_eq!(days_remaining(ts(10, 0), ts(12, 0)), -2);
    }

    #[test]
    fn alert_text_shape() {
        let title = alert_title(Severity::Critical, "Claims Procedure");
        assert_eq!(title, "CRITICAL: Claims Procedure");
        let msg = alert_message("2 days remaining", Some("Article 14.2"), "RFI #42 flagged.");
        assert_eq!(msg, "Notice due 2 days remaining — Article 14.2. RFI #42 flagged.");
        let msg = alert_message("EXPIRED", None, "Change event.");
        assert!(msg.contains("N/A"));
    }

    #[test]
    fn comma_grouping() {
        assert_eq!(comma_grouped(0), "0");
        assert_eq!(comma_grouped(950), "950");
        assert_eq!(comma_grouped(50_000), "50,000");
        assert_eq!(comma_grouped(1_250_000), "1,250,000");
        assert_eq!(comma_grouped(-50_000), "-50,000");
    }

    #[test]
    fn weekly_summary_groups_claims_dollars() {
        use rust_decimal::Decimal;
        use uuid::Uuid;

        let created = ts(1, 0);
        let score = ComplianceScore {
            id: Uuid::nil(),
            project_id: Uuid::nil(),
            score: 100,
            details: serde_json::json!({}),
            current_streak: 3,
            best_streak: 3,
            streak_broken_at: None,
            protected_claims_value: Decimal::new(150_000, 0),
            at_risk_value: Decimal::ZERO,
            on_time_count: 3,
            total_count: 3,
            missed_count: 0,
            at_risk_count: 0,
            active_count: 0,
            upcoming_count: 0,
            last_calculated_at: created,
            created_at: created,
        };
        let body = compose_weekly_summary("Summit Tower", Some(&score), &[], ts(10, 8));
        assert!(body.contains("Claims Protected: $150,000"));
        assert!(body.contains("Compliance Score: 100% (3/3 on time)"));
    }

    #[test]
    fn weekly_summary_without_score_or_deadlines() {
        let body = compose_weekly_summary("Summit Tower", None, &[], ts(10, 8));
        assert!(body.contains("Weekly Compliance Summary — Summit Tower"));
        assert!(body.contains("Compliance Score: N/A (0/0 on time)"));
        assert!(body.contains("No upcoming deadlines."));
    }

    #[test]
    fn weekly_summary_lists_deadlines_with_labels() {
        let upcoming = vec![
            UpcomingDeadline {
                clause_title: "Claims Procedure".to_string(),
                clause_ref: Some("Article 14.2".to_string()),
                calculated_deadline: ts(12, 23),
            },
            UpcomingDeadline {
                clause_title: "Notice Requirements".to_string(),
                clause_ref: None,
                calculated_deadline: ts(20, 23),
            },
        ];
        let body = compose_weekly_summary("Summit Tower", None, &upcoming, ts(10, 8));
        assert!(body.contains("[CRITICAL] Claims Procedure (Article 14.2) — 2 days"));
        assert!(body.contains("[INFO] Notice Requirements (N/A) — 10 days"));
    }
}
