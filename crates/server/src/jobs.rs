//! Scheduled background jobs.
//!
//! Three recurring jobs, cron-scheduled in UTC and polled once a minute:
//!   - severity pass, hourly on the hour
//!   - daily score snapshot, 02:00
//!   - weekly digest, Monday 08:00
//!
//! Jobs are idempotent on replay: snapshots upsert on (project, date,
//! period) and the severity pass is a fixed point. A failure in one project
//! is logged and skipped; other projects commit independently.

use chrono::{DateTime, Utc};
use cron::Schedule;
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use shared_types::{AppError, Severity};

use crate::compliance::alerts::{self, PendingAlertEmail, UpcomingDeadline};
use crate::compliance::deadlines::recalculate_severities;
use crate::compliance::{now_utc, scoring};
use crate::email;
use crate::error_convert::sqlx_to_app_error;
use crate::repo;

/// Poll interval for the scheduler loop.
const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Soft limit: a job running longer than this is logged as slow.
const SOFT_LIMIT: Duration = Duration::from_secs(600);

/// Hard limit: a job is aborted past this. Work committed by earlier
/// per-project transactions survives the abort.
const HARD_LIMIT: Duration = Duration::from_secs(660);

const SEVERITY_CRON: &str = "0 0 * * * *";
const DAILY_SNAPSHOT_CRON: &str = "0 0 2 * * *";
const WEEKLY_DIGEST_CRON: &str = "0 0 8 * * Mon";

struct Job {
    name: &'static str,
    schedule: Schedule,
    next_run: Option<DateTime<Utc>>,
}

impl Job {
    fn new(name: &'static str, expression: &str) -> Self {
        let schedule = Schedule::from_str(expression).expect("valid cron expression");
        let next_run = schedule.upcoming(Utc).next();
        Self {
            name,
            schedule,
            next_run,
        }
    }

    fn due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.next_run, Some(next) if next <= now)
    }

    fn advance(&mut self, now: DateTime<Utc>) {
        self.next_run = self.schedule.after(&now).next();
    }
}

/// The background scheduler. Spawn once at startup.
pub struct Scheduler {
    pool: PgPool,
}

impl Scheduler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Spawn the scheduler loop onto the runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut jobs = [
            Job::new("severity_pass", SEVERITY_CRON),
            Job::new("daily_snapshot", DAILY_SNAPSHOT_CRON),
            Job::new("weekly_digest", WEEKLY_DIGEST_CRON),
        ];

        tracing::info!("Scheduler started");
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let now = Utc::now();

            for job in jobs.iter_mut() {
                if !job.due(now) {
                    continue;
                }
                job.advance(now);
                self.run_job(job.name).await;
            }
        }
    }

    async fn run_job(&self, name: &'static str) {
        tracing::info!(job = name, "Running scheduled job");
        let started = std::time::Instant::now();

        let result = tokio::time::timeout(HARD_LIMIT, async {
            match name {
                "severity_pass" => run_severity_pass(&self.pool).await,
                "daily_snapshot" => run_daily_snapshot(&self.pool).await,
                "weekly_digest" => run_weekly_digest(&self.pool).await,
                _ => Ok(()),
            }
        })
        .await;

        let elapsed = started.elapsed();
        match result {
            Ok(Ok(())) => {
                if elapsed > SOFT_LIMIT {
                    tracing::warn!(job = name, elapsed_secs = elapsed.as_secs(), "Job exceeded soft limit");
                } else {
                    tracing::info!(job = name, elapsed_secs = elapsed.as_secs(), "Job completed");
                }
            }
            Ok(Err(e)) => tracing::error!(job = name, error = %e, "Job failed"),
            Err(_) => tracing::error!(job = name, "Job aborted at hard time limit"),
        }
    }
}

/// Hourly: recalculate severities for every project with open deadlines,
/// expire those past due, and alert on CRITICAL/WARNING/EXPIRED changes.
pub async fn run_severity_pass(pool: &PgPool) -> Result<(), AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    let project_ids = repo::deadline::projects_with_open_deadlines(&mut conn).await?;
    drop(conn);

    let mut updated = 0usize;
    let mut expired = 0usize;
    let mut alerts_sent = 0usize;

    for project_id in project_ids {
        match severity_pass_for_project(pool, project_id).await {
            Ok((changed, newly_expired, emails)) => {
                updated += changed;
                expired += newly_expired;
                alerts_sent += emails.len();
                // Emails go out only after the project's transaction commits.
                for pending in emails {
                    email::send_alert_email(
                        &pending.to,
                        &pending.to_name,
                        &pending.title,
                        &pending.message,
                        &pending.deadline_label,
                    )
                    .await;
                }
            }
            Err(e) => {
                tracing::error!(project_id = %project_id, error = %e, "Severity pass failed for project");
            }
        }
    }

    tracing::info!(updated, expired, alerts_sent, "Severity pass completed");
    Ok(())
}

async fn severity_pass_for_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<(usize, usize, Vec<PendingAlertEmail>), AppError> {
    let now = now_utc();
    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    let outcome = recalculate_severities(&mut tx, project_id, now).await?;

    let mut emails = Vec::new();
    if !outcome.changes.is_empty() {
        let users = repo::user::alert_recipients(&mut tx).await?;
        for change in &outcome.changes {
            if matches!(
                change.new_severity,
                Severity::Warning | Severity::Critical | Severity::Expired
            ) {
                emails.extend(
                    alerts::notify_deadline(&mut tx, &change.deadline, change.new_severity, now, &users)
                        .await?,
                );
            }
        }
    }

    tx.commit().await.map_err(sqlx_to_app_error)?;
    Ok((outcome.changed, outcome.expired, emails))
}

/// Daily 02:00 UTC: a `daily` score history snapshot per project,
/// snapshot date pinned to the start of the UTC day.
pub async fn run_daily_snapshot(pool: &PgPool) -> Result<(), AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    let project_ids = repo::project::all_ids(&mut conn).await?;
    drop(conn);

    let mut count = 0usize;
    for project_id in project_ids {
        let result = async {
            let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;
            scoring::create_snapshot(&mut tx, project_id, "daily", now_utc()).await?;
            tx.commit().await.map_err(sqlx_to_app_error)
        }
        .await;

        match result {
            Ok(()) => count += 1,
            Err(e) => {
                tracing::error!(project_id = %project_id, error = %e, "Daily snapshot failed for project")
            }
        }
    }

    tracing::info!(projects = count, "Daily snapshot completed");
    Ok(())
}

/// Monday 08:00 UTC: weekly summary emails plus a `weekly` snapshot per
/// project.
pub async fn run_weekly_digest(pool: &PgPool) -> Result<(), AppError> {
    let mut conn = pool.acquire().await.map_err(sqlx_to_app_error)?;
    let projects = repo::project::all(&mut conn).await?;
    let users = repo::user::alert_recipients(&mut conn).await?;
    drop(conn);

    let mut count = 0usize;
    for project in projects {
        match weekly_digest_for_project(pool, &project).await {
            Ok(body) => {
                for user in &users {
                    email::send_weekly_summary_email(&user.email, &user.name, &project.name, &body)
                        .await;
                }
                count += 1;
            }
            Err(e) => {
                tracing::error!(project_id = %project.id, error = %e, "Weekly digest failed for project")
            }
        }
    }

    tracing::info!(projects = count, "Weekly digest completed");
    Ok(())
}

async fn weekly_digest_for_project(
    pool: &PgPool,
    project: &shared_types::Project,
) -> Result<String, AppError> {
    let now = now_utc();
    let mut tx = pool.begin().await.map_err(sqlx_to_app_error)?;

    scoring::create_snapshot(&mut tx, project.id, "weekly", now).await?;

    let score = repo::score::get(&mut tx, project.id).await?;
    let cutoff = now + chrono::Duration::days(14);
    let deadlines = repo::deadline::upcoming_within(&mut tx, project.id, cutoff, 10).await?;

    let mut upcoming = Vec::with_capacity(deadlines.len());
    for deadline in &deadlines {
        let clause = repo::clause::find_by_id(&mut tx, project.id, deadline.clause_id).await?;
        upcoming.push(UpcomingDeadline {
            clause_title: clause
                .as_ref()
                .map(|c| c.title.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            clause_ref: clause.and_then(|c| c.section_ref),
            calculated_deadline: deadline.calculated_deadline,
        });
    }

    tx.commit().await.map_err(sqlx_to_app_error)?;

    Ok(alerts::compose_weekly_summary(
        &project.name,
        score.as_ref(),
        &upcoming,
        now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Weekday};

    #[test]
    fn cron_expressions_parse() {
        for expr in [SEVERITY_CRON, DAILY_SNAPSHOT_CRON, WEEKLY_DIGEST_CRON] {
            assert!(Schedule::from_str(expr).is_ok(), "bad expression: {expr}");
        }
    }

    #[test]
    fn severity_fires_on_the_hour() {
        let schedule = Schedule::from_str(SEVERITY_CRON).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 10, 11, 30, 0).unwrap();
        let next = schedule.after(&after).next().unwrap();
        assert_eq!(next.minute(), 0);
        assert_eq!(next.hour(), 12);
    }

    #[test]
    fn daily_snapshot_fires_at_two() {
        let schedule = Schedule::from_str(DAILY_SNAPSHOT_CRON).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 10, 3, 0, 0).unwrap();
        let next = schedule.after(&after).next().unwrap();
        assert_eq!(next.hour(), 2);
        assert_eq!(next.day(), 11);
    }

    #[test]
    fn weekly_digest_fires_monday_morning() {
        let schedule = Schedule::from_str(WEEKLY_DIGEST_CRON).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(); // a Monday, post-fire
        let next = schedule.after(&after).next().unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!(next.hour(), 8);
        assert_eq!(next.day(), 17);
    }

    #[test]
    fn job_due_and_advance() {
        let mut job = Job::new("severity_pass", SEVERITY_CRON);
        let next = job.next_run.unwrap();
        assert!(!job.due(next - chrono::Duration::seconds(1)));
        assert!(job.due(next));
        job.advance(next);
        assert!(job.next_run.unwrap() > next);
    }
}
