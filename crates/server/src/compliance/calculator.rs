//! Deadline date calculation.
//!
//! Turns a trigger instant plus clause parameters (count, unit, optional
//! cure period) into concrete deadline timestamps. Day-based deadlines land
//! at 23:59:59 UTC of the computed date so any action taken during the
//! deadline day counts as on time; hour-based deadlines are exact instants.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::PgConnection;
use std::collections::HashSet;
use uuid::Uuid;

use shared_types::{AppError, DeadlineType, Severity};

use super::calendar::{add_business_days, add_calendar_days, add_hours, holidays_in_range};
use super::severity::classify_severity;

/// Result of a deadline calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedDeadline {
    pub deadline: NaiveDateTime,
    pub severity: Severity,
    pub cure_deadline: Option<NaiveDateTime>,
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).expect("valid end-of-day time"))
}

/// Pure deadline computation over an explicit holiday set.
pub fn compute_deadline(
    trigger_at: NaiveDateTime,
    deadline_days: i32,
    deadline_type: DeadlineType,
    cure_period_days: Option<i32>,
    cure_period_type: Option<DeadlineType>,
    holidays: &HashSet<NaiveDate>,
    now: NaiveDateTime,
) -> CalculatedDeadline {
    let trigger_date = trigger_at.date();

    let deadline = match deadline_type {
        DeadlineType::BusinessDays => {
            end_of_day(add_business_days(trigger_date, deadline_days as i64, holidays))
        }
        DeadlineType::Hours => add_hours(trigger_at, deadline_days as i64),
        DeadlineType::CalendarDays => {
            end_of_day(add_calendar_days(trigger_date, deadline_days as i64))
        }
    };

    let cure_deadline = match (cure_period_days, cure_period_type) {
        (Some(days), Some(cure_type)) if days > 0 => Some(match cure_type {
            DeadlineType::BusinessDays => {
                end_of_day(add_business_days(deadline.date(), days as i64, holidays))
            }
            DeadlineType::Hours => add_hours(deadline, days as i64),
            DeadlineType::CalendarDays => {
                end_of_day(add_calendar_days(deadline.date(), days as i64))
            }
        }),
        _ => None,
    };

    let severity = classify_severity(deadline, now, None);

    CalculatedDeadline {
        deadline,
        severity,
        cure_deadline,
    }
}

/// Compute a deadline using the project's holiday set as of now.
///
/// Later holiday edits never rewrite deadlines computed earlier.
pub async fn calculate_deadline(
    conn: &mut PgConnection,
    project_id: Uuid,
    trigger_at: NaiveDateTime,
    deadline_days: i32,
    deadline_type: DeadlineType,
    cure_period_days: Option<i32>,
    cure_period_type: Option<DeadlineType>,
    now: NaiveDateTime,
) -> Result<CalculatedDeadline, AppError> {
    if deadline_days < 0 {
        return Err(AppError::bad_request("deadlineDays must not be negative"));
    }

    let holidays = holidays_in_range(conn, project_id, trigger_at.date(), None).await?;

    Ok(compute_deadline(
        trigger_at,
        deadline_days,
        deadline_type,
        cure_period_days,
        cure_period_type,
        &holidays,
        now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::calendar::federal_holidays;
    use pretty_assertions::assert_eq;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn holidays_2025() -> HashSet<NaiveDate> {
        federal_holidays(2025).into_iter().collect()
    }

    #[test]
    fn calendar_days_land_at_end_of_day() {
        // Ten calendar days from 2025-03-10T12:00 ends 2025-03-20 23:59:59.
        let calc = compute_deadline(
            ts(2025, 3, 10, 12, 0),
            10,
            DeadlineType::CalendarDays,
            None,
            None,
            &HashSet::new(),
            ts(2025, 3, 10, 12, 0),
        );
        let expected = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap().and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(calc.deadline, expected);
        assert_eq!(calc.severity, Severity::Info);
        assert_eq!(calc.cure_deadline, None);
    }

    #[test]
    fn business_days_skip_holiday_weekend() {
        // Trigger Tue 2025-07-01, 3 business days, 7/4 is a holiday:
        // lands Monday 2025-07-07 at end of day.
        let calc = compute_deadline(
            ts(2025, 7, 1, 9, 0),
            3,
            DeadlineType::BusinessDays,
            None,
            None,
            &holidays_2025(),
            ts(2025, 7, 1, 9, 0),
        );
        assert_eq!(calc.deadline.date(), NaiveDate::from_ymd_opt(2025, 7, 7).unwrap());
        assert_eq!(calc.deadline.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn hours_deadline_is_exact_instant() {
        // 24 hours from Friday noon is Saturday noon, weekend or not.
        let calc = compute_deadline(
            ts(2025, 3, 14, 12, 0),
            24,
            DeadlineType::Hours,
            None,
            None,
            &HashSet::new(),
            ts(2025, 3, 14, 12, 0),
        );
        assert_eq!(calc.deadline, ts(2025, 3, 15, 12, 0));
    }

    #[test]
    fn cure_period_computed_from_primary_deadline() {
        let calc = compute_deadline(
            ts(2025, 3, 10, 12, 0),
            10,
            DeadlineType::CalendarDays,
            Some(5),
            Some(DeadlineType::CalendarDays),
            &HashSet::new(),
            ts(2025, 3, 10, 12, 0),
        );
        let cure = calc.cure_deadline.unwrap();
        assert_eq!(cure.date(), NaiveDate::from_ymd_opt(2025, 3, 25).unwrap());
        assert_eq!(cure.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn cure_period_requires_both_fields() {
        let calc = compute_deadline(
            ts(2025, 3, 10, 12, 0),
            10,
            DeadlineType::CalendarDays,
            Some(5),
            None,
            &HashSet::new(),
            ts(2025, 3, 10, 12, 0),
        );
        assert_eq!(calc.cure_deadline, None);
    }

    #[test]
    fn severity_reflects_distance_at_creation() {
        let now = ts(2025, 3, 10, 12, 0);
        let close = compute_deadline(now, 2, DeadlineType::CalendarDays, None, None, &HashSet::new(), now);
        assert_eq!(close.severity, Severity::Critical);

        let far = compute_deadline(now, 30, DeadlineType::CalendarDays, None, None, &HashSet::new(), now);
        assert_eq!(far.severity, Severity::Low);
    }
}
