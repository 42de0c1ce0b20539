//! Federal holidays and business-day arithmetic.
//!
//! Holiday sets are the union of a compiled-in US federal table (with
//! observed-day adjustments) and per-project overrides. All date math is
//! pure over an explicit holiday set so boundary cases are testable without
//! a database.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use sqlx::PgConnection;
use std::collections::HashSet;
use uuid::Uuid;

use shared_types::AppError;

use crate::error_convert::SqlxErrorExt;

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid holiday table date")
}

/// US federal holidays, observed dates. Years outside the table contribute
/// no federal holidays.
pub fn federal_holidays(year: i32) -> Vec<NaiveDate> {
    match year {
        2025 => vec![
            d(2025, 1, 1),   // New Year's Day
            d(2025, 1, 20),  // MLK Jr. Day
            d(2025, 2, 17),  // Presidents' Day
            d(2025, 5, 26),  // Memorial Day
            d(2025, 6, 19),  // Juneteenth
            d(2025, 7, 4),   // Independence Day
            d(2025, 9, 1),   // Labor Day
            d(2025, 10, 13), // Columbus Day
            d(2025, 11, 11), // Veterans Day
            d(2025, 11, 27), // Thanksgiving
            d(2025, 12, 25), // Christmas
        ],
        2026 => vec![
            d(2026, 1, 1),
            d(2026, 1, 19),
            d(2026, 2, 16),
            d(2026, 5, 25),
            d(2026, 6, 19),
            d(2026, 7, 3), // Independence Day (observed)
            d(2026, 9, 7),
            d(2026, 10, 12),
            d(2026, 11, 11),
            d(2026, 11, 26),
            d(2026, 12, 25),
        ],
        2027 => vec![
            d(2027, 1, 1),
            d(2027, 1, 18),
            d(2027, 2, 15),
            d(2027, 5, 31),
            d(2027, 6, 18), // Juneteenth (observed)
            d(2027, 7, 5),  // Independence Day (observed)
            d(2027, 9, 6),
            d(2027, 10, 11),
            d(2027, 11, 11),
            d(2027, 11, 25),
            d(2027, 12, 24), // Christmas (observed)
        ],
        _ => Vec::new(),
    }
}

/// A date is a business day when it is a weekday and not a holiday.
pub fn is_business_day(date: NaiveDate, holidays: &HashSet<NaiveDate>) -> bool {
    date.weekday() != Weekday::Sat && date.weekday() != Weekday::Sun && !holidays.contains(&date)
}

/// Add `days` calendar days.
pub fn add_calendar_days(start: NaiveDate, days: i64) -> NaiveDate {
    start + Duration::days(days)
}

/// Add `days` business days, skipping weekends and holidays. Zero returns
/// the start unchanged; negative counts are rejected at the boundary before
/// this is called.
pub fn add_business_days(start: NaiveDate, days: i64, holidays: &HashSet<NaiveDate>) -> NaiveDate {
    let mut current = start;
    let mut remaining = days;
    while remaining > 0 {
        current += Duration::days(1);
        if is_business_day(current, holidays) {
            remaining -= 1;
        }
    }
    current
}

/// Add `hours` hours. No weekend or holiday adjustment.
pub fn add_hours(start: NaiveDateTime, hours: i64) -> NaiveDateTime {
    start + Duration::hours(hours)
}

/// Count business days between two dates, exclusive of start and inclusive
/// of end.
pub fn count_business_days_between(
    start: NaiveDate,
    end: NaiveDate,
    holidays: &HashSet<NaiveDate>,
) -> i64 {
    let mut count = 0;
    let mut current = start;
    while current < end {
        current += Duration::days(1);
        if is_business_day(current, holidays) {
            count += 1;
        }
    }
    count
}

/// Combined federal + project holiday set spanning every year touched by
/// `[start, end]`. `end` defaults to the year after `start` so forward
/// walks have headroom.
pub async fn holidays_in_range(
    conn: &mut PgConnection,
    project_id: Uuid,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<HashSet<NaiveDate>, AppError> {
    let mut holidays: HashSet<NaiveDate> = HashSet::new();

    let start_year = start.year();
    let end_year = end.map(|e| e.year()).unwrap_or(start_year + 1);
    for year in start_year..=end_year {
        holidays.extend(federal_holidays(year));
    }

    let mut query = String::from("SELECT date FROM project_holidays WHERE project_id = $1 AND date >= $2");
    if end.is_some() {
        query.push_str(" AND date <= $3");
    }
    let mut q = sqlx::query_scalar::<_, NaiveDate>(&query)
        .bind(project_id)
        .bind(start);
    if let Some(end) = end {
        q = q.bind(end);
    }
    let project_dates = q
        .fetch_all(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    holidays.extend(project_dates);
    Ok(holidays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_holidays() -> HashSet<NaiveDate> {
        HashSet::new()
    }

    #[test]
    fn friday_plus_one_business_day_is_monday() {
        let friday = d(2025, 3, 14);
        assert_eq!(add_business_days(friday, 1, &no_holidays()), d(2025, 3, 17));
    }

    #[test]
    fn friday_plus_one_skips_holiday_monday() {
        let friday = d(2025, 3, 14);
        let holidays: HashSet<NaiveDate> = [d(2025, 3, 17)].into_iter().collect();
        assert_eq!(add_business_days(friday, 1, &holidays), d(2025, 3, 18));
    }

    #[test]
    fn zero_business_days_returns_start() {
        let start = d(2025, 3, 15); // a Saturday; zero-add must not move it
        assert_eq!(add_business_days(start, 0, &no_holidays()), start);
    }

    #[test]
    fn three_business_days_over_july_fourth() {
        // Trigger Tue 7/1: Wed 7/2 (1), Thu 7/3 (2), Fri 7/4 holiday,
        // weekend, Mon 7/7 (3).
        let holidays: HashSet<NaiveDate> = federal_holidays(2025).into_iter().collect();
        assert_eq!(add_business_days(d(2025, 7, 1), 3, &holidays), d(2025, 7, 7));
    }

    #[test]
    fn project_holiday_extends_walk() {
        // Same walk with Monday 7/7 also a project holiday lands Tue 7/8.
        let mut holidays: HashSet<NaiveDate> = federal_holidays(2025).into_iter().collect();
        holidays.insert(d(2025, 7, 7));
        assert_eq!(add_business_days(d(2025, 7, 1), 3, &holidays), d(2025, 7, 8));
    }

    #[test]
    fn calendar_days_ignore_weekends() {
        assert_eq!(add_calendar_days(d(2025, 3, 14), 2), d(2025, 3, 16));
    }

    #[test]
    fn hours_ignore_weekends() {
        // Friday noon + 24h = Saturday noon.
        let friday_noon = d(2025, 3, 14).and_hms_opt(12, 0, 0).unwrap();
        let saturday_noon = d(2025, 3, 15).and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(add_hours(friday_noon, 24), saturday_noon);
    }

    #[test]
    fn business_day_checks() {
        let holidays: HashSet<NaiveDate> = federal_holidays(2025).into_iter().collect();
        assert!(is_business_day(d(2025, 3, 14), &holidays)); // Friday
        assert!(!is_business_day(d(2025, 3, 15), &holidays)); // Saturday
        assert!(!is_business_day(d(2025, 7, 4), &holidays)); // Independence Day
    }

    #[test]
    fn count_business_days_matches_add() {
        let holidays: HashSet<NaiveDate> = federal_holidays(2025).into_iter().collect();
        for days in 1..=15 {
            let start = d(2025, 6, 30);
            let end = add_business_days(start, days, &holidays);
            assert_eq!(count_business_days_between(start, end, &holidays), days);
        }
    }

    #[test]
    fn federal_table_covers_2025_to_2027() {
        assert_eq!(federal_holidays(2025).len(), 11);
        assert_eq!(federal_holidays(2026).len(), 11);
        assert_eq!(federal_holidays(2027).len(), 11);
        assert!(federal_holidays(2024).is_empty());
    }

    #[test]
    fn observed_dates_are_weekdays() {
        for year in 2025..=2027 {
            for holiday in federal_holidays(year) {
                assert_ne!(holiday.weekday(), Weekday::Sat, "{holiday} observed on Saturday");
                assert_ne!(holiday.weekday(), Weekday::Sun, "{holiday} observed on Sunday");
            }
        }
    }
}
