//! Deadline severity classification.
//!
//! Bands by time remaining:
//!   EXPIRED:  past deadline
//!   CRITICAL: <= 3 days remaining
//!   WARNING:  3-7 days remaining
//!   INFO:     7-14 days remaining
//!   LOW:      > 14 days remaining

use chrono::NaiveDateTime;

use shared_types::Severity;

/// Thresholds in days.
const CRITICAL_THRESHOLD_DAYS: f64 = 3.0;
const WARNING_THRESHOLD_DAYS: f64 = 7.0;
const INFO_THRESHOLD_DAYS: f64 = 14.0;

/// Classify a deadline's severity from the time remaining.
///
/// Terminal statuses (COMPLETED, WAIVED, NOTICE_SENT) classify LOW
/// regardless of the clock.
pub fn classify_severity(
    deadline: NaiveDateTime,
    now: NaiveDateTime,
    status: Option<&str>,
) -> Severity {
    if matches!(status, Some("COMPLETED") | Some("WAIVED") | Some("NOTICE_SENT")) {
        return Severity::Low;
    }

    if deadline <= now {
        return Severity::Expired;
    }

    let days_remaining = (deadline - now).num_seconds() as f64 / 86_400.0;

    if days_remaining <= CRITICAL_THRESHOLD_DAYS {
        Severity::Critical
    } else if days_remaining <= WARNING_THRESHOLD_DAYS {
        Severity::Warning
    } else if days_remaining <= INFO_THRESHOLD_DAYS {
        Severity::Info
    } else {
        Severity::Low
    }
}

/// Whether a severity change is an escalation (more urgent than before).
pub fn severity_escalated(old: Severity, new: Severity) -> bool {
    new > old
}

/// Severity label for a days-remaining count, used when composing digests.
pub fn label_for_days_remaining(days: i64) -> &'static str {
    if days <= CRITICAL_THRESHOLD_DAYS as i64 {
        "CRITICAL"
    } else if days <= WARNING_THRESHOLD_DAYS as i64 {
        "WARNING"
    } else {
        "INFO"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn bands_by_days_remaining() {
        let now = ts(2025, 3, 10, 12);
        assert_eq!(classify_severity(now + Duration::days(2), now, None), Severity::Critical);
        assert_eq!(classify_severity(now + Duration::days(5), now, None), Severity::Warning);
        assert_eq!(classify_severity(now + Duration::days(9), now, None), Severity::Info);
        assert_eq!(classify_severity(now + Duration::days(30), now, None), Severity::Low);
    }

    #[test]
    fn deadline_equal_to_now_is_expired() {
        let now = ts(2025, 3, 10, 12);
        assert_eq!(classify_severity(now, now, None), Severity::Expired);
        assert_eq!(classify_severity(now - Duration::hours(1), now, None), Severity::Expired);
    }

    #[test]
    fn band_edges_are_inclusive() {
        let now = ts(2025, 3, 10, 12);
        assert_eq!(classify_severity(now + Duration::days(3), now, None), Severity::Critical);
        assert_eq!(classify_severity(now + Duration::days(7), now, None), Severity::Warning);
        assert_eq!(classify_severity(now + Duration::days(14), now, None), Severity::Info);
    }

    #[test]
    fn fractional_days_classify() {
        let now = ts(2025, 3, 10, 12);
        // 3 days and one hour remaining sits just past the CRITICAL edge.
        let deadline = now + Duration::days(3) + Duration::hours(1);
        assert_eq!(classify_severity(deadline, now, None), Severity::Warning);
    }

    #[test]
    fn terminal_statuses_classify_low() {
        let now = ts(2025, 3, 10, 12);
        let overdue = now - Duration::days(5);
        for status in ["COMPLETED", "WAIVED", "NOTICE_SENT"] {
            assert_eq!(classify_severity(overdue, now, Some(status)), Severity::Low);
        }
        assert_eq!(classify_severity(overdue, now, Some("ACTIVE")), Severity::Expired);
    }

    #[test]
    fn escalation_follows_order() {
        assert!(severity_escalated(Severity::Info, Severity::Warning));
        assert!(severity_escalated(Severity::Critical, Severity::Expired));
        assert!(!severity_escalated(Severity::Warning, Severity::Info));
        assert!(!severity_escalated(Severity::Warning, Severity::Warning));
    }

    #[test]
    fn digest_labels() {
        assert_eq!(label_for_days_remaining(1), "CRITICAL");
        assert_eq!(label_for_days_remaining(3), "CRITICAL");
        assert_eq!(label_for_days_remaining(6), "WARNING");
        assert_eq!(label_for_days_remaining(10), "INFO");
    }
}
