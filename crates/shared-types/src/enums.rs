//! Closed enum sets for compliance entities.
//!
//! String-typed columns are validated against these sets on ingest; unknown
//! values are rejected at the boundary. `Severity` and `DeadlineType` are
//! real enums because engine logic branches and orders on them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contract clause kinds the extractor is allowed to produce.
pub const CLAUSE_KINDS: &[&str] = &[
    "PAYMENT_TERMS",
    "CHANGE_ORDER_PROCESS",
    "CLAIMS_PROCEDURE",
    "DISPUTE_RESOLUTION",
    "NOTICE_REQUIREMENTS",
    "RETENTION",
    "WARRANTY",
    "INSURANCE",
    "INDEMNIFICATION",
    "TERMINATION",
    "FORCE_MAJEURE",
    "LIQUIDATED_DAMAGES",
    "SCHEDULE",
    "SAFETY",
    "GENERAL_CONDITIONS",
    "SUPPLEMENTARY_CONDITIONS",
];

pub fn is_valid_clause_kind(s: &str) -> bool {
    CLAUSE_KINDS.contains(&s)
}

/// Notice delivery methods a clause can require.
pub const NOTICE_METHODS: &[&str] = &[
    "WRITTEN_NOTICE",
    "CERTIFIED_MAIL",
    "EMAIL",
    "HAND_DELIVERY",
    "REGISTERED_MAIL",
];

pub fn is_valid_notice_method(s: &str) -> bool {
    NOTICE_METHODS.contains(&s)
}

/// How a clause's deadline count is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum DeadlineType {
    #[serde(rename = "CALENDAR_DAYS")]
    CalendarDays,
    #[serde(rename = "BUSINESS_DAYS")]
    BusinessDays,
    #[serde(rename = "HOURS")]
    Hours,
}

impl DeadlineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineType::CalendarDays => "CALENDAR_DAYS",
            DeadlineType::BusinessDays => "BUSINESS_DAYS",
            DeadlineType::Hours => "HOURS",
        }
    }

    /// Human-readable unit for trigger descriptions ("calendar days").
    pub fn unit_label(&self) -> &'static str {
        match self {
            DeadlineType::CalendarDays => "calendar days",
            DeadlineType::BusinessDays => "business days",
            DeadlineType::Hours => "hours",
        }
    }
}

impl FromStr for DeadlineType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CALENDAR_DAYS" => Ok(DeadlineType::CalendarDays),
            "BUSINESS_DAYS" => Ok(DeadlineType::BusinessDays),
            "HOURS" => Ok(DeadlineType::Hours),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DeadlineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_valid_deadline_type(s: &str) -> bool {
    DeadlineType::from_str(s).is_ok()
}

/// Deadline lifecycle states.
pub const DEADLINE_STATUSES: &[&str] = &[
    "ACTIVE",
    "NOTICE_DRAFTED",
    "NOTICE_SENT",
    "COMPLETED",
    "ACKNOWLEDGED",
    "WAIVED",
    "EXPIRED",
];

/// Statuses the hourly severity pass operates on.
pub const DEADLINE_OPEN_STATUSES: &[&str] = &["ACTIVE", "NOTICE_DRAFTED"];

pub fn is_valid_deadline_status(s: &str) -> bool {
    DEADLINE_STATUSES.contains(&s)
}

/// Urgency band for a deadline, totally ordered for escalation checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Severity {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "CRITICAL")]
    Critical,
    #[serde(rename = "EXPIRED")]
    Expired,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Expired => "EXPIRED",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Severity::Low),
            "INFO" => Ok(Severity::Info),
            "WARNING" => Ok(Severity::Warning),
            "CRITICAL" => Ok(Severity::Critical),
            "EXPIRED" => Ok(Severity::Expired),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_valid_severity(s: &str) -> bool {
    Severity::from_str(s).is_ok()
}

/// Events that can start a compliance clock.
pub const TRIGGER_EVENT_TYPES: &[&str] = &[
    "RFI",
    "CHANGE_ORDER",
    "MANUAL",
    "DOCUMENT_RECEIVED",
    "OTHER",
];

pub fn is_valid_trigger_event_type(s: &str) -> bool {
    TRIGGER_EVENT_TYPES.contains(&s)
}

/// Notice lifecycle states.
pub const NOTICE_STATUSES: &[&str] = &["DRAFT", "PENDING_REVIEW", "SENT", "ACKNOWLEDGED"];

/// Statuses in which a notice's content and recipients may still change,
/// and from which it may be sent or deleted.
pub const NOTICE_EDITABLE_STATUSES: &[&str] = &["DRAFT", "PENDING_REVIEW"];

pub fn is_valid_notice_status(s: &str) -> bool {
    NOTICE_STATUSES.contains(&s)
}

pub fn is_notice_editable(status: &str) -> bool {
    NOTICE_EDITABLE_STATUSES.contains(&status)
}

/// Kinds of formal notice the engine drafts.
pub const NOTICE_TYPES: &[&str] = &[
    "CHANGE_ORDER_NOTICE",
    "CLAIM_NOTICE",
    "DELAY_NOTICE",
    "DIFFERING_CONDITIONS_NOTICE",
    "CURE_NOTICE",
    "GENERAL_NOTICE",
];

pub fn is_valid_notice_type(s: &str) -> bool {
    NOTICE_TYPES.contains(&s)
}

/// Score history snapshot granularities.
pub const PERIOD_TYPES: &[&str] = &["daily", "weekly", "monthly"];

pub fn is_valid_period_type(s: &str) -> bool {
    PERIOD_TYPES.contains(&s)
}

/// Roles that receive deadline alerts and weekly summaries.
pub const ALERT_ROLES: &[&str] = &["ADMIN", "PROJECT_MANAGER", "EXECUTIVE"];

/// Canonical keys for the notice `deliveryConfirmation` map.
///
/// Accepts raw method names in any casing with or without underscores
/// ("CERTIFIED_MAIL", "certifiedMail", "certified mail") and returns the
/// canonical camelCase key, or None for unknown methods.
pub fn canonical_delivery_method(method: &str) -> Option<&'static str> {
    let folded: String = method
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    match folded.as_str() {
        "email" => Some("email"),
        "certifiedmail" => Some("certifiedMail"),
        "registeredmail" => Some("registeredMail"),
        "handdelivery" => Some("handDelivery"),
        "fax" => Some("fax"),
        "courier" => Some("courier"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_order_escalates() {
        assert!(Severity::Low < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert!(Severity::Critical < Severity::Expired);
    }

    #[test]
    fn severity_roundtrip() {
        for s in SEVERITIES_ALL {
            let parsed: Severity = s.parse().unwrap();
            assert_eq!(parsed.as_str(), *s);
        }
        assert!(Severity::from_str("URGENT").is_err());
    }

    const SEVERITIES_ALL: &[&str] = &["LOW", "INFO", "WARNING", "CRITICAL", "EXPIRED"];

    #[test]
    fn deadline_type_roundtrip() {
        assert_eq!(DeadlineType::from_str("BUSINESS_DAYS").unwrap(), DeadlineType::BusinessDays);
        assert_eq!(DeadlineType::BusinessDays.unit_label(), "business days");
        assert!(DeadlineType::from_str("WEEKS").is_err());
    }

    #[test]
    fn unknown_enum_values_rejected() {
        assert!(!is_valid_clause_kind("HANDSHAKE_DEAL"));
        assert!(!is_valid_trigger_event_type("rfi"));
        assert!(!is_valid_notice_status("MAILED"));
        assert!(!is_valid_period_type("hourly"));
        assert!(is_valid_clause_kind("CLAIMS_PROCEDURE"));
        assert!(is_valid_trigger_event_type("CHANGE_ORDER"));
    }

    #[test]
    fn editable_statuses() {
        assert!(is_notice_editable("DRAFT"));
        assert!(is_notice_editable("PENDING_REVIEW"));
        assert!(!is_notice_editable("SENT"));
        assert!(!is_notice_editable("ACKNOWLEDGED"));
    }

    #[test]
    fn delivery_method_canonicalization() {
        assert_eq!(canonical_delivery_method("CERTIFIED_MAIL"), Some("certifiedMail"));
        assert_eq!(canonical_delivery_method("certifiedMail"), Some("certifiedMail"));
        assert_eq!(canonical_delivery_method("hand delivery"), Some("handDelivery"));
        assert_eq!(canonical_delivery_method("EMAIL"), Some("email"));
        assert_eq!(canonical_delivery_method("carrier pigeon"), None);
    }
}
