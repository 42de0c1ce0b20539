pub mod alerts;
pub mod calculator;
pub mod calendar;
pub mod deadlines;
pub mod extractor;
pub mod notices;
pub mod prompts;
pub mod scoring;
pub mod severity;
pub mod triggers;

use chrono::{NaiveDateTime, Utc};

/// Current UTC time, offset-naive — the single clock for the compliance
/// core. Everything persisted is UTC without offset.
pub fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}
