use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Success envelope: every 2xx body is `{ "data": … }`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Format an offset-naive UTC timestamp for API responses.
///
/// All persisted timestamps are UTC without offset; responses render them in
/// ISO-8601 without a zone suffix, matching what was stored.
pub fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn fmt_ts_opt(ts: Option<NaiveDateTime>) -> Option<String> {
    ts.map(fmt_ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn timestamp_formatting_has_no_offset() {
        let ts = NaiveDate::from_ymd_opt(2025, 3, 20)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(fmt_ts(ts), "2025-03-20T23:59:59");
        assert_eq!(fmt_ts_opt(None), None);
    }
}
