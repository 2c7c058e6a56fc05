//! Time utilities for request signing.

/// DateTime in UTC, the only zone signing operates in.
pub type DateTime = chrono::DateTime<chrono::Utc>;

/// Return the current UTC time.
pub fn now() -> DateTime {
    chrono::Utc::now()
}

/// Format a time into the scope date: "20220313"
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format a time into compact ISO 8601: "20220313T072004Z"
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}
