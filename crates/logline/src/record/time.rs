//! Time: parses the `%t` access-log timestamp.

use chrono::{DateTime, FixedOffset};

/// `%t` after its date/time separator has been replaced by a space.
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y %H:%M:%S %z";

/// Parse an access-log timestamp such as `07/Feb/2016:07:39:42 +0900`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let normalized = raw.replacen(':', " ", 1);
    DateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT).ok()
}
