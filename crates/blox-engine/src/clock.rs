use chrono::{SecondsFormat, Utc};

/// RFC 3339 UTC timestamp with millisecond precision, as stored in sessions and events.
pub fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
