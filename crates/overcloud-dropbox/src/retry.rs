//! Retry handling for Dropbox HTTP 429 responses
//!
//! Dropbox answers rate-limited calls with `429 Too Many Requests` and a
//! `Retry-After` header. The client sleeps for that long and tries again,
//! up to a bounded number of attempts.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::warn;

/// Default retry-after duration when the header is missing
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Maximum number of retries after a 429 response
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Longest wait accepted from an HTTP-date `Retry-After` value
const MAX_DATE_WAIT_SECS: u64 = 3600;

/// Parses a Retry-After header value into a Duration.
///
/// The header can be either:
/// - An integer number of seconds (e.g., "30")
/// - An HTTP-date (e.g., "Fri, 31 Dec 2027 23:59:59 GMT") - parsed as seconds from now
///
/// Falls back to the default duration if parsing fails.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            if let Some(secs) = (target - now)
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= MAX_DATE_WAIT_SECS)
            {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

/// Reads the wait time from a response's headers
pub fn retry_delay(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
        .unwrap_or(DEFAULT_RETRY_AFTER)
}
