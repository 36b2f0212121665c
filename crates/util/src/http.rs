//! # HTTP Utilities
//!
//! Helpers shared by the API clients for interpreting responses: status hints,
//! rate-limit back-off and pagination cursors.

use std::time::Duration;

use serde_json::Value;

/// Longest back-off honored for a rate-limited request.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Back-off used when a 429 response carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Return a user-friendly error message for common HTTP status codes.
///
/// # Example
/// ```rust
/// use bookcheck_util::http::status_error_message;
///
/// let error_401 = status_error_message(401).unwrap();
/// assert!(error_401.contains("Unauthorized"));
/// assert!(status_error_message(404).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: check CALENDLY_TOKEN / SLACK_BOT_TOKEN".into()),
        403 => Some("Forbidden (403). Hint: the token lacks the scope required for this call".into()),
        429 => Some("Too Many Requests (429). Hint: the API rate limit was exceeded".into()),
        _ => None,
    }
}

/// Parse a `Retry-After` header given in whole seconds.
///
/// Missing or unparsable values fall back to [`DEFAULT_RETRY_AFTER`]; the
/// result never exceeds [`MAX_RETRY_AFTER`].
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use bookcheck_util::http::retry_after_delay;
///
/// assert_eq!(retry_after_delay(Some("3")), Duration::from_secs(3));
/// assert_eq!(retry_after_delay(Some("600")), Duration::from_secs(30));
/// assert_eq!(retry_after_delay(None), Duration::from_secs(1));
/// ```
pub fn retry_after_delay(header: Option<&str>) -> Duration {
    header
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
        .min(MAX_RETRY_AFTER)
}

/// Extract Calendly's `pagination.next_page` URL, if another page exists.
pub fn calendly_next_page(body: &Value) -> Option<String> {
    body.pointer("/pagination/next_page")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// Extract Slack's `response_metadata.next_cursor`, if another page exists.
pub fn slack_next_cursor(body: &Value) -> Option<String> {
    body.pointer("/response_metadata/next_cursor")
        .and_then(Value::as_str)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_string)
}
