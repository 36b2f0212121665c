use bookcheck_types::ServiceId;
use bookcheck_util::{http::status_error_message, redact_sensitive};

/// Longest slice of a response body kept in an error message.
const MAX_BODY_CHARS: usize = 500;

/// Errors from the Calendly and Slack API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("{service} API error ({status}): {body}")]
    Status { service: ServiceId, status: u16, body: String },

    /// Slack answered 200 with `"ok": false`.
    #[error("Slack {method} failed: {error}")]
    Slack { method: String, error: String },

    /// The response body did not have the expected shape.
    #[error("could not decode {service} response: {message}")]
    Decode { service: ServiceId, message: String },

    /// The client could not be configured or a URL was rejected.
    #[error("invalid API configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Build a status error, preferring a hint for well-known codes and
    /// otherwise keeping a redacted, truncated copy of the body.
    pub fn status(service: ServiceId, status: u16, body: &str) -> Self {
        let body = match status_error_message(status) {
            Some(hint) => hint,
            None => redact_sensitive(body).chars().take(MAX_BODY_CHARS).collect(),
        };
        Self::Status { service, status, body }
    }

    pub fn decode(service: ServiceId, message: impl ToString) -> Self {
        Self::Decode {
            service,
            message: message.to_string(),
        }
    }
}
