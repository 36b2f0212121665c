//! Calendly and Slack API client utilities.
//!
//! This crate provides lightweight clients for the two remote services the
//! reminder job depends on. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults and bearer auth
//! - Honoring `CALENDLY_API_BASE` / `SLACK_API_BASE` overrides, validated for safety
//! - Building requests with a consistent User-Agent and Accept header
//! - Following each API's pagination scheme
//!
//! The shared plumbing lives in [`ApiClient`]; [`CalendlyClient`] and
//! [`SlackClient`] wrap it with typed operations.
//!
//! # Example
//!
//! ```ignore
//! use bookcheck_api::SlackClient;
//!
//! async fn hello(token: &str) -> Result<(), bookcheck_api::ApiError> {
//!     let slack = SlackClient::new_from_env(token)?;
//!     slack.post_message("U012AB3CD", "hello").await
//! }
//! ```

use std::env;
use std::time::Duration;

use bookcheck_types::{ServiceId, ToServiceIdInfo};
use reqwest::{Client, Method, RequestBuilder, header};
use tracing::debug;
use url::Url;

pub mod calendly;
mod error;
pub mod slack;

pub use calendly::CalendlyClient;
pub use error::ApiError;
pub use slack::SlackClient;

/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for one service.
///
/// The client pre-configures the bearer token and Accept header and builds
/// requests against a validated base URL.
pub struct ApiClient {
    pub service: ServiceId,
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl ApiClient {
    /// Construct a client whose base URL comes from the service's override
    /// variable (e.g. `SLACK_API_BASE`) or the public default.
    pub fn new_from_env(service: ServiceId, token: &str) -> Result<Self, ApiError> {
        let base_url = env::var(service.env_var()).unwrap_or_else(|_| service.default_base_url().into());
        Self::with_base_url(service, token, &base_url)
    }

    /// Construct a client against an explicit base URL.
    ///
    /// Non-localhost hosts must use HTTPS and belong to the service's domain.
    pub fn with_base_url(service: ServiceId, token: &str, base_url: &str) -> Result<Self, ApiError> {
        validate_base_url(service, base_url)?;

        let mut authorization = header::HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| ApiError::Config(format!("{service} token contains characters not allowed in a header")))?;
        authorization.set_sensitive(true);

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::AUTHORIZATION, authorization);
        let accept = header::HeaderValue::from_str(service.accept_headers())
            .map_err(|_| ApiError::Config(format!("{service} accept header is not a valid header value")))?;
        default_headers.insert(header::ACCEPT, accept);

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            user_agent: format!("bookcheck/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Build a `reqwest::RequestBuilder` for a method and API-relative path.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(service = %self.service, %url, "building request");

        self.http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
    }

    /// Build a request for an absolute URL handed back by the API (e.g. a
    /// pagination link). The URL must point at the configured host so the
    /// bearer token is never sent elsewhere.
    pub fn request_absolute(&self, method: Method, url: &str) -> Result<RequestBuilder, ApiError> {
        let target = Url::parse(url).map_err(|e| ApiError::Config(format!("invalid {} URL '{url}': {e}", self.service)))?;
        let base = Url::parse(&self.base_url).map_err(|e| ApiError::Config(e.to_string()))?;
        if target.host_str() != base.host_str() || target.scheme() != base.scheme() {
            return Err(ApiError::Config(format!(
                "refusing to follow {} link to foreign host '{}'",
                self.service,
                target.host_str().unwrap_or_default()
            )));
        }
        debug!(service = %self.service, url = %target, "building request");
        Ok(self
            .http
            .request(method, target)
            .header(header::USER_AGENT, &self.user_agent))
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS, and host must be one of the service's
///   allowed domains or a subdomain thereof
pub fn validate_base_url(service: ServiceId, base: &str) -> Result<(), ApiError> {
    let var = service.env_var();
    let parsed_base_url = Url::parse(base).map_err(|e| ApiError::Config(format!("Invalid {var} URL '{base}': {e}")))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| ApiError::Config(format!("{var} must include a host")))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(ApiError::Config(format!(
            "{var} must use https for non-localhost hosts; got '{}://'",
            parsed_base_url.scheme()
        )));
    }

    let allowed_domains = service.allowed_domains();
    let is_allowed_domain = allowed_domains.iter().any(|&allowed_domain| {
        host_name.eq_ignore_ascii_case(allowed_domain) || host_name.ends_with(&format!(".{}", allowed_domain))
    });
    if !is_allowed_domain {
        return Err(ApiError::Config(format!(
            "{var} host '{host_name}' is not allowed; must be one of {allowed_domains:?} or a subdomain, or localhost"
        )));
    }

    Ok(())
}
