//! Calendly REST client.
//!
//! Wraps the two endpoints the reminder job reads: scheduled events for a
//! user within a time window, and the invitees of one event. Both are
//! cursor-paginated through `pagination.next_page`, and every request made
//! (successful or not) is counted so a run can report its API usage.

use std::sync::atomic::{AtomicU64, Ordering};

use bookcheck_types::{Invitee, ScheduledEvent, ServiceId, WeekWindow};
use bookcheck_util::http::calendly_next_page;
use bookcheck_util::week::calendly_timestamp;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{ApiClient, ApiError};

/// Page size requested from list endpoints (Calendly's maximum).
const PAGE_SIZE: &str = "100";

/// Characters escaped when an event UUID is placed in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

#[derive(Debug)]
pub struct CalendlyClient {
    api: ApiClient,
    api_calls: AtomicU64,
}

impl CalendlyClient {
    /// Client against `CALENDLY_API_BASE` or the public API.
    pub fn new_from_env(token: &str) -> Result<Self, ApiError> {
        Ok(Self::from_api(ApiClient::new_from_env(ServiceId::Calendly, token)?))
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, ApiError> {
        Ok(Self::from_api(ApiClient::with_base_url(ServiceId::Calendly, token, base_url)?))
    }

    fn from_api(api: ApiClient) -> Self {
        Self {
            api,
            api_calls: AtomicU64::new(0),
        }
    }

    /// Number of HTTP requests issued so far.
    pub fn api_calls(&self) -> u64 {
        self.api_calls.load(Ordering::Relaxed)
    }

    /// Active events of `user_uri` starting inside `window`, across all pages.
    pub async fn list_scheduled_events(
        &self,
        user_uri: &str,
        window: &WeekWindow,
    ) -> Result<Vec<ScheduledEvent>, ApiError> {
        let first = self.scheduled_events_request(user_uri, window);
        self.collect_pages(first).await
    }

    /// Invitees of one event, across all pages. Emails are lower-cased.
    pub async fn list_invitees(&self, event_uuid: &str) -> Result<Vec<Invitee>, ApiError> {
        let first = self.invitees_request(event_uuid);
        let invitees: Vec<Invitee> = self.collect_pages(first).await?;
        Ok(invitees
            .into_iter()
            .map(|invitee| Invitee {
                email: invitee.email.trim().to_lowercase(),
                ..invitee
            })
            .collect())
    }

    fn scheduled_events_request(&self, user_uri: &str, window: &WeekWindow) -> RequestBuilder {
        let min_start_time = calendly_timestamp(window.start);
        let max_start_time = calendly_timestamp(window.end);
        self.api.request(Method::GET, "/scheduled_events").query(&[
            ("user", user_uri),
            ("min_start_time", min_start_time.as_str()),
            ("max_start_time", max_start_time.as_str()),
            ("status", "active"),
            ("count", PAGE_SIZE),
        ])
    }

    fn invitees_request(&self, event_uuid: &str) -> RequestBuilder {
        let segment = utf8_percent_encode(event_uuid, PATH_SEGMENT);
        self.api
            .request(Method::GET, &format!("/scheduled_events/{segment}/invitees"))
            .query(&[("count", PAGE_SIZE)])
    }

    async fn collect_pages<T: DeserializeOwned>(&self, first: RequestBuilder) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut request = first;
        loop {
            let body = self.send(request).await?;
            let (page, next_page) = decode_page::<T>(&body)?;
            items.extend(page);
            match next_page {
                Some(url) => {
                    debug!(%url, "following calendly pagination");
                    request = self.api.request_absolute(Method::GET, &url)?;
                }
                None => return Ok(items),
            }
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::status(ServiceId::Calendly, status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(|error| ApiError::decode(ServiceId::Calendly, error))
    }
}

/// Split a Calendly list response into its `collection` and next-page link.
pub fn decode_page<T: DeserializeOwned>(body: &Value) -> Result<(Vec<T>, Option<String>), ApiError> {
    let collection = body
        .get("collection")
        .cloned()
        .ok_or_else(|| ApiError::decode(ServiceId::Calendly, "response has no 'collection'"))?;
    let items = serde_json::from_value(collection).map_err(|error| ApiError::decode(ServiceId::Calendly, error))?;
    Ok((items, calendly_next_page(body)))
}
