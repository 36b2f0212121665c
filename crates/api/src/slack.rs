//! Slack Web API client.
//!
//! Slack reports most failures as HTTP 200 with `"ok": false`; those are
//! surfaced as [`ApiError::Slack`]. Rate-limited calls (HTTP 429) are retried
//! after the server's `Retry-After` delay.

use bookcheck_types::{ServiceId, SlackChannel, SlackUser};
use bookcheck_util::http::{retry_after_delay, slack_next_cursor};
use reqwest::{Method, RequestBuilder, header};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{ApiClient, ApiError};

/// Attempts per call, including the first, when Slack answers 429.
const MAX_ATTEMPTS: u32 = 3;

/// Page size for cursor-paginated list methods.
const PAGE_LIMIT: &str = "1000";

#[derive(Debug, Clone)]
pub struct SlackClient {
    api: ApiClient,
}

impl SlackClient {
    /// Client against `SLACK_API_BASE` or the public Web API.
    pub fn new_from_env(token: &str) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiClient::new_from_env(ServiceId::Slack, token)?,
        })
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiClient::with_base_url(ServiceId::Slack, token, base_url)?,
        })
    }

    /// Post a plain-text message. A user ID as `channel` opens a DM.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), ApiError> {
        let body = json!({ "channel": channel, "text": text });
        self.call("chat.postMessage", || {
            self.api.request(Method::POST, "/chat.postMessage").json(&body)
        })
        .await?;
        Ok(())
    }

    /// All non-archived conversations visible to the bot.
    pub async fn list_channels(&self) -> Result<Vec<SlackChannel>, ApiError> {
        self.paginate("conversations.list", "channels", &[("exclude_archived", "true")])
            .await
    }

    /// Member IDs of one conversation.
    pub async fn list_members(&self, channel_id: &str) -> Result<Vec<String>, ApiError> {
        self.paginate("conversations.members", "members", &[("channel", channel_id)])
            .await
    }

    pub async fn user_info(&self, user_id: &str) -> Result<SlackUser, ApiError> {
        let body = self
            .call("users.info", || {
                self.api
                    .request(Method::GET, "/users.info")
                    .query(&[("user", user_id)])
            })
            .await?;
        decode_field(&body, "user")
    }

    async fn paginate<T: DeserializeOwned>(
        &self,
        method: &str,
        field: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        let path = format!("/{method}");
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let body = self
                .call(method, || {
                    let mut request = self
                        .api
                        .request(Method::GET, &path)
                        .query(params)
                        .query(&[("limit", PAGE_LIMIT)]);
                    if let Some(cursor) = cursor.as_deref() {
                        request = request.query(&[("cursor", cursor)]);
                    }
                    request
                })
                .await?;
            let page: Vec<T> = decode_field(&body, field)?;
            debug!(method, count = page.len(), "fetched slack page");
            items.extend(page);
            cursor = slack_next_cursor(&body);
            if cursor.is_none() {
                return Ok(items);
            }
        }
    }

    /// Send a request built by `build`, retrying on 429, and check `ok`.
    async fn call(&self, method: &str, build: impl Fn() -> RequestBuilder) -> Result<Value, ApiError> {
        let mut attempt = 1;
        loop {
            let response = build().send().await?;
            let status = response.status();
            if status.as_u16() == 429 && attempt < MAX_ATTEMPTS {
                let delay = retry_after_delay(
                    response
                        .headers()
                        .get(header::RETRY_AFTER)
                        .and_then(|value| value.to_str().ok()),
                );
                warn!(method, attempt, delay_ms = delay.as_millis() as u64, "slack rate limited; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let text = response.text().await?;
            if !status.is_success() {
                return Err(ApiError::status(ServiceId::Slack, status.as_u16(), &text));
            }
            let body: Value = serde_json::from_str(&text).map_err(|error| ApiError::decode(ServiceId::Slack, error))?;
            return check_ok(method, body);
        }
    }
}

/// Turn a Slack envelope with `"ok": false` into an error.
pub fn check_ok(method: &str, body: Value) -> Result<Value, ApiError> {
    if body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(body);
    }
    let error = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_string();
    Err(ApiError::Slack {
        method: method.to_string(),
        error,
    })
}

fn decode_field<T: DeserializeOwned>(body: &Value, field: &str) -> Result<T, ApiError> {
    let value = body
        .get(field)
        .cloned()
        .ok_or_else(|| ApiError::decode(ServiceId::Slack, format!("response has no '{field}'")))?;
    serde_json::from_value(value).map_err(|error| ApiError::decode(ServiceId::Slack, error))
}
