//! Seams between the engine and the remote services.

use anyhow::Result;
use async_trait::async_trait;
use bookcheck_api::{CalendlyClient, SlackClient};
use bookcheck_types::{Invitee, ScheduledEvent, SlackChannel, SlackUser, WeekWindow};
use tracing::debug;

/// Source of booked meetings.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Events starting inside `window`.
    async fn scheduled_events(&self, window: &WeekWindow) -> Result<Vec<ScheduledEvent>>;

    /// Invitees of one event.
    async fn invitees(&self, event: &ScheduledEvent) -> Result<Vec<Invitee>>;

    /// Remote calls made so far.
    fn api_calls(&self) -> u64;
}

/// Delivers direct messages.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_direct_message(&self, recipient: &str, text: &str) -> Result<()>;
}

/// Workspace directory used to build a roster.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn channels(&self) -> Result<Vec<SlackChannel>>;
    async fn members(&self, channel_id: &str) -> Result<Vec<String>>;
    async fn user(&self, user_id: &str) -> Result<SlackUser>;
}

/// Calendly events of one organizer.
pub struct CalendlySource {
    client: CalendlyClient,
    user_uri: String,
}

impl CalendlySource {
    pub fn new(client: CalendlyClient, user_uri: impl Into<String>) -> Self {
        Self {
            client,
            user_uri: user_uri.into(),
        }
    }
}

#[async_trait]
impl EventSource for CalendlySource {
    async fn scheduled_events(&self, window: &WeekWindow) -> Result<Vec<ScheduledEvent>> {
        Ok(self.client.list_scheduled_events(&self.user_uri, window).await?)
    }

    async fn invitees(&self, event: &ScheduledEvent) -> Result<Vec<Invitee>> {
        Ok(self.client.list_invitees(event.uuid()).await?)
    }

    fn api_calls(&self) -> u64 {
        self.client.api_calls()
    }
}

/// A messenger that only logs. Lets dry runs proceed without Slack credentials.
pub struct NoopMessenger;

#[async_trait]
impl Messenger for NoopMessenger {
    async fn send_direct_message(&self, recipient: &str, _text: &str) -> Result<()> {
        debug!(%recipient, "noop messenger: message dropped");
        Ok(())
    }
}

#[async_trait]
impl Messenger for SlackClient {
    async fn send_direct_message(&self, recipient: &str, text: &str) -> Result<()> {
        Ok(self.post_message(recipient, text).await?)
    }
}

#[async_trait]
impl Directory for SlackClient {
    async fn channels(&self) -> Result<Vec<SlackChannel>> {
        Ok(self.list_channels().await?)
    }

    async fn members(&self, channel_id: &str) -> Result<Vec<String>> {
        Ok(self.list_members(channel_id).await?)
    }

    async fn user(&self, user_id: &str) -> Result<SlackUser> {
        Ok(self.user_info(user_id).await?)
    }
}
