//! In-memory stand-ins for the remote services.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use bookcheck_types::{Invitee, ScheduledEvent, SlackChannel, SlackProfile, SlackUser, WeekWindow};

use crate::sources::{Directory, EventSource, Messenger};

pub struct FakeCalendar {
    events: Vec<(String, Vec<String>)>,
    failing: HashSet<String>,
    unavailable: bool,
    calls: AtomicU64,
    windows: Mutex<Vec<WeekWindow>>,
}

impl FakeCalendar {
    pub fn with_events<'a>(events: impl IntoIterator<Item = (&'a str, Vec<&'a str>)>) -> Self {
        Self {
            events: events
                .into_iter()
                .map(|(uuid, emails)| (uuid.to_string(), emails.into_iter().map(str::to_string).collect()))
                .collect(),
            failing: HashSet::new(),
            unavailable: false,
            calls: AtomicU64::new(0),
            windows: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::with_events([])
        }
    }

    pub fn failing_invitees(mut self, uuid: &str) -> Self {
        self.failing.insert(uuid.to_string());
        self
    }

    pub fn requested_windows(&self) -> Vec<WeekWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSource for FakeCalendar {
    async fn scheduled_events(&self, window: &WeekWindow) -> Result<Vec<ScheduledEvent>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.windows.lock().unwrap().push(*window);
        if self.unavailable {
            bail!("calendly API error (503): unavailable");
        }
        Ok(self
            .events
            .iter()
            .map(|(uuid, _)| ScheduledEvent {
                uri: format!("https://api.calendly.com/scheduled_events/{uuid}"),
                name: Some("Advising".into()),
                start_time: None,
                status: Some("active".into()),
            })
            .collect())
    }

    async fn invitees(&self, event: &ScheduledEvent) -> Result<Vec<Invitee>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let uuid = event.uuid();
        if self.failing.contains(uuid) {
            bail!("calendly API error (404): not found");
        }
        let (_, emails) = self
            .events
            .iter()
            .find(|(candidate, _)| candidate == uuid)
            .ok_or_else(|| anyhow!("unknown event {uuid}"))?;
        Ok(emails
            .iter()
            .map(|email| Invitee {
                email: email.clone(),
                name: None,
                status: Some("active".into()),
            })
            .collect())
    }

    fn api_calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(String, String)>>,
    failing: HashSet<String>,
}

impl RecordingMessenger {
    pub fn failing_for<'a>(recipients: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            sent: Mutex::default(),
            failing: recipients.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_direct_message(&self, recipient: &str, text: &str) -> Result<()> {
        if self.failing.contains(recipient) {
            bail!("Slack chat.postMessage failed: channel_not_found");
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    pub channels: Vec<SlackChannel>,
    pub members: HashMap<String, Vec<String>>,
    pub users: HashMap<String, SlackUser>,
}

impl FakeDirectory {
    pub fn channel(mut self, id: &str, name: &str, members: &[&str]) -> Self {
        self.channels.push(SlackChannel {
            id: id.into(),
            name: name.into(),
        });
        self.members
            .insert(id.into(), members.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn user(mut self, id: &str, name: &str, email: &str) -> Self {
        self.users.insert(
            id.into(),
            SlackUser {
                id: id.into(),
                profile: SlackProfile {
                    real_name: name.into(),
                    email: email.into(),
                },
                ..SlackUser::default()
            },
        );
        self
    }

    pub fn bot(mut self, id: &str) -> Self {
        self.users.insert(
            id.into(),
            SlackUser {
                id: id.into(),
                is_bot: true,
                ..SlackUser::default()
            },
        );
        self
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn channels(&self) -> Result<Vec<SlackChannel>> {
        Ok(self.channels.clone())
    }

    async fn members(&self, channel_id: &str) -> Result<Vec<String>> {
        Ok(self.members.get(channel_id).cloned().unwrap_or_default())
    }

    async fn user(&self, user_id: &str) -> Result<SlackUser> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| anyhow!("Slack users.info failed: user_not_found"))
    }
}
