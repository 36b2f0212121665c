use serde::{Deserialize, Serialize};

pub mod report;

pub use report::{ExportReport, RunReport, StudentOutcome, StudentResult, TestDmReport, WeekWindow};

/// A student on the advising roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Display name; also the roster key.
    pub name: String,
    /// Trimmed, lower-cased email used to match Calendly invitees.
    pub email: String,
    /// Slack member ID used as the DM channel, when known.
    #[serde(default)]
    pub slack_id: Option<String>,
}

impl Student {
    /// Build a student, normalizing the email and dropping a blank Slack ID.
    pub fn new(name: impl Into<String>, email: &str, slack_id: Option<&str>) -> Self {
        Self {
            name: name.into(),
            email: email.trim().to_lowercase(),
            slack_id: slack_id.map(str::trim).filter(|id| !id.is_empty()).map(str::to_string),
        }
    }
}

/// A Calendly scheduled event as returned by `GET /scheduled_events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Canonical resource URI, e.g. `https://api.calendly.com/scheduled_events/<uuid>`.
    pub uri: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ScheduledEvent {
    /// The event UUID, i.e. the last path segment of the URI.
    pub fn uuid(&self) -> &str {
        self.uri.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
    }
}

/// A Calendly invitee of a scheduled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitee {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A Slack conversation returned by `conversations.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackChannel {
    pub id: String,
    pub name: String,
}

/// The subset of a Slack `users.info` user object the roster export needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub is_app_user: bool,
    #[serde(default)]
    pub profile: SlackProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackProfile {
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub email: String,
}

/// Slack's built-in bot user.
pub const SLACKBOT_USER_ID: &str = "USLACKBOT";

impl SlackUser {
    /// True for accounts that are real, active people.
    pub fn is_person(&self) -> bool {
        !(self.is_bot || self.deleted || self.is_app_user || self.id == SLACKBOT_USER_ID)
    }

    /// Convert into a roster student when the user is a person with an email.
    pub fn into_student(self) -> Option<Student> {
        if !self.is_person() || self.profile.email.trim().is_empty() {
            return None;
        }
        Some(Student::new(self.profile.real_name, &self.profile.email, Some(&self.id)))
    }
}

/// Remote services the job talks to.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ServiceId {
    Calendly, // https://api.calendly.com
    Slack,    // https://slack.com/api
}

impl ToServiceIdInfo for ServiceId {
    fn env_var(&self) -> &str {
        match self {
            Self::Calendly => "CALENDLY_API_BASE",
            Self::Slack => "SLACK_API_BASE",
        }
    }
    fn default_base_url(&self) -> &str {
        match self {
            Self::Calendly => "https://api.calendly.com",
            Self::Slack => "https://slack.com/api",
        }
    }
    fn accept_headers(&self) -> &str {
        "application/json"
    }
    fn allowed_domains(&self) -> &'static [&'static str] {
        match self {
            Self::Calendly => &["calendly.com"],
            Self::Slack => &["slack.com"],
        }
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calendly => f.write_str("calendly"),
            Self::Slack => f.write_str("slack"),
        }
    }
}

pub trait ToServiceIdInfo {
    fn env_var(&self) -> &str;
    fn default_base_url(&self) -> &str;
    fn accept_headers(&self) -> &str;
    /// Hostnames (and their subdomains) accepted for a non-local base URL.
    fn allowed_domains(&self) -> &'static [&'static str];
}
