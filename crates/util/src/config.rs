//! Environment-backed settings for a run.
//!
//! Every value comes from the process environment. A `.env` file in the
//! working directory is loaded first when present; variables that are already
//! set in the environment take precedence over the file.

use std::fmt;

use thiserror::Error;
use tracing::debug;

/// Environment variables understood by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvVarName {
    CalendlyToken,
    CalendlyUserUri,
    SlackBotToken,
    SlackSigningSecret,
    StudentsData,
    BookingUrl,
}

impl EnvVarName {
    pub const ALL: [EnvVarName; 6] = [
        Self::CalendlyToken,
        Self::CalendlyUserUri,
        Self::SlackBotToken,
        Self::SlackSigningSecret,
        Self::StudentsData,
        Self::BookingUrl,
    ];

    /// The five secrets the scheduled workflow injects.
    pub const WORKFLOW_SECRETS: [EnvVarName; 5] = [
        Self::CalendlyToken,
        Self::CalendlyUserUri,
        Self::SlackBotToken,
        Self::SlackSigningSecret,
        Self::StudentsData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CalendlyToken => "CALENDLY_TOKEN",
            Self::CalendlyUserUri => "CALENDLY_USER_URI",
            Self::SlackBotToken => "SLACK_BOT_TOKEN",
            Self::SlackSigningSecret => "SLACK_SIGNING_SECRET",
            Self::StudentsData => "STUDENTS_DATA",
            Self::BookingUrl => "BOOKING_URL",
        }
    }
}

impl fmt::Display for EnvVarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable(s): {}", names.join(", "))]
    Missing { names: Vec<String> },
}

/// Raw settings; every field is optional until a command requires it.
#[derive(Clone, Default)]
pub struct Settings {
    pub calendly_token: Option<String>,
    pub calendly_user_uri: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_signing_secret: Option<String>,
    pub students_data: Option<String>,
    pub booking_url: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |value: &Option<String>| value.as_ref().map(|_| "<set>");
        f.debug_struct("Settings")
            .field("calendly_token", &mask(&self.calendly_token))
            .field("calendly_user_uri", &self.calendly_user_uri)
            .field("slack_bot_token", &mask(&self.slack_bot_token))
            .field("slack_signing_secret", &mask(&self.slack_signing_secret))
            .field("students_data", &mask(&self.students_data))
            .field("booking_url", &self.booking_url)
            .finish()
    }
}

impl Settings {
    /// Load `.env` (if any) and read settings from the environment.
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(error) if error.not_found() => {}
            Err(error) => debug!(%error, "ignoring unreadable .env file"),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: EnvVarName| lookup(name.as_str()).filter(|value| !value.trim().is_empty());
        Self {
            calendly_token: read(EnvVarName::CalendlyToken),
            calendly_user_uri: read(EnvVarName::CalendlyUserUri),
            slack_bot_token: read(EnvVarName::SlackBotToken),
            slack_signing_secret: read(EnvVarName::SlackSigningSecret),
            students_data: read(EnvVarName::StudentsData),
            booking_url: read(EnvVarName::BookingUrl),
        }
    }

    pub fn get(&self, name: EnvVarName) -> Option<&str> {
        let value = match name {
            EnvVarName::CalendlyToken => &self.calendly_token,
            EnvVarName::CalendlyUserUri => &self.calendly_user_uri,
            EnvVarName::SlackBotToken => &self.slack_bot_token,
            EnvVarName::SlackSigningSecret => &self.slack_signing_secret,
            EnvVarName::StudentsData => &self.students_data,
            EnvVarName::BookingUrl => &self.booking_url,
        };
        value.as_deref()
    }

    /// The value of a required variable.
    pub fn require(&self, name: EnvVarName) -> Result<&str, ConfigError> {
        self.get(name).ok_or_else(|| ConfigError::Missing {
            names: vec![name.to_string()],
        })
    }

    /// Check several variables at once, reporting every missing one.
    pub fn require_all(&self, names: &[EnvVarName]) -> Result<(), ConfigError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| self.get(**name).is_none())
            .map(ToString::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing { names: missing })
        }
    }
}
