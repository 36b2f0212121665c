//! # Bookcheck Engine
//!
//! Orchestrates the three runs the binary offers, independent of how the
//! remote services are reached:
//!
//! - **`notify`**: find roster students without a Calendly booking this week
//!   and remind them over Slack
//! - **`export`**: build a roster from the members of Slack channels that
//!   share a name prefix
//! - **`test_dm`**: send probe messages to check the bot's Slack access
//!
//! Remote access goes through the traits in [`sources`], implemented for the
//! `bookcheck-api` clients and replaced by fakes in tests.

pub mod export;
pub mod notify;
pub mod sources;
pub mod test_dm;

#[cfg(test)]
pub(crate) mod testing;

pub use export::{DEFAULT_CHANNEL_PREFIX, DEFAULT_OUTPUT, export_roster};
pub use notify::{NotifyOptions, notify_missing_students, reminder_message};
pub use sources::{CalendlySource, Directory, EventSource, Messenger, NoopMessenger};
pub use test_dm::{send_probe, send_test_messages};
