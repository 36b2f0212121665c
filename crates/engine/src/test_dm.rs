//! Probe messages for checking the bot's Slack access.

use anyhow::{Context, Result};
use bookcheck_types::TestDmReport;
use bookcheck_util::{Roster, redact_sensitive};
use tracing::{info, warn};

use crate::sources::Messenger;

pub const PROBE_MESSAGE: &str = "Test message from bot";

/// Send `Test message to {name}` to every rostered student with a Slack ID.
pub async fn send_test_messages(roster: &Roster, messenger: &dyn Messenger) -> TestDmReport {
    let mut report = TestDmReport::default();
    for student in roster.students() {
        let Some(slack_id) = student.slack_id.as_deref() else {
            continue;
        };
        let text = format!("Test message to {}", student.name);
        match messenger.send_direct_message(slack_id, &text).await {
            Ok(()) => {
                info!(student = %student.name, "test message delivered");
                report.delivered.push(student.name.clone());
            }
            Err(error) => {
                let error = redact_sensitive(&format!("{error:#}"));
                warn!(student = %student.name, %error, "test message failed");
                report.failed.push((student.name.clone(), error));
            }
        }
    }
    report
}

/// Send the fixed probe message to one channel or user ID.
pub async fn send_probe(messenger: &dyn Messenger, channel: &str) -> Result<()> {
    messenger
        .send_direct_message(channel, PROBE_MESSAGE)
        .await
        .with_context(|| format!("sending test message to {channel}"))?;
    info!(%channel, "probe message delivered");
    Ok(())
}
