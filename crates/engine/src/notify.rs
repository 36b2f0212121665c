//! Weekly booking check and reminder delivery.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use bookcheck_types::{RunReport, Student, StudentOutcome, StudentResult, WeekWindow};
use bookcheck_util::{Roster, redact_sensitive, week_containing};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::sources::{EventSource, Messenger};

/// Inputs of a notification run besides the roster and the services.
#[derive(Debug, Clone)]
pub struct NotifyOptions {
    /// Link placed in every reminder.
    pub booking_url: String,
    /// Reference time; the run checks the working week containing it.
    pub now: DateTime<Utc>,
    /// Decide outcomes without sending any message.
    pub dry_run: bool,
}

/// The reminder sent to a student without a booking.
pub fn reminder_message(name: &str, booking_url: &str) -> String {
    format!(
        "Hey {name}, I noticed you haven’t scheduled a meeting with me for this week. Please book a slot here: {booking_url}"
    )
}

/// Remind every rostered student who has no meeting booked in the current
/// working week.
///
/// Fails only when the week's events cannot be listed; failed invitee
/// lookups and failed sends are recorded in the report.
pub async fn notify_missing_students(
    roster: &Roster,
    events: &dyn EventSource,
    messenger: &dyn Messenger,
    options: &NotifyOptions,
) -> Result<RunReport> {
    let week = week_containing(options.now);
    info!("Checking schedules for this week ({week})...");

    let (scheduled_emails, failed_event_lookups) = scheduled_emails(events, &week).await?;
    let api_calls = events.api_calls();
    info!(api_calls, scheduled = scheduled_emails.len(), "collected scheduled invitees");

    let mut students = Vec::with_capacity(roster.len());
    for student in roster.students() {
        let outcome = decide_and_deliver(student, &scheduled_emails, messenger, options).await;
        students.push(StudentResult {
            name: student.name.clone(),
            email: student.email.clone(),
            outcome,
        });
    }

    Ok(RunReport {
        week,
        api_calls,
        scheduled_emails,
        failed_event_lookups,
        dry_run: options.dry_run,
        students,
    })
}

/// Lower-cased emails of everyone invited to an event in `week`, plus the
/// number of events whose invitees could not be fetched.
async fn scheduled_emails(events: &dyn EventSource, week: &WeekWindow) -> Result<(BTreeSet<String>, usize)> {
    let scheduled = events
        .scheduled_events(week)
        .await
        .context("fetching this week's scheduled events")?;

    let mut emails = BTreeSet::new();
    let mut failed = 0;
    for event in &scheduled {
        match events.invitees(event).await {
            Ok(invitees) => emails.extend(invitees.into_iter().map(|invitee| invitee.email.trim().to_lowercase())),
            Err(error) => {
                failed += 1;
                warn!(event = event.uuid(), error = %redact_sensitive(&format!("{error:#}")), "could not fetch invitees");
            }
        }
    }
    Ok((emails, failed))
}

async fn decide_and_deliver(
    student: &Student,
    scheduled_emails: &BTreeSet<String>,
    messenger: &dyn Messenger,
    options: &NotifyOptions,
) -> StudentOutcome {
    let name = student.name.as_str();
    if scheduled_emails.contains(&student.email) {
        info!(student = name, "already has a scheduled meeting this week");
        return StudentOutcome::AlreadyScheduled;
    }
    let Some(slack_id) = student.slack_id.as_deref() else {
        info!(student = name, "skipping; no Slack ID on the roster");
        return StudentOutcome::SkippedNoSlackId;
    };
    if options.dry_run {
        info!(student = name, slack_id, "would send reminder (dry run)");
        return StudentOutcome::WouldSend;
    }

    let message = reminder_message(name, &options.booking_url);
    match messenger.send_direct_message(slack_id, &message).await {
        Ok(()) => {
            info!(student = name, slack_id, "sent reminder");
            StudentOutcome::Sent
        }
        Err(error) => {
            let error = redact_sensitive(&format!("{error:#}"));
            warn!(student = name, slack_id, %error, "failed to send reminder");
            StudentOutcome::Failed { error }
        }
    }
}
