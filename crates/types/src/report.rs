//! Run reports produced by the engine and rendered by the CLI.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The Monday-to-Friday span a notification run checks bookings for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    /// Monday 00:00:00.000000 UTC.
    pub start: DateTime<Utc>,
    /// Friday 23:59:59.999999 UTC.
    pub end: DateTime<Utc>,
}

impl fmt::Display for WeekWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Monday {} to Friday {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// What happened to one student during a notification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StudentOutcome {
    AlreadyScheduled,
    SkippedNoSlackId,
    Sent,
    WouldSend,
    Failed { error: String },
}

impl StudentOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentResult {
    pub name: String,
    pub email: String,
    #[serde(flatten)]
    pub outcome: StudentOutcome,
}

/// Summary of a `notify` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub week: WeekWindow,
    pub api_calls: u64,
    pub scheduled_emails: BTreeSet<String>,
    /// Events whose invitee lookup failed; their invitees count as unscheduled.
    pub failed_event_lookups: usize,
    pub dry_run: bool,
    pub students: Vec<StudentResult>,
}

impl RunReport {
    pub fn count(&self, predicate: impl Fn(&StudentOutcome) -> bool) -> usize {
        self.students.iter().filter(|result| predicate(&result.outcome)).count()
    }

    pub fn failures(&self) -> usize {
        self.count(StudentOutcome::is_failure)
    }
}

/// Summary of an `export-roster` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    pub prefix: String,
    pub channels: Vec<String>,
    pub unique_members: usize,
    pub students_written: usize,
    /// `None` when nothing was written because no channel matched.
    pub output: Option<String>,
}

/// Per-recipient results of a `test-dm` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDmReport {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, String)>,
}
