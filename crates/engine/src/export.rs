//! Roster export from Slack channel membership.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use bookcheck_types::{ExportReport, Student};
use bookcheck_util::{redact_sensitive, students_to_csv};
use tracing::{info, warn};

use crate::sources::Directory;

pub const DEFAULT_CHANNEL_PREFIX: &str = "alex-cloud-";
pub const DEFAULT_OUTPUT: &str = "students.csv";

/// Write a roster of every person in the channels whose name starts with
/// `prefix` (case-insensitive) to `output`.
///
/// Nothing is written when no channel matches.
pub async fn export_roster(directory: &dyn Directory, prefix: &str, output: &Path) -> Result<ExportReport> {
    let prefix = prefix.to_lowercase();
    info!(%prefix, "fetching channels");
    let channels: Vec<_> = directory
        .channels()
        .await
        .context("listing Slack channels")?
        .into_iter()
        .filter(|channel| channel.name.starts_with(&prefix))
        .collect();

    let mut report = ExportReport {
        prefix: prefix.clone(),
        channels: channels.iter().map(|channel| channel.name.clone()).collect(),
        ..ExportReport::default()
    };
    if channels.is_empty() {
        info!(%prefix, "no channels found with prefix; nothing exported");
        return Ok(report);
    }

    let mut member_ids = BTreeSet::new();
    for channel in &channels {
        match directory.members(&channel.id).await {
            Ok(members) => {
                info!(channel = %channel.name, members = members.len(), "fetched channel members");
                member_ids.extend(members);
            }
            Err(error) => warn!(channel = %channel.name, error = %redact_sensitive(&format!("{error:#}")), "could not list members"),
        }
    }
    report.unique_members = member_ids.len();
    info!(unique = member_ids.len(), "collected unique members");

    // One row per member; display names are not unique.
    let students = collect_students(directory, &member_ids).await;
    let csv_text = students_to_csv(&students)?;
    tokio::fs::write(output, csv_text)
        .await
        .with_context(|| format!("writing roster to {}", output.display()))?;
    info!(count = students.len(), path = %output.display(), "saved roster");
    report.students_written = students.len();
    report.output = Some(output.display().to_string());

    Ok(report)
}

/// Look up each member and keep the people that have an email address.
async fn collect_students(directory: &dyn Directory, member_ids: &BTreeSet<String>) -> Vec<Student> {
    let mut students = Vec::new();
    for member_id in member_ids {
        match directory.user(member_id).await {
            Ok(user) => {
                if let Some(student) = user.into_student() {
                    students.push(student);
                }
            }
            Err(error) => warn!(member = %member_id, error = %redact_sensitive(&format!("{error:#}")), "could not fetch user info"),
        }
    }
    students
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDirectory;

    fn directory() -> FakeDirectory {
        FakeDirectory::default()
            .channel("C1", "alex-cloud-2024", &["U2", "U1", "UBOT"])
            .channel("C2", "alex-cloud-2025", &["U1", "U3", "U4"])
            .channel("C3", "random", &["U9"])
            .user("U1", "Ada Lovelace", "Ada@Example.com")
            .user("U2", "Alan Turing", "alan@example.com")
            .user("U3", "No Email", "")
            .user("U9", "Outsider", "out@example.com")
            .bot("UBOT")
    }

    #[tokio::test]
    async fn exports_people_from_matching_channels() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("students.csv");

        let report = export_roster(&directory(), "Alex-Cloud-", &output).await.unwrap();

        assert_eq!(report.channels, ["alex-cloud-2024", "alex-cloud-2025"]);
        // U1, U2, U3, U4, UBOT
        assert_eq!(report.unique_members, 5);
        assert_eq!(report.students_written, 2);

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            written,
            "name,email,slack_id\nAda Lovelace,ada@example.com,U1\nAlan Turing,alan@example.com,U2\n"
        );
    }

    #[tokio::test]
    async fn members_sharing_a_display_name_each_get_a_row() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("students.csv");
        let directory = FakeDirectory::default()
            .channel("C1", "alex-cloud-2025", &["U1", "U2", "U3", "U4"])
            .user("U1", "Alex Kim", "alex.kim1@example.com")
            .user("U2", "Alex Kim", "alex.kim2@example.com")
            .user("U3", "", "nodisplay1@example.com")
            .user("U4", "", "nodisplay2@example.com");

        let report = export_roster(&directory, DEFAULT_CHANNEL_PREFIX, &output).await.unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        let rows: Vec<&str> = written.lines().skip(1).collect();
        assert_eq!(report.students_written, 4);
        assert_eq!(rows.len(), report.students_written);
        assert_eq!(
            rows,
            [
                "Alex Kim,alex.kim1@example.com,U1",
                "Alex Kim,alex.kim2@example.com,U2",
                ",nodisplay1@example.com,U3",
                ",nodisplay2@example.com,U4",
            ]
        );
    }

    #[tokio::test]
    async fn no_matching_channel_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("students.csv");

        let report = export_roster(&directory(), "staff-", &output).await.unwrap();

        assert!(report.channels.is_empty());
        assert_eq!(report.output, None);
        assert!(!output.exists());
    }
}
