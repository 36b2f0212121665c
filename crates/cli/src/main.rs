use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bookcheck_api::{CalendlyClient, SlackClient};
use bookcheck_engine::{
    CalendlySource, DEFAULT_CHANNEL_PREFIX, DEFAULT_OUTPUT, Messenger, NoopMessenger, NotifyOptions, export_roster,
    notify_missing_students, send_probe, send_test_messages,
};
use bookcheck_types::{RunReport, StudentOutcome};
use bookcheck_util::cron::{DEFAULT_SCHEDULE, WORKFLOW_PATH};
use bookcheck_util::{CronSchedule, EnvVarName, Roster, Settings, encode_secret, schedule_from_workflow};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::warn;

/// Remind students who have not booked a meeting this week.
#[derive(Parser, Debug)]
#[command(name = "bookcheck", version, about)]
struct Cli {
    /// Print the command's report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check this week's Calendly bookings and DM students without one (default)
    Notify(NotifyArgs),
    /// Send a test DM to every rostered student, or to one channel
    TestDm {
        /// Slack channel or user ID to send a single probe message to
        #[arg(long)]
        channel: Option<String>,
    },
    /// Build students.csv from the members of prefixed Slack channels
    ExportRoster {
        /// Channel name prefix
        #[arg(long, default_value = DEFAULT_CHANNEL_PREFIX)]
        prefix: String,
        /// Output CSV path
        #[arg(long, short, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Print a roster CSV file in the single-line STUDENTS_DATA secret form
    EncodeSecret {
        /// Roster CSV file
        file: PathBuf,
    },
    /// Show the next trigger times of the reminder schedule
    Schedule {
        /// Read the schedule from a workflow file instead of the built-in default
        #[arg(long)]
        workflow: Option<PathBuf>,
        /// Number of trigger times to show
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
}

#[derive(Args, Debug, Default)]
struct NotifyArgs {
    /// Decide who would be reminded without sending anything
    #[arg(long)]
    dry_run: bool,
    /// Exit non-zero when any reminder fails to send
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let settings = Settings::from_env();
    let cli = Cli::parse();
    let json = cli.json;

    match cli.command.unwrap_or_else(|| Command::Notify(NotifyArgs::default())) {
        Command::Notify(args) => run_notify(&settings, &args, json).await,
        Command::TestDm { channel } => run_test_dm(&settings, channel.as_deref(), json).await,
        Command::ExportRoster { prefix, output } => run_export(&settings, &prefix, &output, json).await,
        Command::EncodeSecret { file } => run_encode_secret(&file, json),
        Command::Schedule { workflow, count } => run_schedule(workflow.as_deref(), count, json),
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_roster(settings: &Settings) -> Result<Roster> {
    let roster = match settings.get(EnvVarName::StudentsData) {
        Some(data) => Roster::parse(data).context("parsing STUDENTS_DATA")?,
        None => Roster::default(),
    };
    if roster.is_empty() {
        warn!("STUDENTS_DATA is empty; no students to check");
    }
    Ok(roster)
}

async fn run_notify(settings: &Settings, args: &NotifyArgs, json: bool) -> Result<ExitCode> {
    let mut required = vec![EnvVarName::CalendlyToken, EnvVarName::CalendlyUserUri, EnvVarName::BookingUrl];
    if !args.dry_run {
        required.extend([EnvVarName::SlackBotToken, EnvVarName::SlackSigningSecret]);
    }
    settings.require_all(&required)?;

    let roster = load_roster(settings)?;
    let calendly = CalendlyClient::new_from_env(settings.require(EnvVarName::CalendlyToken)?)?;
    let events = CalendlySource::new(calendly, settings.require(EnvVarName::CalendlyUserUri)?);
    let messenger: Box<dyn Messenger> = if args.dry_run {
        Box::new(NoopMessenger)
    } else {
        Box::new(SlackClient::new_from_env(settings.require(EnvVarName::SlackBotToken)?)?)
    };
    let options = NotifyOptions {
        booking_url: settings.require(EnvVarName::BookingUrl)?.to_string(),
        now: Utc::now(),
        dry_run: args.dry_run,
    };

    let report = notify_missing_students(&roster, &events, messenger.as_ref(), &options).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_report(&report);
    }

    if args.strict && report.failures() > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_run_report(report: &RunReport) {
    println!("Week: {}", report.week);
    println!("API calls made this run: {}", report.api_calls);
    println!("Scheduled emails: {}", report.scheduled_emails.len());
    if report.failed_event_lookups > 0 {
        println!("Events with unreadable invitees: {}", report.failed_event_lookups);
    }
    for result in &report.students {
        let status = match &result.outcome {
            StudentOutcome::AlreadyScheduled => "already has a meeting this week".to_string(),
            StudentOutcome::SkippedNoSlackId => "skipped (no Slack ID)".to_string(),
            StudentOutcome::Sent => "reminder sent".to_string(),
            StudentOutcome::WouldSend => "would be reminded (dry run)".to_string(),
            StudentOutcome::Failed { error } => format!("reminder failed: {error}"),
        };
        println!("  {}: {}", result.name, status);
    }
    println!("{}", summary_line(report));
}

fn summary_line(report: &RunReport) -> String {
    let already = report.count(|o| *o == StudentOutcome::AlreadyScheduled);
    let skipped = report.count(|o| *o == StudentOutcome::SkippedNoSlackId);
    let failed = report.failures();
    if report.dry_run {
        let would_send = report.count(|o| *o == StudentOutcome::WouldSend);
        format!("Summary (dry run): {would_send} would be reminded, {already} already scheduled, {skipped} skipped")
    } else {
        let sent = report.count(|o| *o == StudentOutcome::Sent);
        format!("Summary: {sent} sent, {already} already scheduled, {skipped} skipped, {failed} failed")
    }
}

async fn run_test_dm(settings: &Settings, channel: Option<&str>, json: bool) -> Result<ExitCode> {
    settings.require_all(&[EnvVarName::SlackBotToken])?;
    let slack = SlackClient::new_from_env(settings.require(EnvVarName::SlackBotToken)?)?;

    if let Some(channel) = channel {
        send_probe(&slack, channel).await?;
        if json {
            println!("{}", serde_json::json!({ "delivered": [channel] }));
        } else {
            println!("Test message sent to {channel}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let roster = load_roster(settings)?;
    let report = send_test_messages(&roster, &slack).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for name in &report.delivered {
            println!("Test message to {name}: ok");
        }
        for (name, error) in &report.failed {
            println!("Test message to {name}: failed ({error})");
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_export(settings: &Settings, prefix: &str, output: &Path, json: bool) -> Result<ExitCode> {
    settings.require_all(&[EnvVarName::SlackBotToken, EnvVarName::SlackSigningSecret])?;
    let slack = SlackClient::new_from_env(settings.require(EnvVarName::SlackBotToken)?)?;

    let report = export_roster(&slack, prefix, output).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(path) = &report.output {
        println!(
            "Exported {} students from {} channels ({} unique members) to {}",
            report.students_written,
            report.channels.len(),
            report.unique_members,
            path
        );
    } else {
        println!("No channels found with prefix '{}'", report.prefix);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_encode_secret(file: &Path, json: bool) -> Result<ExitCode> {
    let text = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    // Parse first so a malformed roster is caught before it becomes a secret.
    Roster::parse(&text).with_context(|| format!("{} is not a valid roster", file.display()))?;
    let encoded = encode_secret(&text);
    if json {
        println!("{}", serde_json::json!({ "STUDENTS_DATA": encoded }));
    } else {
        println!("STUDENTS_DATA for GitHub Secret:{encoded}");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_schedule(workflow: Option<&Path>, count: usize, json: bool) -> Result<ExitCode> {
    // Without --workflow, prefer the repository's workflow when run from its root.
    let workflow = workflow.or_else(|| Some(Path::new(WORKFLOW_PATH)).filter(|path| path.exists()));
    let (source, schedules) = match workflow {
        Some(path) => {
            let yaml = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let schedules =
                schedule_from_workflow(&yaml).with_context(|| format!("reading schedule from {}", path.display()))?;
            (path.display().to_string(), schedules)
        }
        None => ("built-in default".to_string(), vec![CronSchedule::parse(DEFAULT_SCHEDULE)?]),
    };

    let now = Utc::now();
    let mut out = Vec::new();
    for schedule in &schedules {
        let times = schedule.upcoming(now, count);
        if json {
            out.push(serde_json::json!({
                "cron": schedule.expression(),
                "next": times.iter().map(|t| t.to_rfc3339()).collect::<Vec<_>>(),
            }));
        } else {
            println!("{schedule} ({source})");
            for time in times {
                println!("  {}", time.format("%a %Y-%m-%d %H:%M UTC"));
            }
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookcheck_types::{StudentResult, WeekWindow};
    use chrono::TimeZone;

    fn report(dry_run: bool, outcomes: Vec<StudentOutcome>) -> RunReport {
        RunReport {
            week: WeekWindow {
                start: Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 5, 10, 23, 59, 59).unwrap(),
            },
            api_calls: 1,
            scheduled_emails: Default::default(),
            failed_event_lookups: 0,
            dry_run,
            students: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, outcome)| StudentResult {
                    name: format!("student{i}"),
                    email: format!("student{i}@example.com"),
                    outcome,
                })
                .collect(),
        }
    }

    #[test]
    fn dry_run_summary_does_not_claim_sends() {
        let summary = summary_line(&report(
            true,
            vec![StudentOutcome::WouldSend, StudentOutcome::WouldSend, StudentOutcome::AlreadyScheduled],
        ));
        assert_eq!(summary, "Summary (dry run): 2 would be reminded, 1 already scheduled, 0 skipped");
        assert!(!summary.contains("sent"));
    }

    #[test]
    fn live_summary_counts_sends_and_failures() {
        let summary = summary_line(&report(
            false,
            vec![
                StudentOutcome::Sent,
                StudentOutcome::SkippedNoSlackId,
                StudentOutcome::Failed { error: "channel_not_found".into() },
            ],
        ));
        assert_eq!(summary, "Summary: 1 sent, 0 already scheduled, 1 skipped, 1 failed");
    }
}
