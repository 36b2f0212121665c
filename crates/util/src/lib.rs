pub mod config;
pub mod cron;
pub mod http;
pub mod roster;
pub mod week;

pub use config::{ConfigError, EnvVarName, Settings};
pub use cron::{CronError, CronSchedule, DEFAULT_SCHEDULE, schedule_from_workflow};
pub use roster::{Roster, RosterError, encode_secret, students_to_csv};
pub use week::week_containing;

use once_cell::sync::Lazy;
use regex::Regex;

static REDACTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+]+(?: [\w\-\.=:/+]+)?)",
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD|STUDENTS_DATA)=)([^\s]+)",
        r"(xox[abposr]-)([\w-]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("redaction pattern compiles"))
    .collect()
});

/// Redacts values that look like secrets in a string.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for re in REDACTION_PATTERNS.iter() {
        redacted = re
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}
