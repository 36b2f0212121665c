//! Five-field cron expressions, as used by CI schedule triggers.
//!
//! Fields are minute, hour, day-of-month, month and day-of-week, evaluated
//! in UTC. Each field accepts `*`, a number, a range `a-b`, a step (`*/n`,
//! `a-b/n` or `a/n`) or a comma-separated list of those. Day-of-week accepts
//! 0-7 where both 0 and 7 mean Sunday. Month and weekday names are not
//! supported.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Datelike, Duration, DurationRound, NaiveTime, Timelike, Utc};
use serde_yaml::Value;
use thiserror::Error;

/// The schedule the bundled workflow runs on: 09:00 UTC on Tuesdays and Thursdays.
pub const DEFAULT_SCHEDULE: &str = "0 9 * * 2,4";

/// Location of the scheduled workflow relative to the repository root.
pub const WORKFLOW_PATH: &str = ".github/workflows/notify.yml";

/// How far ahead `next_after` searches before giving up.
const SEARCH_HORIZON_DAYS: i64 = 366 * 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
    #[error("cron expression '{expression}' has {found} fields; expected 5")]
    FieldCount { expression: String, found: usize },

    #[error("invalid {field} field '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("workflow is not valid YAML: {0}")]
    Yaml(String),

    #[error("workflow declares no schedule trigger")]
    NoSchedule,
}

struct FieldBounds {
    name: &'static str,
    min: u32,
    max: u32,
}

const MINUTE: FieldBounds = FieldBounds { name: "minute", min: 0, max: 59 };
const HOUR: FieldBounds = FieldBounds { name: "hour", min: 0, max: 23 };
const DAY_OF_MONTH: FieldBounds = FieldBounds { name: "day-of-month", min: 1, max: 31 };
const MONTH: FieldBounds = FieldBounds { name: "month", min: 1, max: 12 };
const DAY_OF_WEEK: FieldBounds = FieldBounds { name: "day-of-week", min: 0, max: 7 };

/// A parsed cron schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
    minutes: BTreeSet<u32>,
    hours: BTreeSet<u32>,
    days_of_month: BTreeSet<u32>,
    months: BTreeSet<u32>,
    /// 0 = Sunday .. 6 = Saturday.
    days_of_week: BTreeSet<u32>,
    day_of_month_restricted: bool,
    day_of_week_restricted: bool,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = fields[..] else {
            return Err(CronError::FieldCount {
                expression: expression.to_string(),
                found: fields.len(),
            });
        };

        let days_of_week = parse_field(day_of_week, &DAY_OF_WEEK)?
            .into_iter()
            .map(|day| day % 7)
            .collect();

        Ok(Self {
            expression: fields.join(" "),
            minutes: parse_field(minute, &MINUTE)?,
            hours: parse_field(hour, &HOUR)?,
            days_of_month: parse_field(day_of_month, &DAY_OF_MONTH)?,
            months: parse_field(month, &MONTH)?,
            days_of_week,
            day_of_month_restricted: !day_of_month.starts_with('*'),
            day_of_week_restricted: !day_of_week.starts_with('*'),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// True when the schedule fires at the minute containing `at`.
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        self.minutes.contains(&at.minute())
            && self.hours.contains(&at.hour())
            && self.months.contains(&at.month())
            && self.day_matches(at)
    }

    fn day_matches(&self, at: DateTime<Utc>) -> bool {
        let day_of_month = self.days_of_month.contains(&at.day());
        let day_of_week = self.days_of_week.contains(&at.weekday().num_days_from_sunday());
        if self.day_of_month_restricted && self.day_of_week_restricted {
            day_of_month || day_of_week
        } else {
            day_of_month && day_of_week
        }
    }

    /// The first trigger time strictly after `after`, if one exists within five years.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.duration_trunc(Duration::minutes(1)).ok()? + Duration::minutes(1);
        let first_day = start.date_naive();

        for offset in 0..SEARCH_HORIZON_DAYS {
            let date = first_day + Duration::days(offset);
            let midnight = date.and_time(NaiveTime::MIN).and_utc();
            if !self.months.contains(&midnight.month()) || !self.day_matches(midnight) {
                continue;
            }
            for hour in &self.hours {
                for minute in &self.minutes {
                    let candidate = midnight + Duration::hours(i64::from(*hour)) + Duration::minutes(i64::from(*minute));
                    if candidate >= start {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// The next `count` trigger times after `after`.
    pub fn upcoming(&self, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut times = Vec::with_capacity(count);
        let mut cursor = after;
        while times.len() < count {
            let Some(next) = self.next_after(cursor) else {
                break;
            };
            times.push(next);
            cursor = next;
        }
        times
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl std::str::FromStr for CronSchedule {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_field(text: &str, bounds: &FieldBounds) -> Result<BTreeSet<u32>, CronError> {
    let invalid = |reason: String| CronError::InvalidField {
        field: bounds.name,
        value: text.to_string(),
        reason,
    };

    let mut values = BTreeSet::new();
    for part in text.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step.parse().map_err(|_| invalid(format!("step '{step}' is not a number")))?;
                if step == 0 {
                    return Err(invalid("step must be greater than zero".into()));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (low, high) = if range == "*" {
            (bounds.min, bounds.max)
        } else if let Some((low, high)) = range.split_once('-') {
            (parse_value(low, bounds, &invalid)?, parse_value(high, bounds, &invalid)?)
        } else {
            let value = parse_value(range, bounds, &invalid)?;
            // `a/n` runs from `a` to the end of the field's range.
            (value, if step.is_some() { bounds.max } else { value })
        };

        if low > high {
            return Err(invalid(format!("range {low}-{high} is inverted")));
        }
        values.extend((low..=high).step_by(step.unwrap_or(1) as usize));
    }
    Ok(values)
}

fn parse_value(text: &str, bounds: &FieldBounds, invalid: &impl Fn(String) -> CronError) -> Result<u32, CronError> {
    let value: u32 = text
        .parse()
        .map_err(|_| invalid(format!("'{text}' is not a number")))?;
    if value < bounds.min || value > bounds.max {
        return Err(invalid(format!("{value} is outside {}-{}", bounds.min, bounds.max)));
    }
    Ok(value)
}

/// Read the `on.schedule[*].cron` entries of a GitHub Actions workflow.
pub fn schedule_from_workflow(yaml: &str) -> Result<Vec<CronSchedule>, CronError> {
    let document: Value = serde_yaml::from_str(yaml).map_err(|error| CronError::Yaml(error.to_string()))?;
    let schedules: Vec<CronSchedule> = document
        .get("on")
        .and_then(|on| on.get("schedule"))
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("cron").and_then(Value::as_str))
        .map(CronSchedule::parse)
        .collect::<Result<_, _>>()?;

    if schedules.is_empty() {
        return Err(CronError::NoSchedule);
    }
    Ok(schedules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn default_schedule_fires_tuesday_and_thursday_at_nine() {
        let schedule = CronSchedule::parse(DEFAULT_SCHEDULE).unwrap();
        // Tuesday 2024-05-07 and Thursday 2024-05-09
        assert!(schedule.matches(at(2024, 5, 7, 9, 0)));
        assert!(schedule.matches(at(2024, 5, 9, 9, 0)));
        assert!(!schedule.matches(at(2024, 5, 8, 9, 0)));
        assert!(!schedule.matches(at(2024, 5, 7, 9, 1)));
        assert!(!schedule.matches(at(2024, 5, 7, 10, 0)));
    }

    #[test]
    fn next_trigger_alternates_between_tuesday_and_thursday() {
        let schedule = CronSchedule::parse(DEFAULT_SCHEDULE).unwrap();
        let tuesday = at(2024, 5, 7, 9, 0);
        let thursday = schedule.next_after(tuesday).unwrap();
        assert_eq!(thursday, at(2024, 5, 9, 9, 0));
        let next_tuesday = schedule.next_after(thursday).unwrap();
        assert_eq!(next_tuesday, at(2024, 5, 14, 9, 0));
        assert_eq!(next_tuesday.weekday(), Weekday::Tue);
    }

    #[test]
    fn next_after_is_strict_within_the_same_minute() {
        let schedule = CronSchedule::parse(DEFAULT_SCHEDULE).unwrap();
        let just_before = at(2024, 5, 7, 8, 59);
        assert_eq!(schedule.next_after(just_before), Some(at(2024, 5, 7, 9, 0)));
        let mid_minute = at(2024, 5, 7, 9, 0) + Duration::seconds(30);
        assert_eq!(schedule.next_after(mid_minute), Some(at(2024, 5, 9, 9, 0)));
    }

    #[test]
    fn upcoming_lists_consecutive_triggers() {
        let schedule = CronSchedule::parse(DEFAULT_SCHEDULE).unwrap();
        let times = schedule.upcoming(at(2024, 5, 6, 0, 0), 4);
        let days: Vec<u32> = times.iter().map(|t| t.day()).collect();
        assert_eq!(days, [7, 9, 14, 16]);
    }

    #[test]
    fn steps_ranges_and_sunday_aliases() {
        let schedule = CronSchedule::parse("*/15 8-10 * * 7").unwrap();
        // Sunday 2024-05-12
        assert!(schedule.matches(at(2024, 5, 12, 8, 45)));
        assert!(!schedule.matches(at(2024, 5, 12, 11, 0)));
        assert!(!schedule.matches(at(2024, 5, 12, 8, 10)));

        let offset = CronSchedule::parse("5/20 * * * *").unwrap();
        assert!(offset.matches(at(2024, 5, 12, 3, 45)));
        assert!(!offset.matches(at(2024, 5, 12, 3, 0)));
    }

    #[test]
    fn restricted_day_fields_match_either() {
        // The 1st of the month or any Monday.
        let schedule = CronSchedule::parse("0 0 1 * 1").unwrap();
        assert!(schedule.matches(at(2024, 5, 1, 0, 0))); // Wednesday the 1st
        assert!(schedule.matches(at(2024, 5, 6, 0, 0))); // Monday the 6th
        assert!(!schedule.matches(at(2024, 5, 7, 0, 0)));
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(matches!(CronSchedule::parse("0 9 * *"), Err(CronError::FieldCount { found: 4, .. })));
        assert!(matches!(
            CronSchedule::parse("60 9 * * *"),
            Err(CronError::InvalidField { field: "minute", .. })
        ));
        assert!(CronSchedule::parse("0 9 * * 5-2").is_err());
        assert!(CronSchedule::parse("*/0 9 * * *").is_err());
        assert!(CronSchedule::parse("0 9 * * mon").is_err());
    }

    #[test]
    fn impossible_dates_never_fire() {
        let schedule = CronSchedule::parse("0 0 31 2 *").unwrap();
        assert_eq!(schedule.next_after(at(2024, 1, 1, 0, 0)), None);
    }

    #[test]
    fn reads_schedule_from_workflow_yaml() {
        let yaml = "on:\n  schedule:\n    - cron: '0 9 * * 2,4'\n  workflow_dispatch:\n";
        let schedules = schedule_from_workflow(yaml).unwrap();
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].expression(), DEFAULT_SCHEDULE);

        assert_eq!(schedule_from_workflow("on:\n  workflow_dispatch:\n"), Err(CronError::NoSchedule));
    }
}
