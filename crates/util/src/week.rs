//! # Week Window Handling
//!
//! Computes the Monday-to-Friday window a notification run checks and
//! renders its bounds in the timestamp form the Calendly API accepts.

use bookcheck_types::WeekWindow;
use chrono::{DateTime, Datelike, Duration, NaiveTime, SecondsFormat, Utc};

/// The working week (Monday 00:00 to Friday 23:59:59.999999 UTC) containing `now`.
///
/// Saturday and Sunday belong to the week that started on the preceding
/// Monday, so on a weekend the returned window is already in the past.
pub fn week_containing(now: DateTime<Utc>) -> WeekWindow {
    let days_from_monday = i64::from(now.weekday().num_days_from_monday());
    let monday = now.date_naive() - Duration::days(days_from_monday);
    let friday = monday + Duration::days(4);

    let end_of_day = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN);
    WeekWindow {
        start: monday.and_time(NaiveTime::MIN).and_utc(),
        end: friday.and_time(end_of_day).and_utc(),
    }
}

/// Render a timestamp as RFC 3339 UTC with microseconds, e.g. `2024-05-06T00:00:00.000000Z`.
pub fn calendly_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
