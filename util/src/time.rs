//! Deadline parsing and human readable durations.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeadlineParseError {
    #[error("deadline must look like `HH:mm` or `HH:mm dd/mm/yyyy`")]
    Format,
    #[error("deadline does not name a real date or time")]
    OutOfRange,
}

/// Fixed offset used to interpret administrator-typed wall clock times.
pub fn offset_from_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.clamp(-23, 23) * 3600).unwrap_or_else(|| Utc.fix())
}

/// Parses `HH:mm` (today, in `offset`) or `HH:mm dd/mm/yyyy` into an absolute instant.
///
/// Whether the instant lies in the future is left to the caller.
pub fn parse_deadline(
    input: &str,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<DateTime<Utc>, DeadlineParseError> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let (time_part, date) = match parts.as_slice() {
        [time] => (*time, now.with_timezone(&offset).date_naive()),
        [time, date] => (*time, parse_date(date)?),
        _ => return Err(DeadlineParseError::Format),
    };
    let time = parse_time(time_part)?;

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(DeadlineParseError::OutOfRange)
}

fn parse_time(raw: &str) -> Result<NaiveTime, DeadlineParseError> {
    let (h, m) = raw.split_once(':').ok_or(DeadlineParseError::Format)?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return Err(DeadlineParseError::Format);
    }
    let hour: u32 = h.parse().map_err(|_| DeadlineParseError::Format)?;
    let minute: u32 = m.parse().map_err(|_| DeadlineParseError::Format)?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or(DeadlineParseError::OutOfRange)
}

fn parse_date(raw: &str) -> Result<NaiveDate, DeadlineParseError> {
    let fields: Vec<&str> = raw.split('/').collect();
    let [d, m, y] = fields.as_slice() else {
        return Err(DeadlineParseError::Format);
    };
    let day: u32 = d.parse().map_err(|_| DeadlineParseError::Format)?;
    let month: u32 = m.parse().map_err(|_| DeadlineParseError::Format)?;
    let year: i32 = y.parse().map_err(|_| DeadlineParseError::Format)?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or(DeadlineParseError::OutOfRange)
}

/// Renders a duration as `2 days 3 hours 5 minutes`; seconds only appear when
/// nothing larger does. Negative durations are rendered by magnitude.
pub fn format_duration(d: Duration) -> String {
    let total = d.num_seconds().unsigned_abs();
    let days = total / 86_400;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    for (value, unit) in [(days, "day"), (hours, "hour"), (minutes, "minute")] {
        if value > 0 {
            parts.push(plural(value, unit));
        }
    }
    if parts.is_empty() {
        parts.push(plural(seconds, "second"));
    }
    parts.join(" ")
}

fn plural(value: u64, unit: &str) -> String {
    if value == 1 {
        format!("{value} {unit}")
    } else {
        format!("{value} {unit}s")
    }
}
