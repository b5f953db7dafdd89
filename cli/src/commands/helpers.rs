use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;
use std::process;

use caltrack_core::models::MAX_HISTORY_DAYS;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

pub(crate) fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("Invalid time '{s}'. Use HH:MM (24-hour)"))
}

/// When an entry happened. Without `--time`, today means now and any other
/// day means noon.
pub(crate) fn resolve_logged_at(
    date: Option<String>,
    time: Option<&str>,
) -> Result<DateTime<Local>> {
    let now = Local::now();
    let date = parse_date(date)?;
    let time = match time {
        Some(t) => parse_time(t)?,
        None if date == now.date_naive() => return Ok(now),
        None => NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
    };
    local_datetime(date, time)
}

pub(crate) fn local_datetime(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Local>> {
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .with_context(|| format!("{date} {time} does not exist in the local time zone"))
}

/// `--date`/`--time` edits applied on top of an existing RFC 3339 timestamp.
pub(crate) fn shift_logged_at(
    current: &str,
    date: Option<String>,
    time: Option<&str>,
) -> Result<Option<DateTime<Local>>> {
    if date.is_none() && time.is_none() {
        return Ok(None);
    }
    let current = DateTime::parse_from_rfc3339(current)
        .with_context(|| format!("Invalid stored timestamp '{current}'"))?
        .with_timezone(&Local);
    let date = match date {
        Some(d) => parse_date(Some(d))?,
        None => current.date_naive(),
    };
    let time = match time {
        Some(t) => parse_time(t)?,
        None => current.time(),
    };
    local_datetime(date, time).map(Some)
}

pub(crate) fn positive_days(days: u32) -> Result<i64> {
    let days = i64::from(days);
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        bail!("Days must be between 1 and {MAX_HISTORY_DAYS}");
    }
    Ok(days)
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a "nothing found" outcome and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The `HH:MM` part of a stored RFC 3339 timestamp.
pub(crate) fn time_of_day(logged_at: &str) -> String {
    DateTime::parse_from_rfc3339(logged_at)
        .map(|ts| ts.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|_| "?".to_string())
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
