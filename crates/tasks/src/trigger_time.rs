//! Time expressions accepted by `schedule at <time>`.
//!
//! Clock times ("14:30", "9:05:10", "3pm", "7:45 am", "noon", "midnight")
//! resolve to today, or tomorrow when that instant has already passed.
//! Relative forms ("in 10 minutes", "in 30s") count from `now`. Anything
//! else, including a bare number like "3", is rejected.

use crate::TaskError;
use chrono::{DateTime, Duration, Local, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static CLOCK_24H: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("24h pattern is valid")
});

static CLOCK_12H: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm|a\.m\.|p\.m\.)$").expect("12h pattern is valid")
});

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^in\s+(\d{1,5})\s*(seconds?|secs?|s|minutes?|mins?|m|hours?|hrs?|h)$")
        .expect("relative pattern is valid")
});

pub fn parse_trigger_time(text: &str, now: DateTime<Local>) -> Result<DateTime<Local>, TaskError> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let invalid = || TaskError::InvalidTime(text.trim().to_string());

    if let Some(caps) = RELATIVE.captures(&normalized) {
        let amount: i64 = caps[1].parse().map_err(|_| invalid())?;
        let offset = match &caps[2] {
            unit if unit.starts_with('s') => Duration::seconds(amount),
            unit if unit.starts_with('m') => Duration::minutes(amount),
            _ => Duration::hours(amount),
        };
        return Ok(now + offset);
    }

    let clock = parse_clock(&normalized).ok_or_else(invalid)?;
    next_occurrence(clock, now).ok_or_else(invalid)
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    match text {
        "noon" => return NaiveTime::from_hms_opt(12, 0, 0),
        "midnight" => return NaiveTime::from_hms_opt(0, 0, 0),
        _ => {}
    }

    if let Some(caps) = CLOCK_24H.captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        let second: u32 = match caps.get(3) {
            Some(s) => s.as_str().parse().ok()?,
            None => 0,
        };
        return NaiveTime::from_hms_opt(hour, minute, second);
    }

    if let Some(caps) = CLOCK_12H.captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        if !(1..=12).contains(&hour) {
            return None;
        }
        let pm = caps[3].starts_with('p');
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    None
}

/// Today at `clock`, or tomorrow if that is strictly before `now`.
/// `None` when the wall-clock time does not exist (DST gap).
fn next_occurrence(clock: NaiveTime, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let today = now.date_naive();
    let candidate = today.and_time(clock).and_local_timezone(Local).earliest()?;
    if candidate >= now {
        return Some(candidate);
    }
    today
        .succ_opt()?
        .and_time(clock)
        .and_local_timezone(Local)
        .earliest()
}
