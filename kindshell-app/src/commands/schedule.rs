//! Splitting a `schedule` line into its time expression and its sentence.

use chrono::{DateTime, Local};
use kindshell_tasks::parse_trigger_time;
use thiserror::Error;

/// Longest time expression tried, in words ("in 10 minutes", "7:45 p.m.").
const MAX_TIME_WORDS: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleSyntaxError {
    #[error("usage: schedule at <time> <command> | schedule <command> at <time>")]
    Usage,
    #[error("missing command after the time")]
    MissingCommand,
    #[error("invalid time: '{0}'")]
    InvalidTime(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub time_text: String,
    pub command_text: String,
}

/// Accepts `at <time> <sentence>` and the older `<sentence> at <time>`.
pub fn parse_schedule_args(
    args: &str,
    now: DateTime<Local>,
) -> Result<ScheduleRequest, ScheduleSyntaxError> {
    let words: Vec<&str> = args.split_whitespace().collect();
    match words.first() {
        None => Err(ScheduleSyntaxError::Usage),
        Some(first) if first.eq_ignore_ascii_case("at") => leading_time(&words[1..], now),
        Some(_) => trailing_time(&words),
    }
}

fn leading_time(
    words: &[&str],
    now: DateTime<Local>,
) -> Result<ScheduleRequest, ScheduleSyntaxError> {
    let Some(first) = words.first() else {
        return Err(ScheduleSyntaxError::Usage);
    };

    // prefer the longest prefix that reads as a time and leaves a sentence
    let longest = MAX_TIME_WORDS.min(words.len());
    for len in (1..=longest).rev() {
        let time_text = words[..len].join(" ");
        if parse_trigger_time(&time_text, now).is_err() {
            continue;
        }
        if len == words.len() {
            return Err(ScheduleSyntaxError::MissingCommand);
        }
        return Ok(ScheduleRequest {
            time_text,
            command_text: words[len..].join(" "),
        });
    }

    Err(ScheduleSyntaxError::InvalidTime(first.to_string()))
}

fn trailing_time(words: &[&str]) -> Result<ScheduleRequest, ScheduleSyntaxError> {
    let at = words
        .iter()
        .rposition(|w| w.eq_ignore_ascii_case("at"))
        .ok_or(ScheduleSyntaxError::Usage)?;

    let command_text = words[..at].join(" ");
    let time_text = words[at + 1..].join(" ");
    if command_text.is_empty() || time_text.is_empty() {
        return Err(ScheduleSyntaxError::Usage);
    }

    Ok(ScheduleRequest {
        time_text,
        command_text,
    })
}
