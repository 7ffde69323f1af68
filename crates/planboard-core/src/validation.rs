//! Input validation for records before they are stored or compared.
//!
//! The detector and monitor assume well-formed input; this module is where
//! malformed input gets rejected.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::calendar::CalendarEvent;
use crate::deadline::DeadlineTarget;
use crate::error::ValidationError;

/// Check the event invariants: non-empty title, `end > start`, attendees present.
pub fn validate_event(event: &CalendarEvent) -> Result<(), ValidationError> {
    if event.title.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "title".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    if event.window.end <= event.window.start {
        return Err(ValidationError::InvalidTimeRange {
            start: event.window.start,
            end: event.window.end,
        });
    }
    if event.attendees.iter().all(|a| a.trim().is_empty()) {
        return Err(ValidationError::EmptyAttendees(event.id.clone()));
    }
    Ok(())
}

pub fn validate_target(target: &DeadlineTarget) -> Result<(), ValidationError> {
    if target.title.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "title".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    if target.completed_at.is_some() && target.is_pending() {
        return Err(ValidationError::InvalidValue {
            field: "completed_at".to_string(),
            message: "set on a pending target".to_string(),
        });
    }
    Ok(())
}

/// Parse a timestamp given as RFC 3339, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD`.
///
/// Forms without an offset are read as UTC; a bare date means midnight.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(ValidationError::InvalidValue {
        field: "timestamp".to_string(),
        message: format!("cannot parse '{input}'"),
    })
}

/// Parse a comma-separated list of non-negative offsets, rejecting repeats.
pub fn parse_offsets(input: &str, target_id: &str) -> Result<BTreeSet<u32>, ValidationError> {
    parse_lead_times(input, "warning_offsets", "days", |offset| {
        ValidationError::DuplicateOffset {
            target_id: target_id.to_string(),
            offset_days: offset,
        }
    })
}

/// Parse comma-separated meeting reminder leads in minutes, rejecting repeats.
pub fn parse_reminders(input: &str, event_id: &str) -> Result<BTreeSet<u32>, ValidationError> {
    parse_lead_times(input, "reminder_minutes", "minutes", |minutes| {
        ValidationError::InvalidValue {
            field: "reminder_minutes".to_string(),
            message: format!("{minutes} listed more than once on event '{event_id}'"),
        }
    })
}

fn parse_lead_times(
    input: &str,
    field: &str,
    unit: &str,
    duplicate: impl Fn(u32) -> ValidationError,
) -> Result<BTreeSet<u32>, ValidationError> {
    let mut leads = BTreeSet::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let lead: u32 = part.parse().map_err(|_| ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("'{part}' is not a non-negative whole number of {unit}"),
        })?;
        if !leads.insert(lead) {
            return Err(duplicate(lead));
        }
    }
    Ok(leads)
}

/// Parse a comma-separated attendee list, dropping blanks.
pub fn parse_attendees(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
