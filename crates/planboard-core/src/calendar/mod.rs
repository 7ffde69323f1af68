//! Calendar events and time windows.
//!
//! Events are the records the conflict detector compares. They are created
//! and updated through the storage layer; deletion only flips `deleted`.

pub mod conflict;
pub mod reminder;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use conflict::{
    detect_conflicts, AllAttendees, AttendeeFilter, Conflict, ConflictDetector, ResponsePolicy,
};
pub use reminder::{scan_reminders, ReminderAlert};

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window starting at `start` lasting `minutes`.
    pub fn starting_at(start: DateTime<Utc>, minutes: i64) -> Result<Self, ValidationError> {
        let length = Duration::try_minutes(minutes)
            .ok_or_else(|| out_of_range(format!("{minutes} minutes")))?;
        Self::lasting(start, length)
    }

    /// Window starting at `start` lasting `length`, failing instead of
    /// overflowing past the representable range.
    pub fn lasting(start: DateTime<Utc>, length: Duration) -> Result<Self, ValidationError> {
        let end = start
            .checked_add_signed(length)
            .ok_or_else(|| out_of_range(length))?;
        Self::new(start, end)
    }

    /// Each window starts strictly before the other ends.
    ///
    /// Back-to-back windows sharing only an instant do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The common part of two windows, if any.
    pub fn intersection(&self, other: &TimeWindow) -> Option<TimeWindow> {
        if !self.overlaps(other) {
            return None;
        }
        Some(TimeWindow {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

fn out_of_range(length: impl std::fmt::Display) -> ValidationError {
    ValidationError::InvalidValue {
        field: "duration".to_string(),
        message: format!("{length} runs past the supported date range"),
    }
}

/// Scheduling status of an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

/// An attendee's answer to an invitation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeResponse {
    Accepted,
    Declined,
    Tentative,
    #[default]
    NeedsAction,
}

/// A calendar event with its attendees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Identifiers of invited people
    pub attendees: BTreeSet<String>,
    /// Per-attendee answers; attendees missing here have not answered
    #[serde(default)]
    pub responses: BTreeMap<String, AttendeeResponse>,
    #[serde(default)]
    pub status: EventStatus,
    /// Minutes before the start at which attendees get a reminder
    #[serde(default)]
    pub reminder_minutes: BTreeSet<u32>,
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub milestone_id: Option<String>,
    /// Soft-delete flag
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Create a confirmed event with a fresh id.
    pub fn new<I, S>(title: impl Into<String>, window: TimeWindow, attendees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Utc::now();
        Self {
            id: format!("event-{}", uuid::Uuid::new_v4()),
            title: title.into(),
            window,
            attendees: attendees.into_iter().map(Into::into).collect(),
            responses: BTreeMap::new(),
            status: EventStatus::Confirmed,
            reminder_minutes: BTreeSet::new(),
            project_id: None,
            task_id: None,
            milestone_id: None,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_reminders(mut self, minutes: impl IntoIterator<Item = u32>) -> Self {
        self.reminder_minutes = minutes.into_iter().collect();
        self
    }

    /// Answer recorded for `attendee`, `NeedsAction` when none.
    pub fn response_of(&self, attendee: &str) -> AttendeeResponse {
        self.responses.get(attendee).copied().unwrap_or_default()
    }

    /// Whether this event belongs in a conflict comparison set.
    pub fn is_comparable(&self) -> bool {
        !self.deleted && self.status != EventStatus::Cancelled
    }
}
