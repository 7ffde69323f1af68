//! Calendar conflict detection.
//!
//! Two events conflict when they share at least one attendee and their
//! windows overlap under half-open semantics. Detection is a pure query over
//! a snapshot; callers decide which events make up the comparison set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{AttendeeResponse, CalendarEvent, TimeWindow};

/// Decides whether an attendee of an event takes part in conflict checks.
///
/// Lets the caller drop declined or tentative attendees without the
/// detector knowing about response semantics.
pub trait AttendeeFilter {
    fn counts(&self, event: &CalendarEvent, attendee: &str) -> bool;
}

impl<F> AttendeeFilter for F
where
    F: Fn(&CalendarEvent, &str) -> bool,
{
    fn counts(&self, event: &CalendarEvent, attendee: &str) -> bool {
        self(event, attendee)
    }
}

/// Every invited attendee counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllAttendees;

impl AttendeeFilter for AllAttendees {
    fn counts(&self, _event: &CalendarEvent, _attendee: &str) -> bool {
        true
    }
}

/// Drops attendees based on their recorded response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponsePolicy {
    pub exclude_declined: bool,
    pub exclude_tentative: bool,
}

impl ResponsePolicy {
    pub fn exclude_declined() -> Self {
        Self {
            exclude_declined: true,
            exclude_tentative: false,
        }
    }
}

impl AttendeeFilter for ResponsePolicy {
    fn counts(&self, event: &CalendarEvent, attendee: &str) -> bool {
        match event.response_of(attendee) {
            AttendeeResponse::Declined => !self.exclude_declined,
            AttendeeResponse::Tentative => !self.exclude_tentative,
            AttendeeResponse::Accepted | AttendeeResponse::NeedsAction => true,
        }
    }
}

/// One existing event clashing with the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub event_id: String,
    pub shared_attendees: BTreeSet<String>,
    pub overlap: TimeWindow,
}

/// Conflict detector parameterized by an attendee filter.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector<F = AllAttendees> {
    filter: F,
}

impl ConflictDetector<AllAttendees> {
    pub fn new() -> Self {
        Self {
            filter: AllAttendees,
        }
    }
}

impl<F: AttendeeFilter> ConflictDetector<F> {
    pub fn with_filter(filter: F) -> Self {
        Self { filter }
    }

    /// Ids of existing events conflicting with `candidate`.
    pub fn detect(&self, candidate: &CalendarEvent, existing: &[CalendarEvent]) -> BTreeSet<String> {
        self.report(candidate, existing)
            .into_iter()
            .map(|c| c.event_id)
            .collect()
    }

    /// Detailed conflicts for `candidate`, ordered by overlap start then id.
    ///
    /// The candidate's own id is skipped so an update never conflicts with
    /// the stored version of itself.
    pub fn report(&self, candidate: &CalendarEvent, existing: &[CalendarEvent]) -> Vec<Conflict> {
        let attendees: BTreeSet<&str> = candidate
            .attendees
            .iter()
            .map(String::as_str)
            .filter(|a| self.filter.counts(candidate, a))
            .collect();
        self.collect(&candidate.window, &attendees, Some(&candidate.id), existing)
    }

    /// Conflicts for a bare time range and set of people.
    ///
    /// Used when checking availability before an event exists.
    pub fn busy(
        &self,
        window: &TimeWindow,
        attendees: &BTreeSet<String>,
        existing: &[CalendarEvent],
    ) -> Vec<Conflict> {
        let attendees: BTreeSet<&str> = attendees.iter().map(String::as_str).collect();
        self.collect(window, &attendees, None, existing)
    }

    fn collect(
        &self,
        window: &TimeWindow,
        attendees: &BTreeSet<&str>,
        skip_id: Option<&str>,
        existing: &[CalendarEvent],
    ) -> Vec<Conflict> {
        if attendees.is_empty() {
            return Vec::new();
        }

        let mut conflicts: Vec<Conflict> = existing
            .iter()
            .filter(|other| !other.deleted)
            .filter(|other| skip_id != Some(other.id.as_str()))
            .filter_map(|other| {
                let overlap = window.intersection(&other.window)?;
                let shared: BTreeSet<String> = other
                    .attendees
                    .iter()
                    .filter(|a| attendees.contains(a.as_str()))
                    .filter(|a| self.filter.counts(other, a))
                    .cloned()
                    .collect();
                if shared.is_empty() {
                    return None;
                }
                Some(Conflict {
                    event_id: other.id.clone(),
                    shared_attendees: shared,
                    overlap,
                })
            })
            .collect();

        conflicts.sort_by(|a, b| {
            a.overlap
                .start
                .cmp(&b.overlap.start)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        conflicts.dedup_by(|a, b| a.event_id == b.event_id);
        conflicts
    }
}

/// Ids of events in `existing` that conflict with `candidate`, counting every
/// attendee.
pub fn detect_conflicts(candidate: &CalendarEvent, existing: &[CalendarEvent]) -> BTreeSet<String> {
    ConflictDetector::new().detect(candidate, existing)
}
