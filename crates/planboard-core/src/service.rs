//! Service layer tying the pure detector and monitor to storage.
//!
//! - [`ConflictChecker`] loads the comparison set for a candidate event and
//!   runs the detector with the configured attendee filter. Its `create` and
//!   `update` check and write under one write lock.
//! - [`DeadlineScanner`] runs the deadline scans and the meeting reminder
//!   scan and records what fired in the alert ledger, inside one write
//!   transaction.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{
    scan_reminders, AttendeeFilter, CalendarEvent, Conflict, ConflictDetector, ReminderAlert,
    ResponsePolicy, TimeWindow,
};
use crate::deadline::{scan, scan_overdue, AlertEvent, DeadlineTarget, OverdueAlert};
use crate::error::Result;
use crate::events::DomainEvent;
use crate::storage::{Config, PlanDb};

/// Result of [`ConflictChecker::create`] or [`ConflictChecker::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Written, possibly alongside conflicts when not strict.
    Saved {
        event: CalendarEvent,
        conflicts: Vec<Conflict>,
    },
    /// Strict save refused; nothing was written.
    Rejected { conflicts: Vec<Conflict> },
}

/// Checks calendar events against what is already stored.
pub struct ConflictChecker<F = ResponsePolicy> {
    detector: ConflictDetector<F>,
}

impl ConflictChecker<ResponsePolicy> {
    pub fn from_config(config: &Config) -> Self {
        Self::with_filter(config.response_policy())
    }
}

impl<F: AttendeeFilter> ConflictChecker<F> {
    pub fn with_filter(filter: F) -> Self {
        Self {
            detector: ConflictDetector::with_filter(filter),
        }
    }

    /// Conflicts between `candidate` and stored comparable events.
    pub fn check(&self, db: &PlanDb, candidate: &CalendarEvent) -> Result<Vec<Conflict>> {
        let existing = db.list_comparable_events(&candidate.window)?;
        let conflicts = self.detector.report(candidate, &existing);
        tracing::debug!(
            event_id = %candidate.id,
            compared = existing.len(),
            conflicts = conflicts.len(),
            "checked calendar conflicts"
        );
        Ok(conflicts)
    }

    /// Same as [`check`](Self::check), wrapped as a domain event when non-empty.
    pub fn check_event(
        &self,
        db: &PlanDb,
        candidate: &CalendarEvent,
        at: DateTime<Utc>,
    ) -> Result<Option<DomainEvent>> {
        let conflicts = self.check(db, candidate)?;
        if conflicts.is_empty() {
            return Ok(None);
        }
        tracing::info!(
            event_id = %candidate.id,
            conflicts = conflicts.len(),
            "calendar conflict detected"
        );
        Ok(Some(DomainEvent::ConflictDetected {
            event_id: candidate.id.clone(),
            conflicts,
            at,
        }))
    }

    /// Store a new event. With `strict`, refuse when it conflicts.
    ///
    /// The check and the insert share one immediate transaction, so two
    /// concurrent strict saves cannot both pass the check.
    pub fn create(&self, db: &PlanDb, event: &CalendarEvent, strict: bool) -> Result<SaveOutcome> {
        self.save_with(db, event, strict, |db| {
            db.create_event(event)?;
            Ok(event.clone())
        })
    }

    /// Overwrite a stored event. With `strict`, refuse when the new version
    /// conflicts.
    pub fn update(&self, db: &PlanDb, event: &CalendarEvent, strict: bool) -> Result<SaveOutcome> {
        self.save_with(db, event, strict, |db| db.update_event(event))
    }

    fn save_with(
        &self,
        db: &PlanDb,
        event: &CalendarEvent,
        strict: bool,
        write: impl FnOnce(&PlanDb) -> Result<CalendarEvent>,
    ) -> Result<SaveOutcome> {
        db.immediate(|db| {
            let conflicts = if event.is_comparable() {
                self.check(db, event)?
            } else {
                Vec::new()
            };
            if strict && !conflicts.is_empty() {
                tracing::info!(
                    event_id = %event.id,
                    conflicts = conflicts.len(),
                    "strict save refused"
                );
                return Ok(SaveOutcome::Rejected { conflicts });
            }
            let event = write(db)?;
            Ok(SaveOutcome::Saved { event, conflicts })
        })
    }

    /// Stored events keeping any of `attendees` busy during `window`.
    pub fn busy(
        &self,
        db: &PlanDb,
        window: &TimeWindow,
        attendees: &BTreeSet<String>,
    ) -> Result<Vec<Conflict>> {
        let existing = db.list_comparable_events(window)?;
        Ok(self.detector.busy(window, attendees, &existing))
    }
}

/// Result of one deadline scan run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub warnings: Vec<AlertEvent>,
    pub overdue: Vec<OverdueAlert>,
    pub reminders: Vec<ReminderAlert>,
    pub events: Vec<DomainEvent>,
}

impl ScanOutcome {
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.overdue.is_empty() && self.reminders.is_empty()
    }
}

/// Runs the deadline monitor against the store.
#[derive(Debug, Clone)]
pub struct DeadlineScanner {
    overdue_hours: BTreeSet<u32>,
}

impl DeadlineScanner {
    pub fn new(overdue_hours: BTreeSet<u32>) -> Self {
        Self { overdue_hours }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.overdue_hours())
    }

    /// Scan targets and upcoming meetings at `now` and record every alert
    /// that fired.
    ///
    /// Reading the ledger and recording new entries happen in one immediate
    /// transaction, so overlapping runs cannot both emit the same alert.
    pub fn run(&self, db: &PlanDb, now: DateTime<Utc>) -> Result<ScanOutcome> {
        let outcome = db.immediate(|db| {
            let targets = db.list_pending_targets()?;
            let upcoming = db.list_upcoming_events(now)?;
            let warned = db.notified_warnings()?;
            let reminded = db.notified_overdue()?;
            let nudged = db.notified_reminders()?;

            let warnings = scan(now, &targets, &warned);
            let overdue = scan_overdue(now, &targets, &self.overdue_hours, &reminded);
            let reminders = scan_reminders(now, &upcoming, &nudged);
            db.record_alerts(&warnings, &overdue, now)?;
            db.record_reminders(&reminders, now)?;

            let mut events = Self::domain_events(&targets, &warnings, &overdue, now);
            events.extend(Self::reminder_events(&upcoming, &reminders, now));
            Ok(ScanOutcome {
                warnings,
                overdue,
                reminders,
                events,
            })
        })?;

        tracing::info!(
            warnings = outcome.warnings.len(),
            overdue = outcome.overdue.len(),
            reminders = outcome.reminders.len(),
            at = %now,
            "deadline scan finished"
        );
        Ok(outcome)
    }

    fn domain_events(
        targets: &[DeadlineTarget],
        warnings: &[AlertEvent],
        overdue: &[OverdueAlert],
        now: DateTime<Utc>,
    ) -> Vec<DomainEvent> {
        let by_id: HashMap<&str, &DeadlineTarget> =
            targets.iter().map(|t| (t.id.as_str(), t)).collect();

        let approaching = warnings.iter().filter_map(|alert| {
            by_id
                .get(alert.target_id.as_str())
                .map(|target| DomainEvent::approaching(target, alert, now))
        });
        let late = overdue.iter().filter_map(|alert| {
            by_id
                .get(alert.target_id.as_str())
                .map(|target| DomainEvent::overdue(target, alert, now))
        });
        approaching.chain(late).collect()
    }

    fn reminder_events(
        upcoming: &[CalendarEvent],
        reminders: &[ReminderAlert],
        now: DateTime<Utc>,
    ) -> Vec<DomainEvent> {
        let by_id: HashMap<&str, &CalendarEvent> =
            upcoming.iter().map(|e| (e.id.as_str(), e)).collect();
        reminders
            .iter()
            .filter_map(|alert| {
                by_id
                    .get(alert.event_id.as_str())
                    .map(|event| DomainEvent::reminder(event, alert, now))
            })
            .collect()
    }
}
