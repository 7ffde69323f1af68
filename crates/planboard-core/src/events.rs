use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarEvent, Conflict, ReminderAlert};
use crate::deadline::{AlertEvent, DeadlineTarget, OverdueAlert, TargetKind};

/// Notifications produced by conflict checks and deadline scans.
/// An external dispatcher turns these into email, in-app or webhook messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    #[serde(rename = "calendar.conflict.detected")]
    ConflictDetected {
        event_id: String,
        conflicts: Vec<Conflict>,
        at: DateTime<Utc>,
    },
    #[serde(rename = "deadline.approaching")]
    DeadlineApproaching {
        target_id: String,
        kind: TargetKind,
        title: String,
        due: DateTime<Utc>,
        offset_days: u32,
        at: DateTime<Utc>,
    },
    #[serde(rename = "meeting.reminder")]
    MeetingReminder {
        event_id: String,
        title: String,
        start: DateTime<Utc>,
        attendees: Vec<String>,
        minutes_before: u32,
        at: DateTime<Utc>,
    },
    #[serde(rename = "task.overdue")]
    TaskOverdue {
        target_id: String,
        title: String,
        due: DateTime<Utc>,
        hours_overdue: u32,
        at: DateTime<Utc>,
    },
    #[serde(rename = "milestone.overdue")]
    MilestoneOverdue {
        target_id: String,
        title: String,
        due: DateTime<Utc>,
        hours_overdue: u32,
        at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Dotted event name, as used in the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::ConflictDetected { .. } => "calendar.conflict.detected",
            DomainEvent::DeadlineApproaching { .. } => "deadline.approaching",
            DomainEvent::MeetingReminder { .. } => "meeting.reminder",
            DomainEvent::TaskOverdue { .. } => "task.overdue",
            DomainEvent::MilestoneOverdue { .. } => "milestone.overdue",
        }
    }

    pub fn approaching(target: &DeadlineTarget, alert: &AlertEvent, at: DateTime<Utc>) -> Self {
        DomainEvent::DeadlineApproaching {
            target_id: alert.target_id.clone(),
            kind: target.kind,
            title: target.title.clone(),
            due: target.due,
            offset_days: alert.offset_days,
            at,
        }
    }

    pub fn reminder(event: &CalendarEvent, alert: &ReminderAlert, at: DateTime<Utc>) -> Self {
        DomainEvent::MeetingReminder {
            event_id: alert.event_id.clone(),
            title: event.title.clone(),
            start: event.window.start,
            attendees: event.attendees.iter().cloned().collect(),
            minutes_before: alert.minutes_before,
            at,
        }
    }

    pub fn overdue(target: &DeadlineTarget, alert: &OverdueAlert, at: DateTime<Utc>) -> Self {
        let target_id = alert.target_id.clone();
        let title = target.title.clone();
        let hours_overdue = alert.hours_overdue;
        match target.kind {
            TargetKind::Task => DomainEvent::TaskOverdue {
                target_id,
                title,
                due: target.due,
                hours_overdue,
                at,
            },
            TargetKind::Milestone => DomainEvent::MilestoneOverdue {
                target_id,
                title,
                due: target.due,
                hours_overdue,
                at,
            },
        }
    }
}
