//! Meeting reminders.
//!
//! Same lead-time rule as deadline warnings, measured in minutes before an
//! event's start instead of days before a due date.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::CalendarEvent;
use crate::deadline::NotifiedSet;

/// A reminder that an event starts within `minutes_before`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderAlert {
    pub event_id: String,
    pub minutes_before: u32,
}

/// Reminders due at `now`.
///
/// For every comparable event and every `m` in its `reminder_minutes`, a
/// reminder fires when `start - m minutes <= now < start` and `(event, m)`
/// is not in `already_notified`. Output follows event order, largest lead
/// first.
pub fn scan_reminders(
    now: DateTime<Utc>,
    events: &[CalendarEvent],
    already_notified: &NotifiedSet,
) -> Vec<ReminderAlert> {
    let mut alerts = Vec::new();
    for event in events.iter().filter(|e| e.is_comparable()) {
        let start = event.window.start;
        if now >= start {
            continue;
        }
        for &minutes in event.reminder_minutes.iter().rev() {
            if already_notified.contains(&event.id, minutes) {
                continue;
            }
            let reached = match start.checked_sub_signed(Duration::minutes(i64::from(minutes))) {
                Some(remind_at) => now >= remind_at,
                None => true,
            };
            if reached {
                alerts.push(ReminderAlert {
                    event_id: event.id.clone(),
                    minutes_before: minutes,
                });
            }
        }
    }
    alerts
}
