//! Deadline monitor.
//!
//! Pure scans over a snapshot of targets. The caller supplies `now` and the
//! ledger of alerts already sent, and is responsible for persisting whatever
//! the scan returns before the next run.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{DeadlineTarget, NotifiedSet};

/// A warning that a target is due within `offset_days`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub target_id: String,
    pub offset_days: u32,
}

/// A reminder that a target is at least `hours_overdue` past due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueAlert {
    pub target_id: String,
    pub hours_overdue: u32,
}

/// `due - lead`, or `None` when that instant is before the representable range.
fn lead_time(due: DateTime<Utc>, lead: Duration) -> Option<DateTime<Utc>> {
    due.checked_sub_signed(lead)
}

/// Warnings due at `now`.
///
/// For every pending target and every offset `d`, an alert fires when
/// `due - d days <= now < due` and `(target, d)` is not in `already_notified`.
/// Alerts come out in target order, largest offset first. An offset of zero
/// never fires since its window is empty.
pub fn scan(
    now: DateTime<Utc>,
    targets: &[DeadlineTarget],
    already_notified: &NotifiedSet,
) -> Vec<AlertEvent> {
    let mut alerts = Vec::new();
    for target in targets.iter().filter(|t| t.is_pending()) {
        if now >= target.due {
            continue;
        }
        for &offset in target.warning_offsets.iter().rev() {
            if already_notified.contains(&target.id, offset) {
                continue;
            }
            let reached = match lead_time(target.due, Duration::days(i64::from(offset))) {
                Some(alert_time) => now >= alert_time,
                None => true,
            };
            if reached {
                alerts.push(AlertEvent {
                    target_id: target.id.clone(),
                    offset_days: offset,
                });
            }
        }
    }
    alerts
}

/// Overdue reminders due at `now`.
///
/// A reminder for `h` fires once `now >= due + h hours`, at most once per
/// `(target, h)`. Completed targets are skipped.
pub fn scan_overdue(
    now: DateTime<Utc>,
    targets: &[DeadlineTarget],
    overdue_hours: &std::collections::BTreeSet<u32>,
    already_notified: &NotifiedSet,
) -> Vec<OverdueAlert> {
    let mut alerts = Vec::new();
    for target in targets.iter().filter(|t| t.is_pending()) {
        if now < target.due {
            continue;
        }
        let late = now - target.due;
        for &hours in overdue_hours {
            if late >= Duration::hours(i64::from(hours))
                && !already_notified.contains(&target.id, hours)
            {
                alerts.push(OverdueAlert {
                    target_id: target.id.clone(),
                    hours_overdue: hours,
                });
            }
        }
    }
    alerts
}
