//! SQLite storage for calendar events, deadline targets and the alert ledger.
//!
//! Timestamps are stored as fixed-width RFC 3339 text (nanoseconds, `Z`)
//! so that lexicographic comparison in SQL matches chronological order and
//! nothing is lost on the way back into memory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::data_dir;
use crate::calendar::{AttendeeResponse, CalendarEvent, EventStatus, ReminderAlert, TimeWindow};
use crate::deadline::{AlertEvent, CompletionStatus, DeadlineTarget, NotifiedSet, OverdueAlert, TargetKind};
use crate::error::{CoreError, DatabaseError, Result};
use crate::validation::{validate_event, validate_target};

const LEDGER_WARNING: &str = "warning";
const LEDGER_OVERDUE: &str = "overdue";
const LEDGER_REMINDER: &str = "reminder";

/// Bumped whenever `migrate` learns a new step.
const SCHEMA_VERSION: i64 = 2;

const EVENT_COLUMNS: &str = "id, title, start_at, end_at, attendees, responses, status,
     project_id, task_id, milestone_id, deleted, created_at, updated_at, reminder_minutes";

const TARGET_COLUMNS: &str =
    "id, kind, title, project_id, due_at, status, warning_offsets, created_at, completed_at";

// === Helper Functions ===

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json_column<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn format_event_status(status: EventStatus) -> &'static str {
    match status {
        EventStatus::Confirmed => "confirmed",
        EventStatus::Tentative => "tentative",
        EventStatus::Cancelled => "cancelled",
    }
}

fn parse_event_status(raw: &str) -> EventStatus {
    match raw {
        "tentative" => EventStatus::Tentative,
        "cancelled" => EventStatus::Cancelled,
        _ => EventStatus::Confirmed,
    }
}

fn format_target_kind(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Task => "task",
        TargetKind::Milestone => "milestone",
    }
}

fn parse_target_kind(idx: usize, raw: &str) -> rusqlite::Result<TargetKind> {
    match raw {
        "task" => Ok(TargetKind::Task),
        "milestone" => Ok(TargetKind::Milestone),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown target kind '{other}'").into(),
        )),
    }
}

fn format_completion(status: CompletionStatus) -> &'static str {
    match status {
        CompletionStatus::Pending => "pending",
        CompletionStatus::Completed => "completed",
    }
}

fn parse_completion(raw: &str) -> CompletionStatus {
    match raw {
        "completed" => CompletionStatus::Completed,
        _ => CompletionStatus::Pending,
    }
}

fn row_to_event(row: &Row) -> rusqlite::Result<CalendarEvent> {
    let start = parse_ts(2, &row.get::<_, String>(2)?)?;
    let end = parse_ts(3, &row.get::<_, String>(3)?)?;
    let attendees: BTreeSet<String> = parse_json_column(4, &row.get::<_, String>(4)?)?;
    let responses: BTreeMap<String, AttendeeResponse> =
        parse_json_column(5, &row.get::<_, String>(5)?)?;

    Ok(CalendarEvent {
        id: row.get(0)?,
        title: row.get(1)?,
        window: TimeWindow { start, end },
        attendees,
        responses,
        status: parse_event_status(&row.get::<_, String>(6)?),
        reminder_minutes: parse_json_column(13, &row.get::<_, String>(13)?)?,
        project_id: row.get(7)?,
        task_id: row.get(8)?,
        milestone_id: row.get(9)?,
        deleted: row.get(10)?,
        created_at: parse_ts(11, &row.get::<_, String>(11)?)?,
        updated_at: parse_ts(12, &row.get::<_, String>(12)?)?,
    })
}

fn row_to_target(row: &Row) -> rusqlite::Result<DeadlineTarget> {
    let completed_at = row
        .get::<_, Option<String>>(8)?
        .map(|raw| parse_ts(8, &raw))
        .transpose()?;

    Ok(DeadlineTarget {
        id: row.get(0)?,
        kind: parse_target_kind(1, &row.get::<_, String>(1)?)?,
        title: row.get(2)?,
        project_id: row.get(3)?,
        due: parse_ts(4, &row.get::<_, String>(4)?)?,
        status: parse_completion(&row.get::<_, String>(5)?),
        warning_offsets: parse_json_column(6, &row.get::<_, String>(6)?)?,
        created_at: parse_ts(7, &row.get::<_, String>(7)?)?,
        completed_at,
    })
}

/// SQLite database for planboard records.
pub struct PlanDb {
    conn: Connection,
}

impl PlanDb {
    /// Open the database at `<data_dir>/planboard.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::default_path()?)
    }

    /// `<data_dir>/planboard.db`
    pub fn default_path() -> Result<PathBuf> {
        Ok(data_dir()?.join("planboard.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        // Concurrent scans wait for the writer instead of failing outright.
        conn.busy_timeout(StdDuration::from_secs(5))?;
        let db = Self { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "opened planboard database");
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.create_tables()?;
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }
        // Several processes may open a fresh file at once; re-check under the lock.
        self.immediate(|db| {
            let version: i64 = db
                .conn
                .query_row("PRAGMA user_version", [], |row| row.get(0))?;
            if version < 2 {
                db.conn.execute_batch(
                    "ALTER TABLE calendar_events
                     ADD COLUMN reminder_minutes TEXT NOT NULL DEFAULT '[]';",
                )?;
            }
            db.conn
                .execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
            Ok(())
        })
    }

    /// Baseline schema. Later columns are added by `migrate`.
    fn create_tables(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS calendar_events (
                id           TEXT PRIMARY KEY,
                title        TEXT NOT NULL,
                start_at     TEXT NOT NULL,
                end_at       TEXT NOT NULL,
                attendees    TEXT NOT NULL DEFAULT '[]',
                responses    TEXT NOT NULL DEFAULT '{}',
                status       TEXT NOT NULL DEFAULT 'confirmed',
                project_id   TEXT,
                task_id      TEXT,
                milestone_id TEXT,
                deleted      INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS deadline_targets (
                id              TEXT PRIMARY KEY,
                kind            TEXT NOT NULL,
                title           TEXT NOT NULL,
                project_id      TEXT,
                due_at          TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'pending',
                warning_offsets TEXT NOT NULL DEFAULT '[]',
                created_at      TEXT NOT NULL,
                completed_at    TEXT
            );

            CREATE TABLE IF NOT EXISTS alert_ledger (
                target_id    TEXT NOT NULL,
                kind         TEXT NOT NULL,
                offset_value INTEGER NOT NULL,
                notified_at  TEXT NOT NULL,
                PRIMARY KEY (target_id, kind, offset_value)
            );

            CREATE INDEX IF NOT EXISTS idx_calendar_events_window ON calendar_events(start_at, end_at);
            CREATE INDEX IF NOT EXISTS idx_deadline_targets_status_due ON deadline_targets(status, due_at);",
        )
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front, so two runs against the same file
    /// serialize rather than both reading the same ledger.
    pub fn immediate<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!("rollback failed: {rollback}");
                }
                Err(e)
            }
        }
    }

    // === Calendar events ===

    pub fn create_event(&self, event: &CalendarEvent) -> Result<()> {
        validate_event(event)?;
        self.conn.execute(
            "INSERT INTO calendar_events (id, title, start_at, end_at, attendees, responses, status,
                 project_id, task_id, milestone_id, deleted, created_at, updated_at, reminder_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                event.id,
                event.title,
                format_ts(&event.window.start),
                format_ts(&event.window.end),
                serde_json::to_string(&event.attendees)?,
                serde_json::to_string(&event.responses)?,
                format_event_status(event.status),
                event.project_id,
                event.task_id,
                event.milestone_id,
                event.deleted,
                format_ts(&event.created_at),
                format_ts(&event.updated_at),
                serde_json::to_string(&event.reminder_minutes)?,
            ],
        )?;
        Ok(())
    }

    /// Overwrite a stored event, bumping `updated_at`.
    pub fn update_event(&self, event: &CalendarEvent) -> Result<CalendarEvent> {
        validate_event(event)?;
        let mut updated = event.clone();
        updated.updated_at = Utc::now();
        let changed = self.conn.execute(
            "UPDATE calendar_events
             SET title = ?2, start_at = ?3, end_at = ?4, attendees = ?5, responses = ?6,
                 status = ?7, project_id = ?8, task_id = ?9, milestone_id = ?10, updated_at = ?11,
                 reminder_minutes = ?12
             WHERE id = ?1 AND deleted = 0",
            params![
                updated.id,
                updated.title,
                format_ts(&updated.window.start),
                format_ts(&updated.window.end),
                serde_json::to_string(&updated.attendees)?,
                serde_json::to_string(&updated.responses)?,
                format_event_status(updated.status),
                updated.project_id,
                updated.task_id,
                updated.milestone_id,
                format_ts(&updated.updated_at),
                serde_json::to_string(&updated.reminder_minutes)?,
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound {
                kind: "calendar event",
                id: event.id.clone(),
            });
        }
        Ok(updated)
    }

    /// Fetch an event, including soft-deleted ones.
    pub fn get_event(&self, id: &str) -> Result<Option<CalendarEvent>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM calendar_events WHERE id = ?1");
        let event = self
            .conn
            .query_row(&sql, params![id], row_to_event)
            .optional()?;
        Ok(event)
    }

    /// All events that are not soft-deleted, ordered by start.
    pub fn list_events(&self) -> Result<Vec<CalendarEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events WHERE deleted = 0 ORDER BY start_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let events = stmt
            .query_map([], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// Events eligible for conflict comparison that overlap `window`.
    ///
    /// Soft-deleted and cancelled events are left out here, the detector
    /// does not know about event status.
    pub fn list_comparable_events(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events
             WHERE deleted = 0 AND status != 'cancelled' AND start_at < ?2 AND end_at > ?1
             ORDER BY start_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let events = stmt
            .query_map(
                params![format_ts(&window.start), format_ts(&window.end)],
                row_to_event,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// Comparable events starting after `now`, ordered by start.
    pub fn list_upcoming_events(&self, now: DateTime<Utc>) -> Result<Vec<CalendarEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events
             WHERE deleted = 0 AND status != 'cancelled' AND start_at > ?1
             ORDER BY start_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let events = stmt
            .query_map(params![format_ts(&now)], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// Soft-delete an event.
    pub fn delete_event(&self, id: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE calendar_events SET deleted = 1, updated_at = ?2 WHERE id = ?1 AND deleted = 0",
            params![id, format_ts(&Utc::now())],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound {
                kind: "calendar event",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // === Deadline targets ===

    pub fn create_target(&self, target: &DeadlineTarget) -> Result<()> {
        validate_target(target)?;
        self.conn.execute(
            "INSERT INTO deadline_targets (id, kind, title, project_id, due_at, status,
                 warning_offsets, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                target.id,
                format_target_kind(target.kind),
                target.title,
                target.project_id,
                format_ts(&target.due),
                format_completion(target.status),
                serde_json::to_string(&target.warning_offsets)?,
                format_ts(&target.created_at),
                target.completed_at.as_ref().map(format_ts),
            ],
        )?;
        Ok(())
    }

    pub fn get_target(&self, id: &str) -> Result<Option<DeadlineTarget>> {
        let sql = format!("SELECT {TARGET_COLUMNS} FROM deadline_targets WHERE id = ?1");
        let target = self
            .conn
            .query_row(&sql, params![id], row_to_target)
            .optional()?;
        Ok(target)
    }

    pub fn list_targets(&self) -> Result<Vec<DeadlineTarget>> {
        let sql = format!("SELECT {TARGET_COLUMNS} FROM deadline_targets ORDER BY due_at, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let targets = stmt
            .query_map([], row_to_target)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(targets)
    }

    pub fn list_pending_targets(&self) -> Result<Vec<DeadlineTarget>> {
        let sql = format!(
            "SELECT {TARGET_COLUMNS} FROM deadline_targets WHERE status = 'pending' ORDER BY due_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let targets = stmt
            .query_map([], row_to_target)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(targets)
    }

    /// Mark a target completed. Completing an already completed target is a no-op.
    pub fn complete_target(&self, id: &str, at: DateTime<Utc>) -> Result<DeadlineTarget> {
        let mut target = self.get_target(id)?.ok_or_else(|| CoreError::NotFound {
            kind: "deadline target",
            id: id.to_string(),
        })?;
        target.complete(at);
        self.conn.execute(
            "UPDATE deadline_targets SET status = ?2, completed_at = ?3 WHERE id = ?1",
            params![
                id,
                format_completion(target.status),
                target.completed_at.as_ref().map(format_ts),
            ],
        )?;
        Ok(target)
    }

    /// Delete a target together with its ledger entries.
    pub fn delete_target(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM deadline_targets WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(CoreError::NotFound {
                kind: "deadline target",
                id: id.to_string(),
            });
        }
        self.conn
            .execute("DELETE FROM alert_ledger WHERE target_id = ?1", params![id])?;
        Ok(())
    }

    // === Alert ledger ===

    fn notified(&self, kind: &str) -> Result<NotifiedSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT target_id, offset_value FROM alert_ledger WHERE kind = ?1")?;
        let rows = stmt.query_map(params![kind], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
        })?;
        let mut set = NotifiedSet::new();
        for row in rows {
            let (target_id, offset) = row?;
            set.insert(target_id, offset);
        }
        Ok(set)
    }

    /// `(target, offset_days)` pairs already warned about.
    pub fn notified_warnings(&self) -> Result<NotifiedSet> {
        self.notified(LEDGER_WARNING)
    }

    /// `(target, hours)` pairs already reminded about.
    pub fn notified_overdue(&self) -> Result<NotifiedSet> {
        self.notified(LEDGER_OVERDUE)
    }

    /// `(event, minutes)` pairs already reminded about.
    pub fn notified_reminders(&self) -> Result<NotifiedSet> {
        self.notified(LEDGER_REMINDER)
    }

    /// Record sent meeting reminders, keyed by event id.
    pub fn record_reminders(&self, reminders: &[ReminderAlert], at: DateTime<Utc>) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO alert_ledger (target_id, kind, offset_value, notified_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let at = format_ts(&at);
        let mut inserted = 0;
        for alert in reminders {
            inserted += stmt.execute(params![alert.event_id, LEDGER_REMINDER, alert.minutes_before, at])?;
        }
        Ok(inserted)
    }

    /// Record sent alerts. Re-recording a pair keeps the first timestamp.
    pub fn record_alerts(
        &self,
        warnings: &[AlertEvent],
        overdue: &[OverdueAlert],
        at: DateTime<Utc>,
    ) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO alert_ledger (target_id, kind, offset_value, notified_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let at = format_ts(&at);
        let mut inserted = 0;
        for alert in warnings {
            inserted += stmt.execute(params![alert.target_id, LEDGER_WARNING, alert.offset_days, at])?;
        }
        for alert in overdue {
            inserted += stmt.execute(params![alert.target_id, LEDGER_OVERDUE, alert.hours_overdue, at])?;
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, d, h, 0, 0).unwrap()
    }

    fn meeting(id: &str, start: DateTime<Utc>, hours: i64, who: &[&str]) -> CalendarEvent {
        let window = TimeWindow::starting_at(start, hours * 60).unwrap();
        CalendarEvent::new(id, window, who.iter().copied()).with_id(id)
    }

    #[test]
    fn event_crud_roundtrip() {
        let db = PlanDb::open_memory().unwrap();
        let mut event = meeting("e1", at(1, 10), 1, &["5", "6"]);
        event
            .responses
            .insert("6".to_string(), AttendeeResponse::Declined);
        event.project_id = Some("p1".to_string());
        db.create_event(&event).unwrap();

        let loaded = db.get_event("e1").unwrap().unwrap();
        assert_eq!(loaded.window, event.window);
        assert_eq!(loaded.attendees, event.attendees);
        assert_eq!(loaded.response_of("6"), AttendeeResponse::Declined);
        assert_eq!(loaded.project_id.as_deref(), Some("p1"));

        let mut moved = loaded.clone();
        moved.window = TimeWindow::starting_at(at(1, 14), 60).unwrap();
        let saved = db.update_event(&moved).unwrap();
        assert!(saved.updated_at >= loaded.updated_at);
        assert_eq!(db.get_event("e1").unwrap().unwrap().window.start, at(1, 14));

        db.delete_event("e1").unwrap();
        assert!(db.list_events().unwrap().is_empty());
        assert!(db.get_event("e1").unwrap().unwrap().deleted);
        assert!(matches!(
            db.delete_event("e1"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn create_event_validates() {
        let db = PlanDb::open_memory().unwrap();
        let event = meeting("e1", at(1, 10), 1, &[]);
        assert!(matches!(
            db.create_event(&event),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn comparable_events_skip_cancelled_deleted_and_distant() {
        let db = PlanDb::open_memory().unwrap();
        db.create_event(&meeting("keep", at(1, 10), 1, &["1"])).unwrap();

        let mut cancelled = meeting("cancelled", at(1, 10), 1, &["1"]);
        cancelled.status = EventStatus::Cancelled;
        db.create_event(&cancelled).unwrap();

        db.create_event(&meeting("gone", at(1, 10), 1, &["1"])).unwrap();
        db.delete_event("gone").unwrap();

        db.create_event(&meeting("later", at(2, 10), 1, &["1"])).unwrap();
        db.create_event(&meeting("adjacent", at(1, 11), 1, &["1"])).unwrap();

        let window = TimeWindow::starting_at(at(1, 9), 120).unwrap();
        let ids: Vec<String> = db
            .list_comparable_events(&window)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["keep".to_string()]);
    }

    #[test]
    fn target_lifecycle() {
        let db = PlanDb::open_memory().unwrap();
        let mut target = DeadlineTarget::new(TargetKind::Milestone, "Beta", at(10, 0), [1, 3, 7])
            .with_id("m1");
        target.project_id = Some("p1".to_string());
        db.create_target(&target).unwrap();

        let loaded = db.get_target("m1").unwrap().unwrap();
        assert_eq!(loaded.warning_offsets, BTreeSet::from([1, 3, 7]));
        assert_eq!(loaded.kind, TargetKind::Milestone);
        assert_eq!(db.list_pending_targets().unwrap().len(), 1);

        let done = db.complete_target("m1", at(9, 0)).unwrap();
        assert_eq!(done.completed_at, Some(at(9, 0)));
        assert!(db.list_pending_targets().unwrap().is_empty());
        assert_eq!(db.list_targets().unwrap().len(), 1);

        db.delete_target("m1").unwrap();
        assert!(db.get_target("m1").unwrap().is_none());
        assert!(db.complete_target("m1", at(9, 0)).is_err());
    }

    #[test]
    fn ledger_is_idempotent_and_split_by_kind() {
        let db = PlanDb::open_memory().unwrap();
        let warning = AlertEvent {
            target_id: "t".to_string(),
            offset_days: 7,
        };
        let overdue = OverdueAlert {
            target_id: "t".to_string(),
            hours_overdue: 24,
        };

        let first = db
            .record_alerts(&[warning.clone()], &[overdue.clone()], at(3, 0))
            .unwrap();
        assert_eq!(first, 2);
        let again = db.record_alerts(&[warning], &[overdue], at(4, 0)).unwrap();
        assert_eq!(again, 0);

        let warned = db.notified_warnings().unwrap();
        assert!(warned.contains("t", 7));
        assert!(!warned.contains("t", 24));
        assert!(db.notified_overdue().unwrap().contains("t", 24));
    }

    #[test]
    fn sub_microsecond_edges_survive_storage() {
        let db = PlanDb::open_memory().unwrap();
        db.create_event(&meeting("b", at(1, 11), 1, &["5"])).unwrap();

        let end = at(1, 11) + chrono::Duration::nanoseconds(500);
        let candidate =
            CalendarEvent::new("a", TimeWindow::new(at(1, 10), end).unwrap(), ["5"]).with_id("a");
        let ids: Vec<String> = db
            .list_comparable_events(&candidate.window)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["b".to_string()]);

        db.create_event(&candidate).unwrap();
        assert_eq!(db.get_event("a").unwrap().unwrap().window.end, end);
    }

    #[test]
    fn reminders_roundtrip_and_upcoming_filter() {
        let db = PlanDb::open_memory().unwrap();
        db.create_event(&meeting("past", at(1, 8), 1, &["1"]).with_reminders([15]))
            .unwrap();
        db.create_event(&meeting("soon", at(1, 10), 1, &["1"]).with_reminders([15, 60]))
            .unwrap();
        let mut cancelled = meeting("cancelled", at(1, 11), 1, &["1"]).with_reminders([15]);
        cancelled.status = EventStatus::Cancelled;
        db.create_event(&cancelled).unwrap();

        let upcoming = db.list_upcoming_events(at(1, 9)).unwrap();
        let ids: Vec<&str> = upcoming.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["soon"]);
        assert_eq!(upcoming[0].reminder_minutes, BTreeSet::from([15, 60]));

        let alert = ReminderAlert {
            event_id: "soon".to_string(),
            minutes_before: 60,
        };
        assert_eq!(db.record_reminders(&[alert.clone()], at(1, 9)).unwrap(), 1);
        assert_eq!(db.record_reminders(&[alert], at(1, 9)).unwrap(), 0);
        assert!(db.notified_reminders().unwrap().contains("soon", 60));
        assert!(!db.notified_warnings().unwrap().contains("soon", 60));
    }

    #[test]
    fn migrate_adds_reminder_column_to_baseline_schema() {
        let db = PlanDb {
            conn: Connection::open_in_memory().unwrap(),
        };
        db.create_tables().unwrap();
        db.conn
            .execute_batch(
                "INSERT INTO calendar_events (id, title, start_at, end_at, attendees, created_at, updated_at)
                 VALUES ('old', 'Old', '2024-07-01T10:00:00.000000Z', '2024-07-01T11:00:00.000000Z',
                         '[\"1\"]', '2024-07-01T00:00:00.000000Z', '2024-07-01T00:00:00.000000Z');",
            )
            .unwrap();

        db.migrate().unwrap();
        db.migrate().unwrap();
        let old = db.get_event("old").unwrap().unwrap();
        assert!(old.reminder_minutes.is_empty());
        assert_eq!(old.window.start, at(1, 10));
    }

    #[test]
    fn immediate_rolls_back_on_error() {
        let db = PlanDb::open_memory().unwrap();
        let result: Result<()> = db.immediate(|db| {
            db.create_event(&meeting("e1", at(1, 10), 1, &["1"]))?;
            Err(CoreError::NotFound {
                kind: "calendar event",
                id: "boom".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(db.get_event("e1").unwrap().is_none());

        db.immediate(|db| db.create_event(&meeting("e2", at(1, 10), 1, &["1"])))
            .unwrap();
        assert!(db.get_event("e2").unwrap().is_some());
    }
}
