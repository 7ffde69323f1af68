//! Integration tests for storage-backed scans and conflict checks.
//!
//! These use an on-disk database so that separate connections see the same
//! ledger, the way the CLI and a background watcher would.

use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};

use chrono::{DateTime, TimeZone, Utc};
use planboard_core::{
    CalendarEvent, Config, ConflictChecker, DeadlineScanner, DeadlineTarget, PlanDb, SaveOutcome,
    TargetKind, TimeWindow,
};
use tempfile::TempDir;

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, d, 0, 0, 0).unwrap()
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, h, m, 0).unwrap()
}

#[test]
fn test_ledger_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("planboard.db");

    {
        let db = PlanDb::open_at(&path).unwrap();
        let target = DeadlineTarget::new(TargetKind::Task, "Ship", day(10), [1, 3, 7]).with_id("t");
        db.create_target(&target).unwrap();
        let outcome = DeadlineScanner::from_config(&Config::default())
            .run(&db, day(3))
            .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
    }

    let db = PlanDb::open_at(&path).unwrap();
    assert!(db.notified_warnings().unwrap().contains("t", 7));
    let outcome = DeadlineScanner::from_config(&Config::default())
        .run(&db, day(3))
        .unwrap();
    assert!(outcome.is_empty());

    let outcome = DeadlineScanner::from_config(&Config::default())
        .run(&db, day(7))
        .unwrap();
    let offsets: Vec<u32> = outcome.warnings.iter().map(|a| a.offset_days).collect();
    assert_eq!(offsets, vec![3]);
}

#[test]
fn test_overlapping_scans_emit_each_alert_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("planboard.db");
    {
        let db = PlanDb::open_at(&path).unwrap();
        for i in 0..5 {
            let target = DeadlineTarget::new(TargetKind::Task, format!("task {i}"), day(10), [7])
                .with_id(format!("t{i}"));
            db.create_target(&target).unwrap();
        }
    }

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let db = PlanDb::open_at(&path).unwrap();
                let scanner = DeadlineScanner::new(BTreeSet::new());
                barrier.wait();
                scanner.run(&db, day(4)).unwrap().warnings.len()
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 5);
}

#[test]
fn test_concurrent_strict_saves_admit_one() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("planboard.db");
    drop(PlanDb::open_at(&path).unwrap());

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let db = PlanDb::open_at(&path).unwrap();
                let checker = ConflictChecker::from_config(&Config::default());
                let window = TimeWindow::new(at(10, 0), at(11, 0)).unwrap();
                let event = CalendarEvent::new(format!("Meeting {i}"), window, ["5"])
                    .with_id(format!("m{i}"));
                barrier.wait();
                matches!(
                    checker.create(&db, &event, true).unwrap(),
                    SaveOutcome::Saved { .. }
                )
            })
        })
        .collect();

    let saved = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|saved| *saved)
        .count();
    assert_eq!(saved, 1);

    let db = PlanDb::open_at(&path).unwrap();
    assert_eq!(db.list_events().unwrap().len(), 1);
}

#[test]
fn test_meeting_reminders_fire_once_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("planboard.db");
    let scanner = DeadlineScanner::from_config(&Config::default());
    {
        let db = PlanDb::open_at(&path).unwrap();
        let window = TimeWindow::new(at(10, 0), at(11, 0)).unwrap();
        let standup = CalendarEvent::new("Standup", window, ["5"])
            .with_id("standup")
            .with_reminders([15, 1440]);
        db.create_event(&standup).unwrap();
        let outcome = scanner.run(&db, at(9, 50)).unwrap();
        let leads: Vec<u32> = outcome.reminders.iter().map(|r| r.minutes_before).collect();
        assert_eq!(leads, vec![1440, 15]);
    }

    let db = PlanDb::open_at(&path).unwrap();
    assert!(scanner.run(&db, at(9, 55)).unwrap().is_empty());
}

#[test]
fn test_completed_target_stays_silent() {
    let dir = TempDir::new().unwrap();
    let db = PlanDb::open_at(&dir.path().join("planboard.db")).unwrap();
    let target = DeadlineTarget::new(TargetKind::Milestone, "Launch", day(5), [1, 3, 7]).with_id("m");
    db.create_target(&target).unwrap();
    db.complete_target("m", day(1)).unwrap();

    let scanner = DeadlineScanner::from_config(&Config::default());
    for d in 1..=20 {
        assert!(scanner.run(&db, day(d)).unwrap().is_empty());
    }
}

#[test]
fn test_rescheduled_event_no_longer_conflicts() {
    let dir = TempDir::new().unwrap();
    let db = PlanDb::open_at(&dir.path().join("planboard.db")).unwrap();
    let checker = ConflictChecker::from_config(&Config::default());

    let standup = CalendarEvent::new("Standup", TimeWindow::new(at(10, 0), at(11, 0)).unwrap(), ["5"])
        .with_id("standup");
    db.create_event(&standup).unwrap();

    let mut review = CalendarEvent::new("Review", TimeWindow::new(at(10, 30), at(11, 30)).unwrap(), ["5"])
        .with_id("review");
    let conflicts = checker.check(&db, &review).unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].event_id, "standup");
    db.create_event(&review).unwrap();

    review.window = TimeWindow::new(at(11, 0), at(12, 0)).unwrap();
    assert!(checker.check(&db, &review).unwrap().is_empty());
    db.update_event(&review).unwrap();

    let busy = checker
        .busy(
            &db,
            &TimeWindow::new(at(9, 0), at(13, 0)).unwrap(),
            &BTreeSet::from(["5".to_string()]),
        )
        .unwrap();
    let ids: Vec<&str> = busy.iter().map(|c| c.event_id.as_str()).collect();
    assert_eq!(ids, vec!["standup", "review"]);
}
