//! Basic CLI E2E tests.
//!
//! Each test points the binary at its own temporary data directory.

use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_planboard"))
        .args(args)
        .env("PLANBOARD_DATA_DIR", data_dir.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_json(data_dir: &TempDir, args: &[&str]) -> Value {
    let (code, stdout, stderr) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("stdout should be JSON")
}

#[test]
fn test_deadline_scan_fires_once() {
    let dir = TempDir::new().unwrap();
    let target = run_json(
        &dir,
        &["target", "add", "task", "Ship", "--due", "2024-07-10", "--offsets", "1,3,7"],
    );
    let id = target["id"].as_str().unwrap().to_string();

    let events = run_json(&dir, &["deadline", "scan", "--now", "2024-07-03T00:00:00Z"]);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "deadline.approaching");
    assert_eq!(events[0]["target_id"], id.as_str());
    assert_eq!(events[0]["offset_days"], 7);

    let again = run_json(&dir, &["deadline", "scan", "--now", "2024-07-03T00:00:00Z"]);
    assert!(again.as_array().unwrap().is_empty());
}

#[test]
fn test_completed_target_is_skipped() {
    let dir = TempDir::new().unwrap();
    let target = run_json(
        &dir,
        &["target", "add", "milestone", "Launch", "--due", "2024-07-10", "--offsets", "7"],
    );
    let id = target["id"].as_str().unwrap();
    let completed = run_json(&dir, &["target", "complete", id]);
    assert_eq!(completed["status"], "completed");

    let events = run_json(&dir, &["deadline", "scan", "--now", "2024-07-05T00:00:00Z"]);
    assert!(events.as_array().unwrap().is_empty());
}

#[test]
fn test_duplicate_offsets_rejected() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(
        &dir,
        &["target", "add", "task", "Ship", "--due", "2024-07-10", "--offsets", "3,3"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_event_add_reports_conflicts() {
    let dir = TempDir::new().unwrap();
    let standup = run_json(
        &dir,
        &[
            "event", "add", "Standup",
            "--start", "2024-07-01T10:00:00Z",
            "--end", "2024-07-01T11:00:00Z",
            "--attendees", "5",
        ],
    );
    assert!(standup["conflicts"].as_array().unwrap().is_empty());
    let standup_id = standup["event"]["id"].as_str().unwrap();

    let review = run_json(
        &dir,
        &[
            "event", "add", "Review",
            "--start", "2024-07-01T10:30:00Z",
            "--end", "2024-07-01T11:30:00Z",
            "--attendees", "5,6",
        ],
    );
    let conflicts = review["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["event_id"], standup_id);

    // Back-to-back meetings do not conflict.
    let lunch = run_json(
        &dir,
        &[
            "event", "add", "Lunch",
            "--start", "2024-07-01T11:30:00Z",
            "--end", "2024-07-01T12:30:00Z",
            "--attendees", "5",
        ],
    );
    assert!(lunch["conflicts"].as_array().unwrap().is_empty());
}

#[test]
fn test_strict_add_refuses_conflicting_event() {
    let dir = TempDir::new().unwrap();
    run_json(
        &dir,
        &[
            "event", "add", "Standup",
            "--start", "2024-07-01T10:00:00Z",
            "--end", "2024-07-01T11:00:00Z",
            "--attendees", "5",
        ],
    );
    let (code, _, stderr) = run_cli(
        &dir,
        &[
            "event", "add", "Review", "--strict",
            "--start", "2024-07-01T10:30:00Z",
            "--end", "2024-07-01T11:30:00Z",
            "--attendees", "5",
        ],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("not saved"));

    let events = run_json(&dir, &["event", "list"]);
    assert_eq!(events.as_array().unwrap().len(), 1);
}

#[test]
fn test_meeting_reminder_fires_from_scan() {
    let dir = TempDir::new().unwrap();
    let added = run_json(
        &dir,
        &[
            "event", "add", "Standup",
            "--start", "2024-07-01T10:00:00Z",
            "--attendees", "5",
            "--reminders", "15",
        ],
    );
    assert_eq!(added["event"]["reminder_minutes"], serde_json::json!([15]));
    assert_eq!(added["event"]["end"], "2024-07-01T11:00:00Z");

    let early = run_json(&dir, &["deadline", "scan", "--now", "2024-07-01T09:44:00Z"]);
    assert!(early.as_array().unwrap().is_empty());

    let events = run_json(&dir, &["deadline", "scan", "--now", "2024-07-01T09:45:00Z"]);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "meeting.reminder");
    assert_eq!(events[0]["minutes_before"], 15);

    let again = run_json(&dir, &["deadline", "scan", "--now", "2024-07-01T09:50:00Z"]);
    assert!(again.as_array().unwrap().is_empty());
}

#[test]
fn test_busy_range() {
    let dir = TempDir::new().unwrap();
    run_json(
        &dir,
        &[
            "event", "add", "Standup",
            "--start", "2024-07-01T10:00:00Z",
            "--end", "2024-07-01T11:00:00Z",
            "--attendees", "5,7",
        ],
    );
    let busy = run_json(
        &dir,
        &[
            "conflicts",
            "--start", "2024-07-01T09:00:00Z",
            "--end", "2024-07-01T17:00:00Z",
            "--attendees", "7",
        ],
    );
    assert_eq!(busy.as_array().unwrap().len(), 1);

    let free = run_json(
        &dir,
        &[
            "conflicts",
            "--start", "2024-07-01T09:00:00Z",
            "--end", "2024-07-01T17:00:00Z",
            "--attendees", "8",
        ],
    );
    assert!(free.as_array().unwrap().is_empty());
}

#[test]
fn test_invalid_time_range() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(
        &dir,
        &[
            "event", "add", "Backwards",
            "--start", "2024-07-01T11:00:00Z",
            "--end", "2024-07-01T10:00:00Z",
            "--attendees", "5",
        ],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&dir, &["config", "get", "scan.interval_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "60");

    let (code, _, stderr) = run_cli(&dir, &["config", "set", "scan.interval_minutes", "15"]);
    assert_eq!(code, 0, "{stderr}");
    let (_, stdout, _) = run_cli(&dir, &["config", "get", "scan.interval_minutes"]);
    assert_eq!(stdout.trim(), "15");

    let (code, _, _) = run_cli(&dir, &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}
