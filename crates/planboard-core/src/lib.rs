//! # Planboard Core Library
//!
//! Calendar conflict detection and deadline alerting for project
//! management records. The two algorithms are pure functions over a
//! snapshot; everything around them (validation, SQLite storage, TOML
//! configuration, the scan runner) lives in this crate too so the CLI stays
//! a thin layer.
//!
//! ## Key Components
//!
//! - [`detect_conflicts`] / [`ConflictDetector`]: attendee-aware overlap checks
//! - [`scan`] / [`scan_overdue`]: deadline warnings and overdue reminders
//! - [`scan_reminders`]: meeting reminders ahead of an event's start
//! - [`PlanDb`]: events, targets and the alert ledger
//! - [`DeadlineScanner`] / [`ConflictChecker`]: storage-backed runners
//! - [`Config`]: application configuration

pub mod calendar;
pub mod deadline;
pub mod error;
pub mod events;
pub mod service;
pub mod storage;
pub mod validation;

pub use calendar::{
    detect_conflicts, scan_reminders, AllAttendees, AttendeeFilter, AttendeeResponse,
    CalendarEvent, Conflict, ConflictDetector, EventStatus, ReminderAlert, ResponsePolicy,
    TimeWindow,
};
pub use deadline::{
    scan, scan_overdue, AlertEvent, CompletionStatus, DeadlineTarget, NotifiedSet, OverdueAlert,
    TargetKind,
};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::DomainEvent;
pub use service::{ConflictChecker, DeadlineScanner, SaveOutcome, ScanOutcome};
pub use storage::{Config, PlanDb};
