//! Deadline targets: tasks and milestones with a due timestamp.

pub mod monitor;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use monitor::{scan, scan_overdue, AlertEvent, OverdueAlert};

/// What kind of record a deadline belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Task,
    Milestone,
}

/// Completion status of a target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    #[default]
    Pending,
    Completed,
}

/// A task or milestone watched by the deadline monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeadlineTarget {
    pub id: String,
    pub kind: TargetKind,
    pub title: String,
    pub project_id: Option<String>,
    pub due: DateTime<Utc>,
    #[serde(default)]
    pub status: CompletionStatus,
    /// Days before `due` at which a warning fires
    pub warning_offsets: BTreeSet<u32>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DeadlineTarget {
    pub fn new(
        kind: TargetKind,
        title: impl Into<String>,
        due: DateTime<Utc>,
        warning_offsets: impl IntoIterator<Item = u32>,
    ) -> Self {
        let prefix = match kind {
            TargetKind::Task => "task",
            TargetKind::Milestone => "milestone",
        };
        Self {
            id: format!("{prefix}-{}", uuid::Uuid::new_v4()),
            kind,
            title: title.into(),
            project_id: None,
            due,
            status: CompletionStatus::Pending,
            warning_offsets: warning_offsets.into_iter().collect(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == CompletionStatus::Pending
    }

    /// Mark completed. Completing twice keeps the first timestamp.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        if self.status == CompletionStatus::Completed {
            return;
        }
        self.status = CompletionStatus::Completed;
        self.completed_at = Some(at);
    }
}

/// Set of `(target_id, offset)` pairs for which an alert was already sent.
///
/// The same type backs the warning ledger (offsets in days), the overdue
/// ledger (offsets in hours) and the meeting reminder ledger (minutes, keyed
/// by event id).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifiedSet {
    by_target: BTreeMap<String, BTreeSet<u32>>,
}

impl NotifiedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, target_id: &str, offset: u32) -> bool {
        self.by_target
            .get(target_id)
            .is_some_and(|offsets| offsets.contains(&offset))
    }

    /// Returns `false` if the pair was already present.
    pub fn insert(&mut self, target_id: impl Into<String>, offset: u32) -> bool {
        self.by_target
            .entry(target_id.into())
            .or_default()
            .insert(offset)
    }

    pub fn len(&self) -> usize {
        self.by_target.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.values().all(BTreeSet::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.by_target
            .iter()
            .flat_map(|(id, offsets)| offsets.iter().map(move |o| (id.as_str(), *o)))
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for NotifiedSet {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut set = NotifiedSet::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<(S, u32)> for NotifiedSet {
    fn extend<I: IntoIterator<Item = (S, u32)>>(&mut self, iter: I) {
        for (id, offset) in iter {
            self.insert(id, offset);
        }
    }
}
