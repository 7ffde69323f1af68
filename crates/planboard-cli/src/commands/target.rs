//! Task and milestone deadline commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use planboard_core::validation::{parse_offsets, parse_timestamp};
use planboard_core::{Config, DeadlineTarget, PlanDb, TargetKind};

use super::print_json;

#[derive(Subcommand)]
pub enum TargetAction {
    /// Add a task or milestone with a due date
    Add {
        /// task or milestone
        kind: String,
        /// Title
        title: String,
        /// Due time (RFC 3339, YYYY-MM-DDTHH:MM or YYYY-MM-DD, UTC)
        #[arg(long)]
        due: String,
        /// Comma-separated warning offsets in days; defaults to deadlines.warning_days
        #[arg(long)]
        offsets: Option<String>,
        /// Owning project id
        #[arg(long)]
        project_id: Option<String>,
    },
    /// List targets
    List {
        /// Only targets that are still pending
        #[arg(long)]
        pending: bool,
    },
    /// Show one target
    Get {
        /// Target ID
        id: String,
    },
    /// Mark a target completed
    Complete {
        /// Target ID
        id: String,
    },
    /// Delete a target and its ledger entries
    Delete {
        /// Target ID
        id: String,
    },
}

fn parse_kind(raw: &str) -> Result<TargetKind, Box<dyn std::error::Error>> {
    match raw {
        "task" => Ok(TargetKind::Task),
        "milestone" => Ok(TargetKind::Milestone),
        other => Err(format!("unknown target kind: {other} (expected task or milestone)").into()),
    }
}

pub fn run(action: TargetAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlanDb::open()?;

    match action {
        TargetAction::Add {
            kind,
            title,
            due,
            offsets,
            project_id,
        } => {
            let kind = parse_kind(&kind)?;
            let due = parse_timestamp(&due)?;
            let mut target = DeadlineTarget::new(kind, title, due, []);
            target.warning_offsets = match offsets {
                Some(raw) => parse_offsets(&raw, &target.id)?,
                None => Config::load_or_default().warning_days(),
            };
            target.project_id = project_id;
            db.create_target(&target)?;
            print_json(&target)?;
        }
        TargetAction::List { pending } => {
            let targets = if pending {
                db.list_pending_targets()?
            } else {
                db.list_targets()?
            };
            print_json(&targets)?;
        }
        TargetAction::Get { id } => match db.get_target(&id)? {
            Some(target) => print_json(&target)?,
            None => return Err(format!("Target not found: {id}").into()),
        },
        TargetAction::Complete { id } => {
            let target = db.complete_target(&id, Utc::now())?;
            print_json(&target)?;
        }
        TargetAction::Delete { id } => {
            db.delete_target(&id)?;
            println!("Target deleted: {id}");
        }
    }
    Ok(())
}
