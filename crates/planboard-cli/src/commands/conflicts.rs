//! Busy-range check for CLI.

use clap::Args;
use planboard_core::validation::{parse_attendees, parse_timestamp};
use planboard_core::{Config, ConflictChecker, PlanDb, TimeWindow};

use super::print_json;

#[derive(Args)]
pub struct ConflictsArgs {
    /// Range start
    #[arg(long)]
    pub start: String,
    /// Range end
    #[arg(long)]
    pub end: String,
    /// Comma-separated attendee ids to check
    #[arg(long)]
    pub attendees: String,
}

pub fn run(args: ConflictsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = PlanDb::open()?;
    let window = TimeWindow::new(parse_timestamp(&args.start)?, parse_timestamp(&args.end)?)?;
    let attendees = parse_attendees(&args.attendees);
    if attendees.is_empty() {
        return Err("at least one attendee is required".into());
    }

    let busy = ConflictChecker::from_config(&config).busy(&db, &window, &attendees)?;
    print_json(&busy)
}
