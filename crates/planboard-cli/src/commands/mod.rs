pub mod config;
pub mod conflicts;
pub mod deadline;
pub mod event;
pub mod target;

use chrono::{DateTime, Utc};
use planboard_core::validation::parse_timestamp;

/// Parse an optional `--now` override, defaulting to the wall clock.
pub fn now_or(raw: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match raw {
        Some(raw) => Ok(parse_timestamp(raw)?),
        None => Ok(Utc::now()),
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
