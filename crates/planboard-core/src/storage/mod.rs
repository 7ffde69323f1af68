mod config;
pub mod database;

pub use config::{CalendarConfig, Config, DeadlineConfig, LoggingConfig, ScanConfig};
pub use database::PlanDb;

use std::path::PathBuf;

use crate::error::Result;

/// Returns the planboard data directory, creating it if needed.
///
/// `PLANBOARD_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/planboard/`, or `~/.config/planboard-dev/` when
/// `PLANBOARD_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("PLANBOARD_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("PLANBOARD_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("planboard-dev")
            } else {
                base_dir.join("planboard")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
