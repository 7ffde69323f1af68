//! Configuration commands for CLI.

use clap::Subcommand;
use planboard_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value by dot-separated key
    Get {
        /// Config key (e.g., "deadlines.warning_days")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(val) => println!("{val}"),
                None => {
                    return Err(format!("Unknown key: {key}").into());
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("{key} = {}", config.get(&key).unwrap_or(value));
        }
        ConfigAction::List => {
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("Config reset to defaults.");
        }
    }
    Ok(())
}
