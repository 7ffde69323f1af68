//! TOML-based application configuration.
//!
//! Stores:
//! - Deadline warning offsets and overdue reminder hours
//! - Which attendee responses count in conflict checks
//! - Default meeting reminder leads
//! - The scan interval used by `planboard deadline watch`
//! - The default log filter
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::calendar::ResponsePolicy;
use crate::error::{ConfigError, Result};

/// Deadline alerting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeadlineConfig {
    /// Days before due at which warnings fire, for targets created without
    /// explicit offsets
    #[serde(default = "default_warning_days")]
    pub warning_days: Vec<u32>,
    /// Hours past due at which overdue reminders fire
    #[serde(default = "default_overdue_hours")]
    pub overdue_hours: Vec<u32>,
}

/// Conflict detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarConfig {
    #[serde(default)]
    pub exclude_declined: bool,
    #[serde(default)]
    pub exclude_tentative: bool,
    #[serde(default = "default_meeting_minutes")]
    pub default_meeting_minutes: u32,
    /// Minutes before start at which reminders fire, for events created
    /// without explicit reminders
    #[serde(default = "default_reminder_minutes")]
    pub reminder_minutes: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub deadlines: DeadlineConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_warning_days() -> Vec<u32> {
    vec![1, 3, 7]
}
fn default_overdue_hours() -> Vec<u32> {
    vec![24, 72, 168]
}
fn default_meeting_minutes() -> u32 {
    60
}
fn default_reminder_minutes() -> Vec<u32> {
    vec![15]
}
fn default_interval_minutes() -> u32 {
    60
}
fn default_log_filter() -> String {
    "warn".into()
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            warning_days: default_warning_days(),
            overdue_hours: default_overdue_hours(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            exclude_declined: false,
            exclude_tentative: false,
            default_meeting_minutes: default_meeting_minutes(),
            reminder_minutes: default_reminder_minutes(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".to_string(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                // Lists accept either JSON (`[1,3,7]`) or a bare comma list (`1,3,7`).
                serde_json::Value::Array(_) => {
                    let trimmed = value.trim();
                    if trimmed.starts_with('[') {
                        serde_json::from_str(trimmed).map_err(|e| invalid(e.to_string()))?
                    } else {
                        let items = trimmed
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(|s| {
                                s.parse::<u64>()
                                    .map(|n| serde_json::Value::Number(n.into()))
                                    .map_err(|_| invalid(format!("cannot parse '{s}' as number")))
                            })
                            .collect::<std::result::Result<Vec<_>, _>>()?;
                        serde_json::Value::Array(items)
                    }
                }
                serde_json::Value::Object(_) => return Err(unknown()),
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("falling back to default config: {e}");
                Self::default()
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value has the wrong type,
    /// or the result fails validation. `self` is unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Reject values the rest of the system cannot use.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.scan.interval_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scan.interval_minutes".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.calendar.default_meeting_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "calendar.default_meeting_minutes".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        for (key, list) in [
            ("deadlines.warning_days", &self.deadlines.warning_days),
            ("deadlines.overdue_hours", &self.deadlines.overdue_hours),
            ("calendar.reminder_minutes", &self.calendar.reminder_minutes),
        ] {
            let unique: BTreeSet<_> = list.iter().collect();
            if unique.len() != list.len() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "contains duplicates".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn warning_days(&self) -> BTreeSet<u32> {
        self.deadlines.warning_days.iter().copied().collect()
    }

    pub fn overdue_hours(&self) -> BTreeSet<u32> {
        self.deadlines.overdue_hours.iter().copied().collect()
    }

    pub fn reminder_minutes(&self) -> BTreeSet<u32> {
        self.calendar.reminder_minutes.iter().copied().collect()
    }

    /// Attendee filter for conflict checks.
    pub fn response_policy(&self) -> ResponsePolicy {
        ResponsePolicy {
            exclude_declined: self.calendar.exclude_declined,
            exclude_tentative: self.calendar.exclude_tentative,
        }
    }
}
