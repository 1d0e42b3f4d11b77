//! TOML-based application configuration.
//!
//! Stores user preferences: segment lengths and long-break cadence, the
//! checkpoint debounce window, the REST base URL and notification toggles.
//! Stored at `~/.config/studyflow/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::CoreError;
use crate::timer::SegmentPolicy;

/// Segment-length configuration (minutes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentsConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_short_break")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break")]
    pub long_break_minutes: u32,
    #[serde(default = "default_long_break_every")]
    pub long_break_every: u32,
}

/// Checkpoint sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Trailing debounce window for checkpoint writes, in seconds.
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
    /// Base URL of the record-storage REST API, if syncing remotely.
    #[serde(default)]
    pub api_base_url: Option<String>,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studyflow/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub segments: SegmentsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_long_break_every() -> u32 {
    4
}
fn default_debounce_secs() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for SegmentsConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break(),
            long_break_minutes: default_long_break(),
            long_break_every: default_long_break_every(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_secs: default_debounce_secs(),
            api_base_url: None,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            segments: SegmentsConfig::default(),
            sync: SyncConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the default on first run.
    pub fn load() -> Result<Self, CoreError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| CoreError::Custom(e.to_string()))
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Load from disk, returning the default on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), CoreError> {
        let content = toml::to_string_pretty(self).map_err(|e| CoreError::Custom(e.to_string()))?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Get a config value as a string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key and persist. The new value is
    /// parsed against the existing field's type; unknown keys are rejected.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut json = serde_json::to_value(&*self)?;

        let mut current = &mut json;
        let mut parts = key.split('.').peekable();
        loop {
            let part = parts
                .next()
                .ok_or_else(|| CoreError::Custom("config key is empty".into()))?;
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| CoreError::Custom(format!("unknown config key: {key}")))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| CoreError::Custom(format!("unknown config key: {key}")))?;
                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| CoreError::Custom(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|e| CoreError::Custom(e.to_string()))?
                            .into(),
                    ),
                    _ => serde_json::Value::String(value.into()),
                };
                obj.insert(part.to_string(), new_value);
                break;
            }
            current = current
                .get_mut(part)
                .ok_or_else(|| CoreError::Custom(format!("unknown config key: {key}")))?;
        }

        *self = serde_json::from_value(json)?;
        self.save()?;
        Ok(())
    }

    /// Derive the timer's segment policy (seconds) from the configured
    /// minutes.
    pub fn policy(&self) -> SegmentPolicy {
        SegmentPolicy {
            work_secs: i64::from(self.segments.work_minutes) * 60,
            short_break_secs: i64::from(self.segments.short_break_minutes) * 60,
            long_break_secs: i64::from(self.segments.long_break_minutes) * 60,
            long_break_every: self.segments.long_break_every,
        }
    }
}
