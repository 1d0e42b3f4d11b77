//! Store contracts and implementations.
//!
//! The timer treats its stores as external collaborators behind narrow
//! traits: a single-record checkpoint store, an append-only session log and
//! a CRUD goal store. `Database` backs them with local SQLite, `ApiClient`
//! with the dashboard's REST endpoints, `MemoryStore` with an in-process map
//! for tests.

pub mod config;
pub mod database;
pub mod http;
pub mod memory;

pub use config::Config;
pub use database::Database;
pub use http::ApiClient;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::StoreError;
use crate::goals::{Goal, GoalForm};
use crate::timer::TimerCheckpoint;

/// A finished work session. Write-once; the durable record of a pomodoro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Subject of the work segment.
    pub title: String,
    /// Minutes, rounded at the timer boundary.
    pub duration: u32,
    #[serde(rename = "type", default = "default_session_kind")]
    pub kind: String,
    pub start_time: Option<DateTime<Utc>>,
}

fn default_session_kind() -> String {
    "study".into()
}

/// Durable single-record store for the per-user timer checkpoint.
pub trait CheckpointStore: Send + Sync {
    fn load(&self) -> Result<Option<TimerCheckpoint>, StoreError>;

    /// Upsert the checkpoint. Fails with `StoreError::StaleVersion` when the
    /// incoming version is not newer than the stored one, so the record is a
    /// true source of truth rather than last-writer-wins.
    fn save(&self, checkpoint: &TimerCheckpoint) -> Result<(), StoreError>;

    fn delete(&self) -> Result<(), StoreError>;

    /// Conditional consume: delete the record iff its stored version is not
    /// newer than `version`. Returns whether a record was consumed. Only the
    /// caller that wins the consume runs completion side effects.
    fn delete_if_version(&self, version: u64) -> Result<bool, StoreError>;
}

/// Append-only log of completed work sessions.
pub trait SessionLog: Send + Sync {
    fn append(&self, session: &CompletedSession) -> Result<CompletedSession, StoreError>;
    fn list(&self) -> Result<Vec<CompletedSession>, StoreError>;
}

/// CRUD store for study goals.
pub trait GoalStore: Send + Sync {
    fn list_goals(&self) -> Result<Vec<Goal>, StoreError>;
    /// Create a goal; returns the updated goal list.
    fn create_goal(&self, form: &GoalForm) -> Result<Vec<Goal>, StoreError>;
    /// Delete a goal by id; returns the updated goal list.
    fn delete_goal(&self, id: &str) -> Result<Vec<Goal>, StoreError>;
}

/// Returns `~/.config/studyflow[-dev]/` based on STUDYFLOW_ENV.
///
/// Set STUDYFLOW_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STUDYFLOW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("studyflow-dev")
    } else {
        base_dir.join("studyflow")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
