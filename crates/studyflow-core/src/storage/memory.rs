//! In-memory store.
//!
//! Reference implementation of the store contracts, used by the test suite
//! and as the fixture for exactly-once and version-conflict scenarios.

use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use super::{CheckpointStore, CompletedSession, GoalStore, SessionLog};
use crate::alarm::{AlarmFlag, AlarmFlagStore};
use crate::error::StoreError;
use crate::goals::{Goal, GoalForm};
use crate::timer::TimerCheckpoint;

#[derive(Debug, Default)]
struct Inner {
    checkpoint: Option<TimerCheckpoint>,
    sessions: Vec<CompletedSession>,
    goals: Vec<Goal>,
    alarm: AlarmFlag,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }
}

impl CheckpointStore for MemoryStore {
    fn load(&self) -> Result<Option<TimerCheckpoint>, StoreError> {
        Ok(self.inner.lock().unwrap().checkpoint.clone())
    }

    fn save(&self, checkpoint: &TimerCheckpoint) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(stored) = &inner.checkpoint {
            if checkpoint.version <= stored.version {
                return Err(StoreError::StaleVersion {
                    stored: stored.version,
                    attempted: checkpoint.version,
                });
            }
        }
        inner.checkpoint = Some(checkpoint.clone());
        Ok(())
    }

    fn delete(&self) -> Result<(), StoreError> {
        self.inner.lock().unwrap().checkpoint = None;
        Ok(())
    }

    fn delete_if_version(&self, version: u64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match &inner.checkpoint {
            Some(stored) if stored.version <= version => {
                inner.checkpoint = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl SessionLog for MemoryStore {
    fn append(&self, session: &CompletedSession) -> Result<CompletedSession, StoreError> {
        let mut stored = session.clone();
        stored.id = Some(Uuid::new_v4().to_string());
        self.inner.lock().unwrap().sessions.push(stored.clone());
        Ok(stored)
    }

    fn list(&self) -> Result<Vec<CompletedSession>, StoreError> {
        Ok(self.inner.lock().unwrap().sessions.clone())
    }
}

impl GoalStore for MemoryStore {
    fn list_goals(&self) -> Result<Vec<Goal>, StoreError> {
        Ok(self.inner.lock().unwrap().goals.clone())
    }

    fn create_goal(&self, form: &GoalForm) -> Result<Vec<Goal>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.goals.push(Goal {
            id: Uuid::new_v4().to_string(),
            title: form.title.clone(),
            target_minutes: form.target_minutes,
            period: form.period,
            subject: form.subject.clone(),
            color: form.color.clone(),
            created_at: Some(Utc::now()),
        });
        Ok(inner.goals.clone())
    }

    fn delete_goal(&self, id: &str) -> Result<Vec<Goal>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.goals.retain(|g| g.id != id);
        Ok(inner.goals.clone())
    }
}

impl AlarmFlagStore for MemoryStore {
    fn load_alarm(&self) -> Result<AlarmFlag, StoreError> {
        Ok(self.inner.lock().unwrap().alarm.clone())
    }

    fn save_alarm(&self, flag: &AlarmFlag) -> Result<(), StoreError> {
        self.inner.lock().unwrap().alarm = flag.clone();
        Ok(())
    }
}
