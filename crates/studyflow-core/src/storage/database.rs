//! SQLite-backed store.
//!
//! Backs the CLI's offline mode with persistent storage for:
//! - Completed study sessions
//! - Study goals
//! - Key-value state (checkpoint mirror, alarm flag)

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{data_dir, CheckpointStore, CompletedSession, GoalStore, SessionLog};
use crate::alarm::{AlarmFlag, AlarmFlagStore};
use crate::error::StoreError;
use crate::goals::{Goal, GoalForm, GoalPeriod};
use crate::timer::TimerCheckpoint;

const CHECKPOINT_KEY: &str = "active_timer";
const ALARM_KEY: &str = "alarm_flag";

/// SQLite database at `~/.config/studyflow/studyflow.db`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the default database, creating the file and schema if needed.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("studyflow.db");
        Self::open_at(&path)
    }

    /// Open a database at an explicit path (integration tests use a tempdir).
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.lock().unwrap().execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                duration_min INTEGER NOT NULL,
                kind        TEXT NOT NULL DEFAULT 'study',
                start_time  TEXT
            );

            CREATE TABLE IF NOT EXISTS goals (
                id             TEXT PRIMARY KEY,
                title          TEXT NOT NULL,
                target_minutes INTEGER NOT NULL,
                period         TEXT NOT NULL,
                subject        TEXT,
                color          TEXT NOT NULL DEFAULT '',
                created_at     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON sessions(start_time);",
        )
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn stored_checkpoint(conn: &Connection) -> Result<Option<TimerCheckpoint>, StoreError> {
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![CHECKPOINT_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

impl CheckpointStore for Database {
    fn load(&self) -> Result<Option<TimerCheckpoint>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::stored_checkpoint(&conn)
    }

    fn save(&self, checkpoint: &TimerCheckpoint) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        if let Some(stored) = Self::stored_checkpoint(&conn)? {
            if checkpoint.version <= stored.version {
                return Err(StoreError::StaleVersion {
                    stored: stored.version,
                    attempted: checkpoint.version,
                });
            }
        }
        let json = serde_json::to_string(checkpoint)?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![CHECKPOINT_KEY, json],
        )?;
        Ok(())
    }

    fn delete(&self) -> Result<(), StoreError> {
        self.kv_delete(CHECKPOINT_KEY)
    }

    fn delete_if_version(&self, version: u64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        match Self::stored_checkpoint(&conn)? {
            Some(stored) if stored.version <= version => {
                conn.execute("DELETE FROM kv WHERE key = ?1", params![CHECKPOINT_KEY])?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl SessionLog for Database {
    fn append(&self, session: &CompletedSession) -> Result<CompletedSession, StoreError> {
        let conn = self.conn.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO sessions (id, title, duration_min, kind, start_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                session.title,
                session.duration,
                session.kind,
                session.start_time.map(|t| t.to_rfc3339()),
            ],
        )?;
        let mut stored = session.clone();
        stored.id = Some(id);
        Ok(stored)
    }

    fn list(&self) -> Result<Vec<CompletedSession>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, duration_min, kind, start_time FROM sessions ORDER BY start_time",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, title, duration, kind, start_time) = row?;
            sessions.push(CompletedSession {
                id: Some(id),
                title,
                duration,
                kind,
                start_time: start_time.and_then(|t| parse_timestamp(&t)),
            });
        }
        Ok(sessions)
    }
}

impl GoalStore for Database {
    fn list_goals(&self) -> Result<Vec<Goal>, StoreError> {
        let conn = self.conn.lock().unwrap();
        list_goals(&conn)
    }

    fn create_goal(&self, form: &GoalForm) -> Result<Vec<Goal>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO goals (id, title, target_minutes, period, subject, color, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Uuid::new_v4().to_string(),
                form.title,
                form.target_minutes,
                period_str(form.period),
                form.subject,
                form.color,
                Utc::now().to_rfc3339(),
            ],
        )?;
        list_goals(&conn)
    }

    fn delete_goal(&self, id: &str) -> Result<Vec<Goal>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM goals WHERE id = ?1", params![id])?;
        list_goals(&conn)
    }
}

impl AlarmFlagStore for Database {
    fn load_alarm(&self) -> Result<AlarmFlag, StoreError> {
        match self.kv_get(ALARM_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(AlarmFlag::default()),
        }
    }

    fn save_alarm(&self, flag: &AlarmFlag) -> Result<(), StoreError> {
        self.kv_set(ALARM_KEY, &serde_json::to_string(flag)?)
    }
}

fn list_goals(conn: &Connection) -> Result<Vec<Goal>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, target_minutes, period, subject, color, created_at
         FROM goals ORDER BY created_at",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, u32>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut goals = Vec::new();
    for row in rows {
        let (id, title, target_minutes, period, subject, color, created_at) = row?;
        goals.push(Goal {
            id,
            title,
            target_minutes,
            period: parse_period(&period),
            subject,
            color,
            created_at: parse_timestamp(&created_at),
        });
    }
    Ok(goals)
}

fn period_str(period: GoalPeriod) -> &'static str {
    match period {
        GoalPeriod::Daily => "daily",
        GoalPeriod::Weekly => "weekly",
    }
}

fn parse_period(s: &str) -> GoalPeriod {
    match s {
        "weekly" => GoalPeriod::Weekly,
        _ => GoalPeriod::Daily,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::SessionType;

    fn checkpoint(version: u64) -> TimerCheckpoint {
        TimerCheckpoint {
            is_active: true,
            is_paused: false,
            started_at: Some(Utc::now()),
            remaining_at_pause: 1500,
            total_duration: 1500,
            session_type: SessionType::Work,
            subject: "Biology".into(),
            pomodoro_count: 2,
            breaks_count: 1,
            session_start_time: Some(Utc::now()),
            version,
        }
    }

    #[test]
    fn checkpoint_roundtrips_through_kv() {
        let db = Database::open_memory().unwrap();
        assert!(db.load().unwrap().is_none());

        let cp = checkpoint(1);
        db.save(&cp).unwrap();
        let loaded = db.load().unwrap().unwrap();
        assert_eq!(loaded.subject, "Biology");
        assert_eq!(loaded.version, 1);

        db.delete().unwrap();
        assert!(db.load().unwrap().is_none());
    }

    #[test]
    fn save_enforces_version_monotonicity() {
        let db = Database::open_memory().unwrap();
        db.save(&checkpoint(3)).unwrap();
        assert!(matches!(
            db.save(&checkpoint(3)),
            Err(StoreError::StaleVersion {
                stored: 3,
                attempted: 3
            })
        ));
        db.save(&checkpoint(4)).unwrap();
    }

    #[test]
    fn delete_if_version_consumes_at_most_once() {
        let db = Database::open_memory().unwrap();
        db.save(&checkpoint(2)).unwrap();
        assert!(db.delete_if_version(2).unwrap());
        assert!(!db.delete_if_version(2).unwrap());
    }

    #[test]
    fn sessions_append_and_list() {
        let db = Database::open_memory().unwrap();
        let stored = db
            .append(&CompletedSession {
                id: None,
                title: "Math".into(),
                duration: 25,
                kind: "study".into(),
                start_time: Some(Utc::now()),
            })
            .unwrap();
        assert!(stored.id.is_some());

        let sessions = db.list().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].title, "Math");
        assert_eq!(sessions[0].duration, 25);
    }

    #[test]
    fn goals_crud_roundtrip() {
        let db = Database::open_memory().unwrap();
        let goals = db
            .create_goal(&GoalForm {
                title: "Daily math".into(),
                target_minutes: 120,
                period: GoalPeriod::Daily,
                subject: Some("Math".into()),
                color: "#3b82f6".into(),
            })
            .unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].period, GoalPeriod::Daily);

        let goals = db.delete_goal(&goals[0].id).unwrap();
        assert!(goals.is_empty());
    }

    #[test]
    fn alarm_flag_persists_in_kv() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.load_alarm().unwrap(), AlarmFlag::default());

        let flag = AlarmFlag {
            firing: true,
            completion_id: Some(Uuid::new_v4()),
        };
        db.save_alarm(&flag).unwrap();
        assert_eq!(db.load_alarm().unwrap(), flag);
    }
}
