//! # Studyflow Core Library
//!
//! Core business logic for the Studyflow study timer: a persistent countdown
//! that survives reloads, backgrounded tabs and device sleep while staying
//! accurate against the wall clock, plus the goal-progress aggregation
//! derived from completed sessions.
//!
//! ## Architecture
//!
//! - **Timer**: a wall-clock-based state machine; the caller drives a 1 Hz
//!   `tick()` for display while remaining time is always recomputed from
//!   timestamps
//! - **Recovery**: reconciles local state against the stored checkpoint on
//!   mount and visibility regain, finalizing completions that elapsed while
//!   no tick was watching
//! - **Stores**: checkpoint, session-log and goal contracts backed by local
//!   SQLite, the dashboard's REST endpoints, or an in-memory fixture
//! - **Goals**: pure percent-complete aggregation over the session log
//!
//! ## Key Components
//!
//! - [`TimerController`]: effectful wiring -- completion runs exactly once
//! - [`TimerStateMachine`]: the countdown state machine
//! - [`AlarmManager`]: durable firing flag and notification trigger
//! - [`goal_progress`]: period-windowed goal aggregation

pub mod alarm;
pub mod clock;
pub mod error;
pub mod events;
pub mod goals;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod timer;

pub use alarm::{AlarmFlag, AlarmManager, LogNotifier, Notifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, StoreError, ValidationError};
pub use events::Event;
pub use goals::{goal_progress, Goal, GoalForm, GoalPeriod, GoalProgress};
pub use stats::{study_stats, StudyStats};
pub use storage::{
    ApiClient, CheckpointStore, CompletedSession, Config, Database, GoalStore, MemoryStore,
    SessionLog,
};
pub use sync::CheckpointFlusher;
pub use timer::{
    Completion, RecoveryAction, RecoveryReport, SegmentPolicy, SessionType, TimerCheckpoint,
    TimerController, TimerPhase, TimerStateMachine,
};
