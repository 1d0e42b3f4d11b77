use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{SessionType, TimerPhase};

/// Every state change in the timer subsystem produces an Event.
/// The host UI renders them; the CLI prints them as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        session_type: SessionType,
        subject: String,
        total_secs: i64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: i64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: i64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// A work or break segment ran out. Emitted exactly once per segment,
    /// whether observed by a live tick or finalized retroactively on recovery.
    SegmentCompleted {
        completion_id: Uuid,
        session_type: SessionType,
        subject: String,
        duration_min: u32,
        at: DateTime<Utc>,
    },
    /// The alarm flag was cleared and the next segment queued.
    AlarmStopped {
        next_session_type: SessionType,
        next_total_secs: i64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: TimerPhase,
        session_type: SessionType,
        subject: String,
        remaining_secs: i64,
        total_secs: i64,
        pomodoro_count: u32,
        breaks_count: u32,
        alarm_firing: bool,
        at: DateTime<Utc>,
    },
}
