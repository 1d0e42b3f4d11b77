//! The durable timer checkpoint.
//!
//! One live checkpoint exists per user. Field names serialize in camelCase to
//! match the `/active-timer` wire shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Work,
    Break,
}

/// Snapshot of the countdown state used to survive reloads.
///
/// Invariant: while `is_active && !is_paused`, `started_at` is set and the
/// true remaining time is `max(0, remaining_at_pause - (now - started_at))`.
/// While paused or inactive the true remaining time is `remaining_at_pause`
/// exactly. `remaining_at_pause` only changes at transition points, never on
/// the display tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerCheckpoint {
    pub is_active: bool,
    pub is_paused: bool,
    /// Wall-clock instant the countdown was last (re)started.
    pub started_at: Option<DateTime<Utc>>,
    /// Authoritative remaining duration in seconds as of the last transition.
    pub remaining_at_pause: i64,
    /// Duration in seconds of the current segment.
    pub total_duration: i64,
    pub session_type: SessionType,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub pomodoro_count: u32,
    #[serde(default)]
    pub breaks_count: u32,
    /// Wall-clock instant the work session began (for session logging).
    #[serde(default)]
    pub session_start_time: Option<DateTime<Utc>>,
    /// Monotonically increasing write sequence; stores reject stale writes.
    #[serde(default)]
    pub version: u64,
}

impl TimerCheckpoint {
    pub fn is_running(&self) -> bool {
        self.is_active && !self.is_paused
    }

    /// True remaining seconds at `now`, clamped at zero.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> i64 {
        if self.is_running() {
            if let Some(started) = self.started_at {
                let elapsed = (now - started).num_seconds();
                return (self.remaining_at_pause - elapsed).max(0);
            }
        }
        self.remaining_at_pause
    }

    /// Segment length in whole minutes, rounded (SessionLog boundary).
    pub fn duration_min(&self) -> u32 {
        minutes_rounded(self.total_duration)
    }
}

/// Convert seconds to minutes, rounding to the nearest whole minute.
pub(crate) fn minutes_rounded(secs: i64) -> u32 {
    ((secs.max(0) + 30) / 60) as u32
}
