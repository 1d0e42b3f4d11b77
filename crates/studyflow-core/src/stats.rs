//! Summary statistics over the completed-session log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::CompletedSession;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyStats {
    pub total_sessions: u64,
    pub total_minutes: u64,
    pub today_sessions: u64,
    pub today_minutes: u64,
}

/// Fold the session log into totals. Pure; recomputed per call.
pub fn study_stats(sessions: &[CompletedSession], now: DateTime<Utc>) -> StudyStats {
    let today = now.date_naive();
    let mut stats = StudyStats::default();
    for session in sessions {
        stats.total_sessions += 1;
        stats.total_minutes += u64::from(session.duration);
        if session.start_time.is_some_and(|t| t.date_naive() == today) {
            stats.today_sessions += 1;
            stats.today_minutes += u64::from(session.duration);
        }
    }
    stats
}
