//! Study goals and goal-progress aggregation.
//!
//! Progress is a pure function over the completed-session log: recomputed on
//! demand from the current snapshot, never cached or mutated.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::storage::CompletedSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    Daily,
    /// Trailing 7x24h window from now -- rolling, not calendar-aligned.
    Weekly,
}

/// A study goal. Fully user-owned: deleted explicitly, never auto-expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub target_minutes: u32,
    pub period: GoalPeriod,
    /// Optional subject filter; matched case-insensitively against sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// User input for creating a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalForm {
    pub title: String,
    pub target_minutes: u32,
    pub period: GoalPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default)]
    pub color: String,
}

impl GoalForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "title".into(),
                message: "must not be empty".into(),
            });
        }
        if self.target_minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "targetMinutes".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Percent-complete for one goal over its current period window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub goal_id: String,
    pub completed_minutes: u32,
    pub percentage: u32,
    pub is_completed: bool,
}

/// Compute progress for `goal` against the full session log at `now`.
/// Idempotent and side-effect free.
pub fn goal_progress(goal: &Goal, sessions: &[CompletedSession], now: DateTime<Utc>) -> GoalProgress {
    let completed_minutes: u32 = sessions
        .iter()
        .filter(|s| subject_matches(goal, s))
        .filter(|s| in_period(goal.period, s.start_time, now))
        .map(|s| s.duration)
        .sum();

    let percentage = if goal.target_minutes == 0 {
        100
    } else {
        let pct = (completed_minutes as f64 * 100.0 / goal.target_minutes as f64).round() as u32;
        pct.min(100)
    };

    GoalProgress {
        goal_id: goal.id.clone(),
        completed_minutes,
        percentage,
        is_completed: percentage >= 100,
    }
}

fn subject_matches(goal: &Goal, session: &CompletedSession) -> bool {
    match goal.subject.as_deref() {
        None => true,
        Some(subject) => session.title.eq_ignore_ascii_case(subject),
    }
}

fn in_period(period: GoalPeriod, start_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let Some(start) = start_time else {
        // A session without a start time cannot be placed in any window.
        return false;
    };
    match period {
        GoalPeriod::Daily => start.date_naive() == now.date_naive(),
        GoalPeriod::Weekly => start > now - Duration::days(7) && start <= now,
    }
}
