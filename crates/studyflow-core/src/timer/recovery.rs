//! Checkpoint reconciliation on mount and visibility regain.
//!
//! The timer's truth lives in wall-clock timestamps, so a backgrounded tab or
//! a sleeping device can only delay *observing* a completion, never cause
//! drift. Reconciliation decides what the stored checkpoint means at `now`;
//! the controller applies the decision and its side effects.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::checkpoint::TimerCheckpoint;
use crate::events::Event;

/// What a stored checkpoint means at the current instant.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// No checkpoint on record; remain idle.
    Absent,
    /// The checkpoint was running and its deadline passed while unobserved.
    /// The segment must be finalized retroactively, exactly once.
    Elapsed(TimerCheckpoint),
    /// The checkpoint still has time on the clock (or is paused/queued);
    /// adopt it and continue from `remaining_secs`.
    Adopt {
        checkpoint: TimerCheckpoint,
        remaining_secs: i64,
    },
}

/// Pure reconciliation decision. A running checkpoint whose recomputed
/// remaining time is zero or negative is treated as already completed, not
/// as an inconsistency.
pub fn reconcile(checkpoint: Option<TimerCheckpoint>, now: DateTime<Utc>) -> RecoveryOutcome {
    match checkpoint {
        None => RecoveryOutcome::Absent,
        Some(cp) => {
            let remaining = cp.remaining_at(now);
            if cp.is_running() && remaining <= 0 {
                RecoveryOutcome::Elapsed(cp)
            } else {
                RecoveryOutcome::Adopt {
                    remaining_secs: remaining,
                    checkpoint: cp,
                }
            }
        }
    }
}

/// What a recovery pass did to local state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    RemainedIdle,
    Resumed { remaining_secs: i64 },
    /// The segment elapsed while the tab was away; completion effects ran
    /// (or were skipped because another tab finalized first).
    Finalized { event: Event },
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    #[serde(flatten)]
    pub action: RecoveryAction,
    /// An alarm raised elsewhere is reflected without re-notifying.
    pub alarm_firing: bool,
}
