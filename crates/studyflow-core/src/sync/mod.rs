//! Debounced checkpoint write-through.
//!
//! Every state-affecting transition schedules a full-snapshot write; writes
//! are coalesced with a trailing debounce window to bound write volume. Local
//! state is always authoritative for display -- the remote checkpoint is a
//! best-effort durability record for recovery, not a lock.

use chrono::{DateTime, Duration, Utc};

use crate::timer::TimerCheckpoint;

#[derive(Debug, Clone)]
struct PendingFlush {
    checkpoint: TimerCheckpoint,
    flush_at: DateTime<Utc>,
}

/// Coalesces checkpoint snapshots behind a trailing debounce window.
#[derive(Debug)]
pub struct CheckpointFlusher {
    pending: Option<PendingFlush>,
    debounce: Duration,
}

impl CheckpointFlusher {
    pub fn new(debounce_secs: u64) -> Self {
        Self {
            pending: None,
            debounce: Duration::seconds(debounce_secs as i64),
        }
    }

    /// Schedule a snapshot for writing. A newer snapshot replaces a pending
    /// one and restarts the trailing window.
    pub fn schedule(&mut self, checkpoint: TimerCheckpoint, now: DateTime<Utc>) {
        self.pending = Some(PendingFlush {
            checkpoint,
            flush_at: now + self.debounce,
        });
    }

    /// Take the pending snapshot if its debounce window has elapsed.
    pub fn take_ready(&mut self, now: DateTime<Utc>) -> Option<TimerCheckpoint> {
        if self.pending.as_ref()?.flush_at <= now {
            self.pending.take().map(|p| p.checkpoint)
        } else {
            None
        }
    }

    /// Take the pending snapshot regardless of the window (unload hooks,
    /// process exit).
    pub fn flush_now(&mut self) -> Option<TimerCheckpoint> {
        self.pending.take().map(|p| p.checkpoint)
    }

    /// Drop any pending write. Must run before a checkpoint delete so a
    /// stale snapshot cannot resurrect the record afterwards.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time until the pending snapshot is ready, if any.
    pub fn time_until_ready(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.pending.as_ref().map(|p| (p.flush_at - now).max(Duration::zero()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{SessionType, TimerCheckpoint};

    fn checkpoint(version: u64) -> TimerCheckpoint {
        TimerCheckpoint {
            is_active: true,
            is_paused: false,
            started_at: None,
            remaining_at_pause: 1500,
            total_duration: 1500,
            session_type: SessionType::Work,
            subject: "Biology".into(),
            pomodoro_count: 0,
            breaks_count: 0,
            session_start_time: None,
            version,
        }
    }

    #[test]
    fn holds_snapshot_until_window_elapses() {
        let mut flusher = CheckpointFlusher::new(5);
        let now = Utc::now();
        flusher.schedule(checkpoint(1), now);

        assert!(flusher.take_ready(now).is_none());
        assert!(flusher.take_ready(now + Duration::seconds(4)).is_none());
        let flushed = flusher.take_ready(now + Duration::seconds(5)).unwrap();
        assert_eq!(flushed.version, 1);
        assert!(!flusher.is_pending());
    }

    #[test]
    fn newer_snapshot_coalesces_and_restarts_window() {
        let mut flusher = CheckpointFlusher::new(5);
        let now = Utc::now();
        flusher.schedule(checkpoint(1), now);
        flusher.schedule(checkpoint(2), now + Duration::seconds(4));

        // Original deadline has passed but the window restarted.
        assert!(flusher.take_ready(now + Duration::seconds(5)).is_none());
        let flushed = flusher.take_ready(now + Duration::seconds(9)).unwrap();
        assert_eq!(flushed.version, 2);
    }

    #[test]
    fn flush_now_ignores_the_window() {
        let mut flusher = CheckpointFlusher::new(5);
        let now = Utc::now();
        flusher.schedule(checkpoint(3), now);
        assert_eq!(flusher.flush_now().unwrap().version, 3);
        assert!(flusher.flush_now().is_none());
    }

    #[test]
    fn cancel_drops_pending_write() {
        let mut flusher = CheckpointFlusher::new(5);
        let now = Utc::now();
        flusher.schedule(checkpoint(1), now);
        flusher.cancel();
        assert!(flusher.take_ready(now + Duration::seconds(10)).is_none());
    }
}
