//! Effectful wiring around the timer state machine.
//!
//! The controller owns the engine plus its collaborators (checkpoint store,
//! session log, alarm, debounced flusher) and turns state transitions into
//! side effects. Completion effects run at most once per segment: the engine
//! flips itself inactive before effects run, and a conditional consume of the
//! stored checkpoint decides the winner when two tabs race.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::checkpoint::SessionType;
use super::engine::{Completion, SegmentPolicy, TimerStateMachine};
use super::recovery::{reconcile, RecoveryAction, RecoveryOutcome, RecoveryReport};
use crate::alarm::AlarmManager;
use crate::clock::Clock;
use crate::error::{CoreError, StoreError};
use crate::events::Event;
use crate::storage::{CheckpointStore, CompletedSession, SessionLog};
use crate::sync::CheckpointFlusher;

pub struct TimerController {
    engine: TimerStateMachine,
    checkpoints: Arc<dyn CheckpointStore>,
    sessions: Arc<dyn SessionLog>,
    alarm: AlarmManager,
    flusher: CheckpointFlusher,
    clock: Arc<dyn Clock>,
}

impl TimerController {
    pub fn new(
        policy: SegmentPolicy,
        debounce_secs: u64,
        checkpoints: Arc<dyn CheckpointStore>,
        sessions: Arc<dyn SessionLog>,
        alarm: AlarmManager,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: TimerStateMachine::new(policy, clock.clone()),
            checkpoints,
            sessions,
            alarm,
            flusher: CheckpointFlusher::new(debounce_secs),
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerStateMachine {
        &self.engine
    }

    pub fn alarm(&self) -> &AlarmManager {
        &self.alarm
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot(self.alarm.is_alarm_active())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the current segment. The first checkpoint of a segment is
    /// written through immediately; later transitions ride the debounce.
    pub fn start(&mut self, subject: &str, total_secs: Option<i64>) -> Result<Option<Event>, CoreError> {
        let event = self.engine.start(subject, total_secs)?;
        if event.is_some() {
            self.write_checkpoint();
        }
        Ok(event)
    }

    pub fn pause(&mut self) -> Option<Event> {
        let event = self.engine.pause();
        if event.is_some() {
            self.schedule_flush();
        }
        event
    }

    pub fn resume(&mut self) -> Option<Event> {
        let event = self.engine.resume();
        if event.is_some() {
            self.schedule_flush();
        }
        event
    }

    /// Cancel the session. The pending flush is dropped before the remote
    /// delete so a queued snapshot cannot resurrect the record.
    pub fn reset(&mut self) -> Event {
        self.flusher.cancel();
        let event = self.engine.reset();
        if let Err(e) = self.checkpoints.delete() {
            tracing::warn!("checkpoint delete failed: {e}");
        }
        event
    }

    /// Drive the 1 Hz display tick. Returns the completion event when the
    /// segment ends; otherwise pumps any due checkpoint flush.
    pub fn tick(&mut self) -> Option<Event> {
        if let Some(completion) = self.engine.tick() {
            return Some(self.finalize(completion));
        }
        self.pump_flush(self.clock.now());
        None
    }

    /// Clear the alarm and queue the next segment, writing it through.
    pub fn stop_alarm(&mut self) -> Result<Option<Event>, CoreError> {
        self.alarm.stop_alarm()?;
        let event = self.engine.advance_segment();
        if event.is_some() {
            self.write_checkpoint();
        }
        Ok(event)
    }

    /// Synchronously drain any pending checkpoint write (unload hook,
    /// process exit).
    pub fn flush_now(&mut self) {
        if let Some(checkpoint) = self.flusher.flush_now() {
            self.save_swallowing(&checkpoint);
        }
    }

    // ── Recovery ─────────────────────────────────────────────────────

    /// Reconcile local state against the stored checkpoint. Runs on mount
    /// and whenever the tab regains visibility.
    pub fn recover(&mut self) -> RecoveryReport {
        let stored = match self.checkpoints.load() {
            Ok(cp) => cp,
            Err(e) => {
                tracing::warn!("checkpoint read failed, trusting local state: {e}");
                self.engine.checkpoint().cloned()
            }
        };

        let action = match reconcile(stored, self.clock.now()) {
            RecoveryOutcome::Absent => {
                self.engine.clear_checkpoint();
                RecoveryAction::RemainedIdle
            }
            RecoveryOutcome::Elapsed(checkpoint) => {
                // The deadline passed while no tick was watching. Adopt the
                // stored state and let the normal completion path finalize
                // it -- same effects, exactly once.
                self.engine.adopt(checkpoint);
                match self.engine.tick() {
                    Some(completion) => RecoveryAction::Finalized {
                        event: self.finalize(completion),
                    },
                    None => RecoveryAction::RemainedIdle,
                }
            }
            RecoveryOutcome::Adopt {
                checkpoint,
                remaining_secs,
            } => {
                let resumed = checkpoint.is_running();
                self.engine.adopt(checkpoint);
                if resumed {
                    RecoveryAction::Resumed { remaining_secs }
                } else {
                    RecoveryAction::RemainedIdle
                }
            }
        };

        RecoveryReport {
            action,
            // Reflect an alarm raised elsewhere without re-notifying.
            alarm_firing: self.alarm.is_alarm_active(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finalize(&mut self, completion: Completion) -> Event {
        self.flusher.cancel();

        let consumed = match self.checkpoints.delete_if_version(completion.version) {
            Ok(consumed) => consumed,
            Err(e) => {
                // Store unreachable: local state is the only truth we have,
                // so run the effects rather than dropping the completion.
                tracing::warn!("checkpoint consume failed, trusting local completion: {e}");
                true
            }
        };

        if consumed {
            if let Err(e) = self.alarm.start_alarm(completion.id) {
                tracing::warn!("alarm flag write failed: {e}");
            }
            let (title, body) = notification_copy(&completion);
            if let Err(e) = self.alarm.notify(&title, &body) {
                tracing::warn!("notification trigger failed: {e}");
            }
            if completion.session_type == SessionType::Work {
                let record = CompletedSession {
                    id: None,
                    title: completion.subject.clone(),
                    duration: completion.duration_min,
                    kind: "study".into(),
                    start_time: completion.session_start_time,
                };
                if let Err(e) = self.sessions.append(&record) {
                    tracing::warn!("session append failed: {e}");
                }
            }
        } else {
            tracing::debug!(
                completion_id = %completion.id,
                "segment already finalized by another tab"
            );
        }

        Event::SegmentCompleted {
            completion_id: completion.id,
            session_type: completion.session_type,
            subject: completion.subject,
            duration_min: completion.duration_min,
            at: completion.at,
        }
    }

    fn schedule_flush(&mut self) {
        if let Some(cp) = self.engine.checkpoint() {
            self.flusher.schedule(cp.clone(), self.clock.now());
        }
    }

    fn pump_flush(&mut self, now: DateTime<Utc>) {
        if let Some(checkpoint) = self.flusher.take_ready(now) {
            self.save_swallowing(&checkpoint);
        }
    }

    fn save_swallowing(&self, checkpoint: &crate::timer::TimerCheckpoint) {
        match self.checkpoints.save(checkpoint) {
            Ok(()) => tracing::debug!(version = checkpoint.version, "checkpoint flushed"),
            Err(StoreError::StaleVersion { stored, attempted }) => {
                tracing::debug!(stored, attempted, "checkpoint superseded by another writer");
            }
            Err(e) => {
                // Sync failure: local state stays authoritative until the
                // next successful write.
                tracing::warn!("checkpoint flush failed: {e}");
            }
        }
    }

    fn write_checkpoint(&mut self) {
        self.flusher.cancel();
        if let Some(cp) = self.engine.checkpoint().cloned() {
            self.save_swallowing(&cp);
        }
    }
}

fn notification_copy(completion: &Completion) -> (String, String) {
    match completion.session_type {
        SessionType::Work => (
            "Study session complete".to_string(),
            format!(
                "{}: {} min done. Time for a break.",
                completion.subject, completion.duration_min
            ),
        ),
        SessionType::Break => (
            "Break over".to_string(),
            "Ready for the next study session.".to_string(),
        ),
    }
}
