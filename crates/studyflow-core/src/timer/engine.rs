//! Timer state machine.
//!
//! The state machine operates on wall-clock deltas -- no internal thread.
//! The caller drives a 1 Hz `tick()` while running; backgrounding can skip
//! ticks for unbounded time without drift because remaining time is always
//! recomputed from timestamps.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> ... -> (segment complete)
//! ```
//!
//! Completion is not a terminal state: `advance_segment()` rolls the
//! checkpoint into the next work/break segment once the alarm is stopped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::checkpoint::{SessionType, TimerCheckpoint};
use crate::clock::Clock;
use crate::error::ValidationError;
use crate::events::Event;

/// Segment lengths and the long-break cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPolicy {
    pub work_secs: i64,
    pub short_break_secs: i64,
    pub long_break_secs: i64,
    /// Every Nth pomodoro earns the long break.
    pub long_break_every: u32,
}

impl Default for SegmentPolicy {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            long_break_every: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

/// Data describing a finished segment. Produced once by the state machine;
/// the controller turns it into side effects (alarm, session log, consume).
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub id: Uuid,
    pub session_type: SessionType,
    pub subject: String,
    /// Segment length in whole minutes, rounded.
    pub duration_min: u32,
    pub session_start_time: Option<DateTime<Utc>>,
    /// Checkpoint version at completion; used for the conditional consume.
    pub version: u64,
    pub at: DateTime<Utc>,
}

/// Core timer state machine over the per-user checkpoint.
pub struct TimerStateMachine {
    checkpoint: Option<TimerCheckpoint>,
    policy: SegmentPolicy,
    clock: Arc<dyn Clock>,
}

impl TimerStateMachine {
    pub fn new(policy: SegmentPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            checkpoint: None,
            policy,
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        match &self.checkpoint {
            Some(cp) if cp.is_running() => TimerPhase::Running,
            Some(cp) if cp.is_active && cp.is_paused => TimerPhase::Paused,
            _ => TimerPhase::Idle,
        }
    }

    pub fn checkpoint(&self) -> Option<&TimerCheckpoint> {
        self.checkpoint.as_ref()
    }

    pub fn policy(&self) -> &SegmentPolicy {
        &self.policy
    }

    /// Remaining seconds for display, recomputed from the wall clock.
    pub fn remaining_secs(&self) -> i64 {
        match &self.checkpoint {
            Some(cp) => cp.remaining_at(self.clock.now()),
            None => self.policy.work_secs,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, alarm_firing: bool) -> Event {
        let (session_type, subject, total, pomodoros, breaks) = match &self.checkpoint {
            Some(cp) => (
                cp.session_type,
                cp.subject.clone(),
                cp.total_duration,
                cp.pomodoro_count,
                cp.breaks_count,
            ),
            None => (SessionType::Work, String::new(), self.policy.work_secs, 0, 0),
        };
        Event::StateSnapshot {
            phase: self.phase(),
            session_type,
            subject,
            remaining_secs: self.remaining_secs(),
            total_secs: total,
            pomodoro_count: pomodoros,
            breaks_count: breaks,
            alarm_firing,
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the current segment's countdown from its full duration.
    ///
    /// A work segment requires a non-empty subject (given here or carried on
    /// the checkpoint). Returns `Ok(None)` if already running.
    pub fn start(
        &mut self,
        subject: &str,
        total_secs: Option<i64>,
    ) -> Result<Option<Event>, ValidationError> {
        if self.phase() == TimerPhase::Running {
            return Ok(None);
        }

        let now = self.clock.now();
        let prior = self.checkpoint.take();
        let session_type = prior.as_ref().map(|cp| cp.session_type).unwrap_or(SessionType::Work);

        let subject = {
            let given = subject.trim();
            if given.is_empty() {
                prior.as_ref().map(|cp| cp.subject.clone()).unwrap_or_default()
            } else {
                given.to_string()
            }
        };
        if session_type == SessionType::Work && subject.is_empty() {
            self.checkpoint = prior;
            return Err(ValidationError::MissingSubject);
        }

        let total = total_secs
            .or_else(|| prior.as_ref().map(|cp| cp.total_duration))
            .unwrap_or(match session_type {
                SessionType::Work => self.policy.work_secs,
                SessionType::Break => self.policy.short_break_secs,
            });
        if total <= 0 {
            self.checkpoint = prior;
            return Err(ValidationError::InvalidDuration { secs: total });
        }

        let (pomodoros, breaks) = prior
            .as_ref()
            .map(|cp| (cp.pomodoro_count, cp.breaks_count))
            .unwrap_or((0, 0));
        let version = prior.as_ref().map(|cp| cp.version + 1).unwrap_or(1);

        self.checkpoint = Some(TimerCheckpoint {
            is_active: true,
            is_paused: false,
            started_at: Some(now),
            remaining_at_pause: total,
            total_duration: total,
            session_type,
            subject: subject.clone(),
            pomodoro_count: pomodoros,
            breaks_count: breaks,
            session_start_time: match session_type {
                SessionType::Work => Some(now),
                SessionType::Break => prior.and_then(|cp| cp.session_start_time),
            },
            version,
        });

        Ok(Some(Event::TimerStarted {
            session_type,
            subject,
            total_secs: total,
            at: now,
        }))
    }

    /// Snapshot the remaining time and stop the countdown.
    /// A second pause in a row is a no-op.
    pub fn pause(&mut self) -> Option<Event> {
        if self.phase() != TimerPhase::Running {
            return None;
        }
        let now = self.clock.now();
        let cp = self.checkpoint.as_mut()?;
        cp.remaining_at_pause = cp.remaining_at(now);
        cp.started_at = None;
        cp.is_paused = true;
        cp.breaks_count += 1;
        cp.version += 1;
        Some(Event::TimerPaused {
            remaining_secs: cp.remaining_at_pause,
            at: now,
        })
    }

    /// Restart the countdown from the paused snapshot.
    /// `remaining_at_pause` is left untouched; only `started_at` moves.
    pub fn resume(&mut self) -> Option<Event> {
        if self.phase() != TimerPhase::Paused {
            return None;
        }
        let now = self.clock.now();
        let cp = self.checkpoint.as_mut()?;
        cp.started_at = Some(now);
        cp.is_paused = false;
        cp.version += 1;
        Some(Event::TimerResumed {
            remaining_secs: cp.remaining_at_pause,
            at: now,
        })
    }

    /// Return to Idle with the full segment duration on the clock.
    pub fn reset(&mut self) -> Event {
        let now = self.clock.now();
        if let Some(cp) = self.checkpoint.as_mut() {
            cp.is_active = false;
            cp.is_paused = false;
            cp.started_at = None;
            cp.remaining_at_pause = cp.total_duration;
            cp.breaks_count = 0;
            cp.session_start_time = None;
            cp.version += 1;
        }
        Event::TimerReset { at: now }
    }

    /// Advance the countdown; returns completion data when the segment ends.
    ///
    /// Display-only otherwise: `remaining_at_pause` is not rewritten on the
    /// tick path. Completion flips the checkpoint inactive first, so a second
    /// tick (or a concurrent recovery pass) cannot complete the same segment
    /// twice in this process.
    pub fn tick(&mut self) -> Option<Completion> {
        if self.phase() != TimerPhase::Running {
            return None;
        }
        let now = self.clock.now();
        let cp = self.checkpoint.as_mut()?;
        if cp.remaining_at(now) > 0 {
            return None;
        }

        if cp.session_type == SessionType::Work {
            cp.pomodoro_count += 1;
        }
        cp.is_active = false;
        cp.is_paused = false;
        cp.started_at = None;
        cp.remaining_at_pause = 0;
        cp.version += 1;

        Some(Completion {
            id: Uuid::new_v4(),
            session_type: cp.session_type,
            subject: cp.subject.clone(),
            duration_min: cp.duration_min(),
            session_start_time: cp.session_start_time,
            version: cp.version,
            at: now,
        })
    }

    /// Queue the next segment after the alarm is stopped: work rolls into a
    /// break (long every Nth pomodoro), a break rolls back into work.
    /// Breaks never require a subject. No-op while running.
    pub fn advance_segment(&mut self) -> Option<Event> {
        if self.phase() == TimerPhase::Running {
            return None;
        }
        let now = self.clock.now();
        let cp = self.checkpoint.as_mut()?;

        let (next_type, next_secs) = match cp.session_type {
            SessionType::Work => {
                let long = self.policy.long_break_every > 0
                    && cp.pomodoro_count % self.policy.long_break_every == 0;
                (
                    SessionType::Break,
                    if long {
                        self.policy.long_break_secs
                    } else {
                        self.policy.short_break_secs
                    },
                )
            }
            SessionType::Break => (SessionType::Work, self.policy.work_secs),
        };

        cp.session_type = next_type;
        cp.total_duration = next_secs;
        cp.remaining_at_pause = next_secs;
        cp.is_active = false;
        cp.is_paused = false;
        cp.started_at = None;
        cp.session_start_time = None;
        cp.version += 1;

        Some(Event::AlarmStopped {
            next_session_type: next_type,
            next_total_secs: next_secs,
            at: now,
        })
    }

    // ── Recovery hooks ───────────────────────────────────────────────

    /// Replace local state with a checkpoint read back from the store.
    pub fn adopt(&mut self, checkpoint: TimerCheckpoint) {
        self.checkpoint = Some(checkpoint);
    }

    /// Drop local state (store had no live checkpoint).
    pub fn clear_checkpoint(&mut self) {
        self.checkpoint = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use proptest::prelude::*;

    fn machine() -> (TimerStateMachine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = TimerStateMachine::new(SegmentPolicy::default(), clock.clone());
        (engine, clock)
    }

    #[test]
    fn start_requires_subject_for_work() {
        let (mut engine, _clock) = machine();
        let err = engine.start("", None).unwrap_err();
        assert!(matches!(err, ValidationError::MissingSubject));
        assert_eq!(engine.phase(), TimerPhase::Idle);
    }

    #[test]
    fn start_rejects_zero_duration() {
        let (mut engine, _clock) = machine();
        let err = engine.start("Biology", Some(0)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDuration { secs: 0 }));
    }

    #[test]
    fn start_pause_resume_accumulates_elapsed() {
        // Scenario: start 1500s, run 100s, pause -> 1400; resume, 50s, pause -> 1350.
        let (mut engine, clock) = machine();
        engine.start("Biology", Some(1500)).unwrap().unwrap();
        assert_eq!(engine.phase(), TimerPhase::Running);

        clock.advance_secs(100);
        engine.pause().unwrap();
        assert_eq!(engine.checkpoint().unwrap().remaining_at_pause, 1400);

        engine.resume().unwrap();
        clock.advance_secs(50);
        engine.pause().unwrap();
        assert_eq!(engine.checkpoint().unwrap().remaining_at_pause, 1350);
        assert_eq!(engine.checkpoint().unwrap().breaks_count, 2);
    }

    #[test]
    fn pause_twice_is_a_no_op() {
        let (mut engine, clock) = machine();
        engine.start("Math", None).unwrap();
        clock.advance_secs(60);
        assert!(engine.pause().is_some());
        let snap = engine.checkpoint().unwrap().clone();
        assert!(engine.pause().is_none());
        assert_eq!(engine.checkpoint().unwrap(), &snap);
    }

    #[test]
    fn immediate_resume_keeps_remaining_and_restamps_started_at() {
        let (mut engine, clock) = machine();
        engine.start("Math", Some(600)).unwrap();
        clock.advance_secs(10);
        engine.pause().unwrap();
        let remaining = engine.checkpoint().unwrap().remaining_at_pause;

        engine.resume().unwrap();
        let cp = engine.checkpoint().unwrap();
        assert_eq!(cp.remaining_at_pause, remaining);
        assert_eq!(cp.started_at, Some(clock.now()));
    }

    #[test]
    fn tick_completes_exactly_once() {
        let (mut engine, clock) = machine();
        engine.start("Chemistry", Some(1500)).unwrap();
        clock.advance_secs(1501);

        let completion = engine.tick().expect("first tick completes");
        assert_eq!(completion.session_type, SessionType::Work);
        assert_eq!(completion.duration_min, 25);
        assert_eq!(engine.checkpoint().unwrap().pomodoro_count, 1);

        assert!(engine.tick().is_none());
        assert_eq!(engine.phase(), TimerPhase::Idle);
    }

    #[test]
    fn tick_before_deadline_leaves_checkpoint_untouched() {
        let (mut engine, clock) = machine();
        engine.start("Chemistry", Some(1500)).unwrap();
        let before = engine.checkpoint().unwrap().clone();
        clock.advance_secs(500);
        assert!(engine.tick().is_none());
        assert_eq!(engine.checkpoint().unwrap(), &before);
        assert_eq!(engine.remaining_secs(), 1000);
    }

    #[test]
    fn every_fourth_pomodoro_earns_long_break() {
        let (mut engine, clock) = machine();
        for i in 1..=4u32 {
            engine.start("Physics", Some(60)).unwrap();
            clock.advance_secs(61);
            engine.tick().expect("completes");
            let event = engine.advance_segment().unwrap();
            match event {
                Event::AlarmStopped { next_total_secs, .. } => {
                    if i % 4 == 0 {
                        assert_eq!(next_total_secs, 900);
                    } else {
                        assert_eq!(next_total_secs, 300);
                    }
                }
                other => panic!("expected AlarmStopped, got {other:?}"),
            }
            // Skip through the queued break to line up the next work segment.
            engine.start("", None).unwrap();
            clock.advance_secs(engine.checkpoint().unwrap().total_duration + 1);
            engine.tick();
            engine.advance_segment();
        }
    }

    #[test]
    fn break_advances_back_to_default_work() {
        let (mut engine, clock) = machine();
        engine.start("History", Some(60)).unwrap();
        clock.advance_secs(61);
        engine.tick().unwrap();
        engine.advance_segment().unwrap(); // -> break

        engine.start("", None).unwrap(); // breaks don't need a subject
        clock.advance_secs(engine.checkpoint().unwrap().total_duration + 1);
        let completion = engine.tick().unwrap();
        assert_eq!(completion.session_type, SessionType::Break);

        match engine.advance_segment().unwrap() {
            Event::AlarmStopped {
                next_session_type,
                next_total_secs,
                ..
            } => {
                assert_eq!(next_session_type, SessionType::Work);
                assert_eq!(next_total_secs, 1500);
            }
            other => panic!("expected AlarmStopped, got {other:?}"),
        }
    }

    #[test]
    fn reset_restores_full_duration() {
        let (mut engine, clock) = machine();
        engine.start("Biology", Some(1500)).unwrap();
        clock.advance_secs(700);
        engine.pause().unwrap();
        engine.reset();

        let cp = engine.checkpoint().unwrap();
        assert_eq!(engine.phase(), TimerPhase::Idle);
        assert_eq!(cp.remaining_at_pause, 1500);
        assert_eq!(cp.breaks_count, 0);
        assert_eq!(cp.session_start_time, None);
    }

    #[test]
    fn versions_increase_across_transitions() {
        let (mut engine, clock) = machine();
        engine.start("Biology", Some(1500)).unwrap();
        let v1 = engine.checkpoint().unwrap().version;
        clock.advance_secs(5);
        engine.pause().unwrap();
        let v2 = engine.checkpoint().unwrap().version;
        engine.resume().unwrap();
        let v3 = engine.checkpoint().unwrap().version;
        assert!(v1 < v2 && v2 < v3);
    }

    proptest! {
        #[test]
        fn remaining_is_monotonically_non_increasing(
            advances in proptest::collection::vec(0i64..400, 1..20)
        ) {
            let (mut engine, clock) = machine();
            engine.start("Biology", Some(1500)).unwrap();
            let mut last = engine.remaining_secs();
            for step in advances {
                clock.advance_secs(step);
                engine.tick();
                let now = engine.remaining_secs();
                prop_assert!(now <= last);
                last = now;
            }
        }

        #[test]
        fn pause_resume_preserves_remaining(elapsed in 1i64..1499) {
            let (mut engine, clock) = machine();
            engine.start("Biology", Some(1500)).unwrap();
            clock.advance_secs(elapsed);
            engine.pause().unwrap();
            let snapshot = engine.checkpoint().unwrap().remaining_at_pause;
            prop_assert_eq!(snapshot, 1500 - elapsed);
            engine.resume().unwrap();
            prop_assert_eq!(engine.checkpoint().unwrap().remaining_at_pause, snapshot);
        }
    }
}
