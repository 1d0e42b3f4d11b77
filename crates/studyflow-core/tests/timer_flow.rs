//! End-to-end timer flows: checkpoint persistence, recovery after
//! backgrounding, exactly-once completion across tabs, alarm lifecycle and
//! goal progress over the logged sessions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use studyflow_core::{
    goal_progress, AlarmManager, CheckpointStore, Clock, CoreError, Event, Goal, GoalPeriod,
    ManualClock,
    MemoryStore, Notifier, RecoveryAction, SegmentPolicy, SessionLog, SessionType, TimerController,
    TimerPhase, ValidationError,
};

#[derive(Default)]
struct CountingNotifier {
    shown: AtomicUsize,
}

impl Notifier for CountingNotifier {
    fn show_timer_notification(&self, _title: &str, _body: &str) -> Result<(), CoreError> {
        self.shown.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    notifier: Arc<CountingNotifier>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            // Anchored mid-day so period windows cannot straddle midnight.
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap(),
            )),
            notifier: Arc::new(CountingNotifier::default()),
        }
    }

    /// A controller over the shared store and clock -- one "tab".
    fn controller(&self) -> TimerController {
        TimerController::new(
            SegmentPolicy::default(),
            5,
            self.store.clone(),
            self.store.clone(),
            AlarmManager::new(self.store.clone(), self.notifier.clone()),
            self.clock.clone(),
        )
    }

    fn notifications(&self) -> usize {
        self.notifier.shown.load(Ordering::SeqCst)
    }
}

#[test]
fn work_start_requires_subject() {
    let fx = Fixture::new();
    let mut timer = fx.controller();
    match timer.start("", None) {
        Err(CoreError::Validation(ValidationError::MissingSubject)) => {}
        other => panic!("expected MissingSubject, got {other:?}"),
    }
}

#[test]
fn backgrounded_tab_finalizes_on_recovery() {
    // Scenario: start "Biology" for 1500s, no tick ever fires, the deadline
    // passes, then a reloaded tab reconciles.
    let fx = Fixture::new();
    let mut tab = fx.controller();
    tab.start("Biology", Some(1500)).unwrap();

    fx.clock.advance_secs(1500);

    let mut reloaded = fx.controller();
    let report = reloaded.recover();
    assert!(matches!(report.action, RecoveryAction::Finalized { .. }));
    assert!(report.alarm_firing);

    let sessions = fx.store.list().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].title, "Biology");
    assert_eq!(sessions[0].duration, 25);
    assert_eq!(sessions[0].kind, "study");
    assert!(sessions[0].start_time.is_some());
}

#[test]
fn local_tick_and_recovery_complete_exactly_once() {
    let fx = Fixture::new();
    let mut timer = fx.controller();
    timer.start("Chemistry", Some(600)).unwrap();
    fx.clock.advance_secs(601);

    let event = timer.tick().expect("segment completes");
    assert!(matches!(event, Event::SegmentCompleted { .. }));

    // A recovery pass right after must not double the effects.
    let report = timer.recover();
    assert!(matches!(report.action, RecoveryAction::RemainedIdle));
    assert!(report.alarm_firing);

    assert_eq!(fx.store.session_count(), 1);
    assert_eq!(fx.notifications(), 1);
}

#[test]
fn two_tabs_racing_log_one_session() {
    let fx = Fixture::new();
    let mut tab_a = fx.controller();
    tab_a.start("Physics", Some(300)).unwrap();

    let mut tab_b = fx.controller();
    let report = tab_b.recover();
    assert!(matches!(
        report.action,
        RecoveryAction::Resumed { remaining_secs: 300 }
    ));

    fx.clock.advance_secs(301);

    // Both tabs observe remaining <= 0; only the consume winner logs.
    tab_a.tick().expect("tab A completes locally");
    tab_b.tick().expect("tab B completes locally");

    assert_eq!(fx.store.session_count(), 1);
    assert_eq!(fx.notifications(), 1);
}

#[test]
fn recovery_adopts_live_remaining_and_keeps_running() {
    let fx = Fixture::new();
    let mut tab = fx.controller();
    tab.start("Biology", Some(1500)).unwrap();

    fx.clock.advance_secs(600);

    let mut reloaded = fx.controller();
    let report = reloaded.recover();
    assert!(matches!(
        report.action,
        RecoveryAction::Resumed { remaining_secs: 900 }
    ));
    assert!(!report.alarm_firing);
    assert_eq!(reloaded.engine().phase(), TimerPhase::Running);

    // The adopted countdown keeps flowing from the wall clock.
    fx.clock.advance_secs(900);
    reloaded.tick().expect("completes after the adopted remainder");
    assert_eq!(fx.store.session_count(), 1);
}

#[test]
fn pause_state_rides_the_debounce_window() {
    let fx = Fixture::new();
    let mut timer = fx.controller();
    timer.start("Biology", Some(1500)).unwrap();

    fx.clock.advance_secs(100);
    timer.pause().expect("pause from running");

    // Still the start-time snapshot remotely; the pause is pending.
    let stored = fx.store.load().unwrap().unwrap();
    assert!(!stored.is_paused);

    fx.clock.advance_secs(5);
    timer.tick(); // pumps the due flush

    let stored = fx.store.load().unwrap().unwrap();
    assert!(stored.is_paused);
    assert_eq!(stored.remaining_at_pause, 1400);
}

#[test]
fn flush_now_drains_pending_writes_immediately() {
    let fx = Fixture::new();
    let mut timer = fx.controller();
    timer.start("Biology", Some(1500)).unwrap();
    fx.clock.advance_secs(30);
    timer.pause().unwrap();

    timer.flush_now();

    let stored = fx.store.load().unwrap().unwrap();
    assert!(stored.is_paused);
    assert_eq!(stored.remaining_at_pause, 1470);
}

#[test]
fn reset_leaves_no_live_checkpoint() {
    let fx = Fixture::new();
    let mut timer = fx.controller();
    timer.start("Biology", Some(1500)).unwrap();
    fx.clock.advance_secs(200);
    timer.pause().unwrap();

    timer.reset();

    assert_eq!(timer.engine().phase(), TimerPhase::Idle);
    assert_eq!(timer.engine().remaining_secs(), 1500);
    assert!(fx.store.load().unwrap().is_none());

    // The pending pause snapshot must not resurrect the record.
    fx.clock.advance_secs(10);
    timer.tick();
    assert!(fx.store.load().unwrap().is_none());
}

#[test]
fn stop_alarm_queues_break_and_clears_flag() {
    let fx = Fixture::new();
    let mut timer = fx.controller();
    timer.start("Biology", Some(60)).unwrap();
    fx.clock.advance_secs(61);
    timer.tick().expect("completes");
    assert!(timer.alarm().is_alarm_active());

    let event = timer.stop_alarm().unwrap().expect("advances");
    match event {
        Event::AlarmStopped {
            next_session_type,
            next_total_secs,
            ..
        } => {
            assert_eq!(next_session_type, SessionType::Break);
            // First pomodoro: short break.
            assert_eq!(next_total_secs, 300);
        }
        other => panic!("expected AlarmStopped, got {other:?}"),
    }
    assert!(!timer.alarm().is_alarm_active());

    // The queued break segment is durable for other tabs.
    let stored = fx.store.load().unwrap().unwrap();
    assert_eq!(stored.session_type, SessionType::Break);
    assert_eq!(stored.remaining_at_pause, 300);

    // Breaks start without a subject.
    let event = timer.start("", None).unwrap().expect("break starts");
    assert!(matches!(
        event,
        Event::TimerStarted {
            session_type: SessionType::Break,
            ..
        }
    ));
}

#[test]
fn break_completion_logs_no_session() {
    let fx = Fixture::new();
    let mut timer = fx.controller();
    timer.start("Biology", Some(60)).unwrap();
    fx.clock.advance_secs(61);
    timer.tick().unwrap();
    timer.stop_alarm().unwrap();
    assert_eq!(fx.store.session_count(), 1);

    timer.start("", None).unwrap();
    fx.clock.advance_secs(301);
    let event = timer.tick().expect("break completes");
    assert!(matches!(
        event,
        Event::SegmentCompleted {
            session_type: SessionType::Break,
            ..
        }
    ));

    // Alarm fires for the break too, but nothing is logged.
    assert!(timer.alarm().is_alarm_active());
    assert_eq!(fx.store.session_count(), 1);
}

#[test]
fn goal_progress_over_logged_sessions() {
    // Scenario: goal 120 min daily Math; 40 + 50 Math and 60 Physics today.
    let fx = Fixture::new();
    let mut timer = fx.controller();

    for (subject, minutes) in [("Math", 40), ("Math", 50), ("Physics", 60)] {
        timer.start(subject, Some(minutes * 60)).unwrap();
        fx.clock.advance_secs(minutes * 60 + 1);
        timer.tick().expect("completes");
        timer.stop_alarm().unwrap();
        // Roll the queued break straight back into work.
        timer.start("", None).unwrap();
        fx.clock
            .advance_secs(timer.engine().checkpoint().unwrap().total_duration + 1);
        timer.tick().expect("break completes");
        timer.stop_alarm().unwrap();
    }

    let goal = Goal {
        id: "g1".into(),
        title: "Daily math".into(),
        target_minutes: 120,
        period: GoalPeriod::Daily,
        subject: Some("Math".into()),
        color: "#3b82f6".into(),
        created_at: None,
    };
    let sessions = fx.store.list().unwrap();
    let progress = goal_progress(&goal, &sessions, fx.clock.now());
    assert_eq!(progress.completed_minutes, 90);
    assert_eq!(progress.percentage, 75);
    assert!(!progress.is_completed);
}

#[test]
fn snapshot_reflects_alarm_and_counts() {
    let fx = Fixture::new();
    let mut timer = fx.controller();
    timer.start("Biology", Some(60)).unwrap();
    fx.clock.advance_secs(61);
    timer.tick().unwrap();

    match timer.snapshot() {
        Event::StateSnapshot {
            phase,
            pomodoro_count,
            alarm_firing,
            remaining_secs,
            ..
        } => {
            assert_eq!(phase, TimerPhase::Idle);
            assert_eq!(pomodoro_count, 1);
            assert!(alarm_firing);
            assert_eq!(remaining_secs, 0);
        }
        other => panic!("expected StateSnapshot, got {other:?}"),
    }
}
