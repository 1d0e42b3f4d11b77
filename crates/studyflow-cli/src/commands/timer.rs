use std::sync::Arc;

use clap::Subcommand;
use studyflow_core::{
    AlarmManager, CheckpointStore, Config, Database, LogNotifier, RecoveryAction, SessionLog,
    SystemClock, TimerController,
};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the current segment (work segments need a subject)
    Start {
        /// Subject of the work segment
        subject: Option<String>,
        /// Segment length in minutes (defaults to the configured length)
        #[arg(long)]
        minutes: Option<i64>,
    },
    /// Pause the running countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Cancel the session and clear the stored checkpoint
    Reset,
    /// Stop the alarm and queue the next segment
    StopAlarm,
    /// Print the current timer state as JSON
    Status,
}

/// Wire a controller over the configured stores. The checkpoint and session
/// log go remote when an API base URL is set; the alarm flag always stays on
/// this device so a firing alarm survives offline restarts.
fn build_controller(db: &Arc<Database>, config: &Config) -> TimerController {
    let (checkpoints, sessions): (Arc<dyn CheckpointStore>, Arc<dyn SessionLog>) =
        match super::api_client(config) {
            Some(remote) => (remote.clone(), remote),
            None => (db.clone(), db.clone()),
        };
    TimerController::new(
        config.policy(),
        config.sync.debounce_secs,
        checkpoints,
        sessions,
        AlarmManager::new(db.clone(), Arc::new(LogNotifier)),
        Arc::new(SystemClock),
    )
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = Arc::new(Database::open()?);
    let mut timer = build_controller(&db, &config);

    // Every invocation reconciles first, so a completion that elapsed since
    // the last command is finalized before the new action runs.
    let report = timer.recover();
    if let RecoveryAction::Finalized { event } = &report.action {
        println!("{}", serde_json::to_string_pretty(event)?);
    }

    match action {
        TimerAction::Start { subject, minutes } => {
            let event = timer.start(subject.as_deref().unwrap_or(""), minutes.map(|m| m * 60))?;
            match event {
                Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
                None => println!("{}", serde_json::to_string_pretty(&timer.snapshot())?),
            }
        }
        TimerAction::Pause => match timer.pause() {
            Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
            None => println!("{}", serde_json::to_string_pretty(&timer.snapshot())?),
        },
        TimerAction::Resume => match timer.resume() {
            Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
            None => println!("{}", serde_json::to_string_pretty(&timer.snapshot())?),
        },
        TimerAction::Reset => {
            let event = timer.reset();
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::StopAlarm => match timer.stop_alarm()? {
            Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
            None => println!("{}", serde_json::to_string_pretty(&timer.snapshot())?),
        },
        TimerAction::Status => {
            if let Some(event) = timer.tick() {
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
            println!("{}", serde_json::to_string_pretty(&timer.snapshot())?);
        }
    }

    timer.flush_now();
    Ok(())
}
