use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;
use studyflow_core::{study_stats, Clock, Config, Database, SessionLog, SystemClock};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's session and minute totals
    Today,
    /// All-time totals
    All,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let sessions: Arc<dyn SessionLog> = match super::api_client(&config) {
        Some(client) => client,
        None => Arc::new(Database::open()?),
    };
    let stats = study_stats(&sessions.list()?, SystemClock.now());

    let output = match action {
        StatsAction::Today => json!({
            "sessions": stats.today_sessions,
            "minutes": stats.today_minutes,
        }),
        StatsAction::All => serde_json::to_value(&stats)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
