use std::sync::Arc;

use clap::Subcommand;
use studyflow_core::{Config, Database, SessionLog};

#[derive(Subcommand)]
pub enum SessionAction {
    /// List completed study sessions as JSON
    List,
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let sessions: Arc<dyn SessionLog> = match super::api_client(&config) {
        Some(client) => client,
        None => Arc::new(Database::open()?),
    };
    match action {
        SessionAction::List => {
            println!("{}", serde_json::to_string_pretty(&sessions.list()?)?);
        }
    }
    Ok(())
}
