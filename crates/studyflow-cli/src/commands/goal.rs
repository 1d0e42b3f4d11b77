use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;
use studyflow_core::{
    goal_progress, Clock, Config, Database, GoalForm, GoalPeriod, GoalStore, SessionLog,
    SystemClock,
};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a study goal
    Add {
        /// Goal title
        title: String,
        /// Target minutes per period
        #[arg(long)]
        target: u32,
        /// Goal period: daily or weekly
        #[arg(long, default_value = "daily")]
        period: String,
        /// Only count sessions with this subject
        #[arg(long)]
        subject: Option<String>,
        /// Display color
        #[arg(long, default_value = "#3b82f6")]
        color: String,
    },
    /// List goals as JSON
    List,
    /// Delete a goal by id
    Delete { id: String },
    /// Print percent-complete per goal for the current period window
    Progress,
}

fn parse_period(s: &str) -> Result<GoalPeriod, Box<dyn std::error::Error>> {
    match s {
        "daily" => Ok(GoalPeriod::Daily),
        "weekly" => Ok(GoalPeriod::Weekly),
        other => Err(format!("unknown period '{other}' (expected daily or weekly)").into()),
    }
}

pub fn run(action: GoalAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = Arc::new(Database::open()?);
    let remote = super::api_client(&config);
    let goals: Arc<dyn GoalStore> = match &remote {
        Some(client) => client.clone(),
        None => db.clone(),
    };

    match action {
        GoalAction::Add {
            title,
            target,
            period,
            subject,
            color,
        } => {
            let form = GoalForm {
                title,
                target_minutes: target,
                period: parse_period(&period)?,
                subject,
                color,
            };
            form.validate()?;
            let updated = goals.create_goal(&form)?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        GoalAction::List => {
            println!("{}", serde_json::to_string_pretty(&goals.list_goals()?)?);
        }
        GoalAction::Delete { id } => {
            let updated = goals.delete_goal(&id)?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        GoalAction::Progress => {
            let now = SystemClock.now();
            let sessions: Arc<dyn SessionLog> = match &remote {
                Some(client) => client.clone(),
                None => db.clone(),
            };
            let sessions = sessions.list()?;
            let report: Vec<_> = goals
                .list_goals()?
                .into_iter()
                .map(|goal| {
                    let progress = goal_progress(&goal, &sessions, now);
                    json!({ "goal": goal, "progress": progress })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
