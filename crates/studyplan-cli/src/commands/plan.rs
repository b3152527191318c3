//! Plan generation commands for CLI.

use clap::Subcommand;
use studyplan_core::{generate_plan, generate_sessions, PlannerDb};

use super::{load_config, parse_id, CliResult};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Generate and print the plan for one assignment
    Show {
        /// Assignment ID
        id: String,
    },
    /// Print the schedulable sessions for one assignment
    Sessions {
        /// Assignment ID
        id: String,
    },
}

pub fn run(action: PlanAction) -> CliResult {
    let db = PlannerDb::open_default()?;
    let config = load_config()?;

    match action {
        PlanAction::Show { id } => {
            let assignment = db.get_assignment(parse_id(&id)?)?;
            let plan = generate_plan(&assignment, &config.plan);
            let issues = plan.validate();
            println!("{}", serde_json::to_string_pretty(&plan)?);
            if !issues.is_empty() {
                eprintln!("plan issues: {}", serde_json::to_string(&issues)?);
            }
        }
        PlanAction::Sessions { id } => {
            let assignment = db.get_assignment(parse_id(&id)?)?;
            let plan = generate_plan(&assignment, &config.plan);
            let sessions = generate_sessions(&assignment, Some(&plan));
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}
