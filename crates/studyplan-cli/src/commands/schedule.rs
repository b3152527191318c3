//! Schedule generation commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use studyplan_core::{generate_plan, generate_sessions, PlannerDb, Scheduler};

use super::{config_offset, load_config, CliResult};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Regenerate the schedule from open assignments and store it
    Generate,
    /// Print the stored schedule
    Show,
}

pub fn run(action: ScheduleAction) -> CliResult {
    let mut db = PlannerDb::open_default()?;
    let config = load_config()?;

    match action {
        ScheduleAction::Generate => {
            let sessions: Vec<_> = db
                .list_assignments()?
                .iter()
                .filter(|a| !a.is_completed)
                .flat_map(|a| {
                    let plan = generate_plan(a, &config.plan);
                    generate_sessions(a, Some(&plan))
                })
                .collect();

            let scheduler = Scheduler::new(
                config.scheduler.clone(),
                Default::default(),
                config_offset(&config),
            );
            let result = scheduler.schedule(&sessions, &[], Utc::now());

            db.replace_schedule(&result.scheduled)?;
            println!(
                "Scheduled {} blocks, {} overflowed",
                result.scheduled.len(),
                result.overflow.len()
            );
            for overflowed in &result.overflow {
                eprintln!(
                    "overflow: {} ({:?})",
                    overflowed.session.title, overflowed.reason
                );
            }
        }
        ScheduleAction::Show => {
            let schedule = db.list_schedule()?;
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
    }
    Ok(())
}
