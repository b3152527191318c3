//! Rescheduling commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use studyplan_core::{AutoRescheduler, PlannerDb, RescheduleOutcome};

use super::{config_offset, load_config, CliResult};

#[derive(Subcommand)]
pub enum RescheduleAction {
    /// Move missed blocks to new slots and store the result
    Trigger,
    /// Print the reschedule history
    History,
}

pub fn run(action: RescheduleAction) -> CliResult {
    let mut db = PlannerDb::open_default()?;
    let config = load_config()?;

    match action {
        RescheduleAction::Trigger => {
            let mut schedule = db.list_schedule()?;
            let rescheduler =
                AutoRescheduler::new(config.reschedule.clone(), config_offset(&config));

            match rescheduler.trigger(&mut schedule, &[], Utc::now()) {
                RescheduleOutcome::Disabled => println!("rescheduling is disabled"),
                RescheduleOutcome::AlreadyRunning => println!("a reschedule is already running"),
                RescheduleOutcome::Completed(report) => {
                    db.replace_schedule(&schedule)?;
                    db.append_reschedule_records(&report.records)?;
                    println!("{}", report.summary());
                }
            }
        }
        RescheduleAction::History => {
            let history = db.list_reschedule_history()?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
    }
    Ok(())
}
