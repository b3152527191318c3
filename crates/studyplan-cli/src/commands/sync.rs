//! Calendar sync commands for CLI.
//!
//! There is no device calendar on the CLI path, so these commands show
//! what sync would do: the merged blocks and the diff against an empty
//! calendar.

use chrono::{Duration, Utc};
use clap::Subcommand;
use studyplan_core::{CalendarSyncEngine, InMemoryCalendarStore, PlannerDb};

use super::{config_offset, load_config, CliResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Print the merged calendar blocks for the stored schedule
    Blocks,
    /// Print the diff sync would apply to an empty calendar
    Preview,
}

pub fn run(action: SyncAction) -> CliResult {
    let db = PlannerDb::open_default()?;
    let config = load_config()?;
    if !config.sync.enabled {
        println!("calendar sync is disabled");
        return Ok(());
    }

    let schedule = db.list_schedule()?;
    let engine = CalendarSyncEngine::new(InMemoryCalendarStore::new(), config_offset(&config))
        .with_merge_gap(config.sync.merge_gap_minutes);

    match action {
        SyncAction::Blocks => {
            let blocks = engine.blocks_for(&schedule);
            println!("{}", serde_json::to_string_pretty(&blocks)?);
        }
        SyncAction::Preview => {
            let runtime = tokio::runtime::Runtime::new()?;
            let now = Utc::now();
            let diff = runtime.block_on(engine.preview(
                &schedule,
                now - Duration::days(1),
                now + Duration::days(config.scheduler.horizon_days as i64),
            ))?;
            println!("{}", serde_json::to_string_pretty(&diff)?);
            println!("changes: {}", diff.change_count());
        }
    }
    Ok(())
}
