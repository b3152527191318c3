pub mod assignment;
pub mod config;
pub mod plan;
pub mod reschedule;
pub mod schedule;
pub mod sync;

use chrono::FixedOffset;
use studyplan_core::PlannerConfig;
use uuid::Uuid;

pub(crate) type CliResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    Ok(Uuid::parse_str(raw)?)
}

/// Load and validate the active configuration.
pub(crate) fn load_config() -> Result<PlannerConfig, Box<dyn std::error::Error>> {
    let path = PlannerConfig::default_path()?;
    let config = PlannerConfig::load_or_default(&path)?;
    config.validate()?;
    Ok(config)
}

pub(crate) fn config_offset(config: &PlannerConfig) -> FixedOffset {
    FixedOffset::east_opt(config.sync.utc_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
}
