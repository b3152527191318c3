//! Configuration commands for CLI.

use clap::Subcommand;
use studyplan_core::PlannerConfig;

use super::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the active configuration as TOML
    Show,
    /// Print the config file path
    Path,
    /// Reset the configuration to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    let path = PlannerConfig::default_path()?;

    match action {
        ConfigAction::Show => {
            let config = PlannerConfig::load_or_default(&path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Reset => {
            PlannerConfig::default().save(&path)?;
            println!("ok");
        }
    }
    Ok(())
}
