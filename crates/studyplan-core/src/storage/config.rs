//! TOML-based planner configuration.
//!
//! Stores user preferences covering:
//! - Plan generation policy (step sizes, split thresholds)
//! - Scheduling window, daily caps, and horizon
//! - Automatic rescheduling behavior
//! - Calendar sync and annotation toggles
//!
//! Configuration is stored at `~/.config/studyplan/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::plan::PlanSettings;
use crate::reschedule::RescheduleSettings;
use crate::scheduler::SchedulerSettings;

/// Calendar sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Gap at or under this many minutes merges adjacent sessions into
    /// one calendar event.
    #[serde(default = "default_merge_gap")]
    pub merge_gap_minutes: i64,
    /// Local UTC offset in minutes, used for day boundaries.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Annotation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotateConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Planner configuration.
///
/// Serialized to/from TOML at `~/.config/studyplan/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub plan: PlanSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub reschedule: RescheduleSettings,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub annotate: AnnotateConfig,
}

fn default_true() -> bool {
    true
}

fn default_merge_gap() -> i64 {
    10
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            merge_gap_minutes: default_merge_gap(),
            utc_offset_minutes: 0,
        }
    }
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl PlannerConfig {
    /// The default config file path.
    pub fn default_path() -> std::io::Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from `path`, falling back to defaults when the file does
    /// not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate cross-field constraints before use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.day_start_hour >= self.scheduler.day_end_hour {
            return Err(ConfigError::InvalidValue {
                key: "scheduler.day_start_hour".to_string(),
                message: "day must start before it ends".to_string(),
            });
        }
        if self.scheduler.day_end_hour > 24 {
            return Err(ConfigError::InvalidValue {
                key: "scheduler.day_end_hour".to_string(),
                message: "hour out of range".to_string(),
            });
        }
        if self.plan.min_step_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "plan.min_step_minutes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.sync.merge_gap_minutes < 0 {
            return Err(ConfigError::InvalidValue {
                key: "sync.merge_gap_minutes".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}
