//! Calendar synchronization layer.
//!
//! Projects the internal schedule onto an external calendar as merged
//! study blocks, tagged with embedded metadata so planner-owned events
//! can be recognized, updated, and safely deleted later.

pub mod block;
pub mod engine;
pub mod metadata;
pub mod suggestion;

#[cfg(test)]
mod block_tests;
#[cfg(test)]
mod engine_tests;

pub use block::{build_blocks, CalendarBlock};
pub use engine::{CalendarSyncEngine, ScheduleDiff, SyncOutcome};
pub use metadata::{embed_metadata, extract_metadata, BlockMetadata, PLANNER_SOURCE};
pub use suggestion::{suggestion_input_hash, PendingScheduleSuggestion, SuggestionSlot};

use thiserror::Error;

/// Failures crossing the calendar boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    #[error("calendar event not found: {event_id}")]
    EventNotFound { event_id: String },

    #[error("calendar store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("calendar backend error: {0}")]
    Backend(String),
}
