//! Staged schedule suggestions.
//!
//! A regenerated schedule is not pushed to the calendar directly; it is
//! staged as a pending suggestion the user confirms or discards. The
//! slot holds at most one suggestion and the first writer wins, so two
//! concurrent regenerations cannot both think theirs is pending.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::scheduler::ScheduleResult;
use crate::sync::engine::ScheduleDiff;

/// A regenerated schedule waiting for user confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingScheduleSuggestion {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Hash of the schedule the diff was computed from; a mismatch
    /// against the live schedule means the suggestion is stale.
    pub input_hash: String,
    /// Identifier of the calendar the diff targets.
    pub target_calendar: String,
    /// Time range the diff covers.
    pub range_start: DateTime<Utc>,
    pub range_end: DateTime<Utc>,
    pub result: ScheduleResult,
    /// What applying the suggestion would do to the calendar.
    pub diff: ScheduleDiff,
}

impl PendingScheduleSuggestion {
    pub fn new(
        result: ScheduleResult,
        diff: ScheduleDiff,
        created_at: DateTime<Utc>,
        target_calendar: impl Into<String>,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Self {
        let input_hash = suggestion_input_hash(&result);
        Self {
            id: Uuid::new_v4(),
            created_at,
            input_hash,
            target_calendar: target_calendar.into(),
            range_start,
            range_end,
            result,
            diff,
        }
    }

    /// Whether `result` still matches the schedule the suggestion was
    /// staged from.
    pub fn is_current_for(&self, result: &ScheduleResult) -> bool {
        self.input_hash == suggestion_input_hash(result)
    }
}

/// Content hash of a schedule's placements. Identical placements hash
/// identically regardless of when the hash is taken.
pub fn suggestion_input_hash(result: &ScheduleResult) -> String {
    let mut hasher = Sha256::new();
    for block in &result.scheduled {
        hasher.update(block.session.id.as_bytes());
        hasher.update(block.start.timestamp().to_le_bytes());
        hasher.update(block.end.timestamp().to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Single-occupancy staging slot with first-writer-wins semantics.
#[derive(Default)]
pub struct SuggestionSlot {
    inner: Mutex<Option<PendingScheduleSuggestion>>,
}

impl SuggestionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a suggestion. Returns false (dropping `suggestion`) when
    /// one is already pending.
    pub fn stage(&self, suggestion: PendingScheduleSuggestion) -> bool {
        let mut slot = self.inner.lock().expect("suggestion slot poisoned");
        if slot.is_some() {
            return false;
        }
        *slot = Some(suggestion);
        true
    }

    /// Take the pending suggestion out, emptying the slot.
    pub fn take(&self) -> Option<PendingScheduleSuggestion> {
        self.inner.lock().expect("suggestion slot poisoned").take()
    }

    /// Copy of the pending suggestion, leaving it staged.
    pub fn peek(&self) -> Option<PendingScheduleSuggestion> {
        self.inner.lock().expect("suggestion slot poisoned").clone()
    }

    pub fn clear(&self) {
        self.inner.lock().expect("suggestion slot poisoned").take();
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().expect("suggestion slot poisoned").is_some()
    }
}
