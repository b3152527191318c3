//! Diff-and-apply projection of the schedule onto a calendar.
//!
//! Sync is two phases. First the desired blocks are diffed against the
//! planner-owned events already on the calendar; the diff is a plain
//! value that can be previewed without touching anything. Second the
//! diff is applied: creates, updates, then deletes. Deletes only ever
//! target events whose notes carry a well-formed planner tag, so a
//! user's own events can never be removed. Running sync twice in a row
//! yields an idempotent (empty) second diff.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarStore, EventDraft, EventSnapshot, EventSpan};
use crate::scheduler::ScheduledSession;
use crate::sync::block::{build_blocks, day_key, CalendarBlock, DEFAULT_MERGE_GAP_MINUTES};
use crate::sync::metadata::{embed_metadata, extract_metadata, BlockMetadata};
use crate::sync::SyncError;

/// An existing planner event whose times or contents must change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockUpdate {
    pub event_id: String,
    pub block: CalendarBlock,
    pub old_start: DateTime<Utc>,
    pub old_end: DateTime<Utc>,
}

/// A desired block overlapping an event the planner does not own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConflict {
    pub block_id: String,
    pub event_id: String,
    pub event_title: String,
}

/// Difference between the desired schedule and the calendar.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduleDiff {
    pub added: Vec<CalendarBlock>,
    pub moved: Vec<BlockUpdate>,
    pub resized: Vec<BlockUpdate>,
    /// Event ids of planner-owned events with no matching block.
    pub removed: Vec<String>,
    /// Overlaps with foreign events. Reported, never acted on.
    pub conflicts: Vec<SyncConflict>,
    /// Human-readable account of the changes, for display surfaces.
    pub reason: String,
    /// Score attached by an annotation provider; absent when
    /// annotation is disabled.
    pub confidence: Option<f64>,
}

impl ScheduleDiff {
    /// Number of calendar mutations applying this diff would perform.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.moved.len() + self.resized.len() + self.removed.len()
    }

    /// True when applying would not touch the calendar.
    pub fn is_idempotent(&self) -> bool {
        self.change_count() == 0
    }
}

/// Compute the diff between desired blocks and existing events.
pub fn diff_schedule(
    desired: &[CalendarBlock],
    existing: &[EventSnapshot],
    offset: FixedOffset,
) -> ScheduleDiff {
    let mut diff = ScheduleDiff::default();

    let mut planner_events: Vec<(&EventSnapshot, BlockMetadata)> = Vec::new();
    let mut foreign_events: Vec<&EventSnapshot> = Vec::new();
    for event in existing {
        match event.notes.as_deref().and_then(extract_metadata) {
            Some(metadata) => planner_events.push((event, metadata)),
            None => foreign_events.push(event),
        }
    }

    // Unchanged blocks drop out by content id.
    let mut unmatched_desired: Vec<&CalendarBlock> = Vec::new();
    for block in desired {
        if let Some(pos) = planner_events
            .iter()
            .position(|(_, m)| m.block_id == block.id)
        {
            planner_events.swap_remove(pos);
        } else {
            unmatched_desired.push(block);
        }
    }

    // Pair what is left per local day, in start order, so a moved block
    // updates the old event instead of churning delete-plus-create.
    unmatched_desired.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));
    planner_events.sort_by(|a, b| {
        a.0.start
            .cmp(&b.0.start)
            .then(a.0.event_id.cmp(&b.0.event_id))
    });

    for block in unmatched_desired {
        let pos = planner_events
            .iter()
            .position(|(event, metadata)| {
                metadata.day_key == block.day_key || day_key(event.start, offset) == block.day_key
            });
        match pos {
            Some(pos) => {
                let (event, _) = planner_events.remove(pos);
                let update = BlockUpdate {
                    event_id: event.event_id.clone(),
                    block: block.clone(),
                    old_start: event.start,
                    old_end: event.end,
                };
                if event.start != block.start {
                    diff.moved.push(update);
                } else {
                    diff.resized.push(update);
                }
            }
            None => diff.added.push(block.clone()),
        }
    }

    diff.removed = planner_events
        .into_iter()
        .map(|(event, _)| event.event_id.clone())
        .collect();

    for block in desired {
        for event in &foreign_events {
            if block.start < event.end && event.start < block.end {
                diff.conflicts.push(SyncConflict {
                    block_id: block.id.clone(),
                    event_id: event.event_id.clone(),
                    event_title: event.title.clone(),
                });
            }
        }
    }

    diff.reason = describe_diff(&diff);
    diff
}

fn describe_diff(diff: &ScheduleDiff) -> String {
    let mut parts = Vec::new();
    if !diff.added.is_empty() {
        parts.push(format!("{} added", diff.added.len()));
    }
    if !diff.moved.is_empty() {
        parts.push(format!("{} moved", diff.moved.len()));
    }
    if !diff.resized.is_empty() {
        parts.push(format!("{} resized", diff.resized.len()));
    }
    if !diff.removed.is_empty() {
        parts.push(format!("{} removed", diff.removed.len()));
    }
    let mut reason = if parts.is_empty() {
        "Calendar already matches the schedule".to_string()
    } else {
        parts.join(", ")
    };
    if !diff.conflicts.is_empty() {
        reason.push_str(&format!(
            "; {} overlap{} with existing events",
            diff.conflicts.len(),
            if diff.conflicts.len() == 1 { "" } else { "s" }
        ));
    }
    reason
}

/// Outcome of a sync trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Another sync is still running; nothing happened.
    AlreadyRunning,
    Completed(ScheduleDiff),
}

/// Pushes the schedule to a calendar store.
pub struct CalendarSyncEngine<S> {
    store: S,
    offset: FixedOffset,
    merge_gap_minutes: i64,
    in_flight: AtomicBool,
}

impl<S: CalendarStore> CalendarSyncEngine<S> {
    pub fn new(store: S, offset: FixedOffset) -> Self {
        Self {
            store,
            offset,
            merge_gap_minutes: DEFAULT_MERGE_GAP_MINUTES,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_merge_gap(mut self, minutes: i64) -> Self {
        self.merge_gap_minutes = minutes;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Desired calendar blocks for a schedule, without touching the store.
    pub fn blocks_for(&self, scheduled: &[ScheduledSession]) -> Vec<CalendarBlock> {
        build_blocks(scheduled, self.offset, self.merge_gap_minutes)
    }

    /// Diff only; never mutates the calendar.
    pub async fn preview(
        &self,
        scheduled: &[ScheduledSession],
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<ScheduleDiff, SyncError> {
        let desired = self.blocks_for(scheduled);
        let existing = self.store.events_between(from, until).await?;
        Ok(diff_schedule(&desired, &existing, self.offset))
    }

    /// Diff and apply. Overlapping triggers return `AlreadyRunning`.
    pub async fn sync(
        &self,
        scheduled: &[ScheduledSession],
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<SyncOutcome, SyncError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(SyncOutcome::AlreadyRunning);
        }
        let result = self.sync_inner(scheduled, from, until).await;
        self.in_flight.store(false, Ordering::Release);
        result.map(SyncOutcome::Completed)
    }

    async fn sync_inner(
        &self,
        scheduled: &[ScheduledSession],
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<ScheduleDiff, SyncError> {
        let existing = self.store.events_between(from, until).await?;
        let desired = self.blocks_for(scheduled);
        let diff = diff_schedule(&desired, &existing, self.offset);

        for block in &diff.added {
            self.store.create_event(draft_for(block)).await?;
        }
        for update in diff.moved.iter().chain(diff.resized.iter()) {
            self.store
                .update_event(&update.event_id, draft_for(&update.block))
                .await?;
        }
        for event_id in &diff.removed {
            // Re-verify ownership against the snapshot before deleting.
            let owned = existing.iter().any(|e| {
                e.event_id == *event_id
                    && e.notes.as_deref().and_then(extract_metadata).is_some()
            });
            if !owned {
                continue;
            }
            match self.store.delete_event(event_id, EventSpan::ThisEvent).await {
                Ok(()) => {}
                Err(SyncError::EventNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(diff)
    }
}

fn draft_for(block: &CalendarBlock) -> EventDraft {
    let metadata = BlockMetadata::new(block.id.clone(), block.day_key.clone());
    EventDraft {
        title: block.title.clone(),
        start: block.start,
        end: block.end,
        notes: Some(embed_metadata(&block.notes_body(), &metadata)),
    }
}
