//! Merging scheduled sessions into calendar blocks.
//!
//! Sessions close together on the same local day collapse into one
//! calendar event, so the calendar shows a handful of study blocks
//! instead of a wall of 15-minute slivers.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::assignment::AssignmentCategory;
use crate::scheduler::ScheduledSession;

/// Adjacent sessions with a gap at or under this merge into one block.
pub const DEFAULT_MERGE_GAP_MINUTES: i64 = 10;

/// Times feeding the block id are rounded to this many minutes so tiny
/// drift does not change identity.
const ID_ROUND_MINUTES: i64 = 5;

/// One calendar event's worth of study time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarBlock {
    /// Content hash; see [`compute_block_id`].
    pub id: String,
    /// Local day the block belongs to, `YYYY-MM-DD`.
    pub day_key: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    /// Scheduled-session ids inside the block, in start order.
    pub session_ids: Vec<Uuid>,
    /// Lines describing the member sessions, shown in event notes.
    pub note_lines: Vec<String>,
}

impl CalendarBlock {
    pub fn notes_body(&self) -> String {
        self.note_lines.join("\n")
    }
}

/// Merge scheduled sessions into calendar blocks.
///
/// Sessions are grouped per local day (in `offset`), sorted by start,
/// and merged while the gap to the previous session stays at or under
/// `merge_gap_minutes`. Blocks never span a local midnight.
pub fn build_blocks(
    scheduled: &[ScheduledSession],
    offset: FixedOffset,
    merge_gap_minutes: i64,
) -> Vec<CalendarBlock> {
    let mut ordered: Vec<&ScheduledSession> = scheduled.iter().collect();
    ordered.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));

    let mut blocks: Vec<CalendarBlock> = Vec::new();
    let mut current: Vec<&ScheduledSession> = Vec::new();

    for session in ordered {
        let day = day_key(session.start, offset);
        let merge = match current.last() {
            None => false,
            Some(prev) => {
                day_key(prev.start, offset) == day
                    && (session.start - prev.end).num_minutes() <= merge_gap_minutes
            }
        };
        if !merge && !current.is_empty() {
            blocks.push(finish_block(&current, offset));
            current.clear();
        }
        current.push(session);
    }
    if !current.is_empty() {
        blocks.push(finish_block(&current, offset));
    }
    blocks
}

fn finish_block(members: &[&ScheduledSession], offset: FixedOffset) -> CalendarBlock {
    let start = members.first().map(|s| s.start).expect("non-empty block");
    let end = members.iter().map(|s| s.end).max().expect("non-empty block");
    let day = day_key(start, offset);
    let session_ids: Vec<Uuid> = members.iter().map(|s| s.id).collect();

    let exam_like = members.iter().any(|s| {
        matches!(
            s.session.category,
            AssignmentCategory::Exam | AssignmentCategory::Quiz
        )
    });
    let title = if exam_like {
        "Exam Session".to_string()
    } else {
        "Coursework Session".to_string()
    };

    let note_lines = members
        .iter()
        .map(|s| format!("- {} ({} min)", s.session.title, s.duration_minutes()))
        .collect();

    CalendarBlock {
        id: compute_block_id(start, end, &session_ids),
        day_key: day,
        start,
        end,
        title,
        session_ids,
        note_lines,
    }
}

/// Local `YYYY-MM-DD` key for an instant, in the given offset.
pub fn day_key(t: DateTime<Utc>, offset: FixedOffset) -> String {
    t.with_timezone(&offset).format("%Y-%m-%d").to_string()
}

/// Content identity of a block: sha256 over its rounded start and end
/// plus the ordered member session ids.
pub fn compute_block_id(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    session_ids: &[Uuid],
) -> String {
    let round = ID_ROUND_MINUTES * 60;
    let mut hasher = Sha256::new();
    hasher.update((start.timestamp().div_euclid(round) * round).to_le_bytes());
    hasher.update((end.timestamp().div_euclid(round) * round).to_le_bytes());
    for id in session_ids {
        hasher.update(id.as_bytes());
    }
    hex::encode(hasher.finalize())
}
