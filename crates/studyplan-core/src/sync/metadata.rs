//! Planner metadata embedded in calendar event notes.
//!
//! The tag lives between fixed markers so human-written notes above it
//! survive round trips. An event without a well-formed tag is never
//! treated as planner-owned, which is what makes deletion safe.

use serde::{Deserialize, Serialize};

pub const METADATA_OPEN: &str = "[StudyPlan]";
pub const METADATA_CLOSE: &str = "[/StudyPlan]";

/// Value of [`BlockMetadata::source`] for events this planner wrote.
pub const PLANNER_SOURCE: &str = "studyplan";

/// Identity tag carried by every planner-owned calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub block_id: String,
    pub source: String,
    /// Local calendar day the block belongs to, `YYYY-MM-DD`.
    pub day_key: String,
}

impl BlockMetadata {
    pub fn new(block_id: impl Into<String>, day_key: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            source: PLANNER_SOURCE.to_string(),
            day_key: day_key.into(),
        }
    }

    /// True only for tags this planner wrote itself.
    pub fn is_planner_owned(&self) -> bool {
        self.source == PLANNER_SOURCE
    }
}

/// Append the metadata tag to a notes body.
pub fn embed_metadata(body: &str, metadata: &BlockMetadata) -> String {
    let json = serde_json::to_string(metadata).expect("metadata serializes");
    if body.is_empty() {
        format!("{METADATA_OPEN}{json}{METADATA_CLOSE}")
    } else {
        format!("{body}\n\n{METADATA_OPEN}{json}{METADATA_CLOSE}")
    }
}

/// Parse the tag out of event notes. Returns `None` for absent markers,
/// malformed JSON, or a tag from another source.
pub fn extract_metadata(notes: &str) -> Option<BlockMetadata> {
    let open = notes.find(METADATA_OPEN)?;
    let rest = &notes[open + METADATA_OPEN.len()..];
    let close = rest.find(METADATA_CLOSE)?;
    let metadata: BlockMetadata = serde_json::from_str(&rest[..close]).ok()?;
    metadata.is_planner_owned().then_some(metadata)
}

/// The notes body with any metadata tag stripped.
pub fn strip_metadata(notes: &str) -> String {
    let Some(open) = notes.find(METADATA_OPEN) else {
        return notes.to_string();
    };
    let Some(close_rel) = notes[open..].find(METADATA_CLOSE) else {
        return notes.to_string();
    };
    let after = &notes[open + close_rel + METADATA_CLOSE.len()..];
    let mut body = String::with_capacity(notes.len());
    body.push_str(&notes[..open]);
    body.push_str(after);
    body.trim_end().to_string()
}
