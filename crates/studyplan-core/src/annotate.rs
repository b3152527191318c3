//! Optional advisory annotations on scheduled sessions.
//!
//! Annotations never change placement. They hang off a scheduled session
//! as metadata, carry provenance, and are gated behind an enabled flag
//! so a disabled or unavailable provider leaves the schedule untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::scheduler::ScheduledSession;

/// Where an annotation came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationProvenance {
    /// Produced by a local heuristic.
    Heuristic,
    /// Produced by an external model, identified by name.
    Model { name: String },
}

/// Advisory note attached to a scheduled session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnnotation {
    /// Hash of the inputs the annotation was computed from, so stale
    /// annotations can be detected when the session changes.
    pub input_hash: String,
    pub computed_at: DateTime<Utc>,
    pub text: String,
    /// Provider confidence in [0, 1].
    pub confidence: f64,
    pub provenance: AnnotationProvenance,
}

impl AiAnnotation {
    /// True when the annotation still matches the session it describes.
    pub fn is_current_for(&self, session: &ScheduledSession) -> bool {
        self.input_hash == annotation_input_hash(session)
    }
}

/// Hash of the fields an annotation depends on.
pub fn annotation_input_hash(session: &ScheduledSession) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session.session.id.as_bytes());
    hasher.update(session.start.timestamp().to_le_bytes());
    hasher.update(session.end.timestamp().to_le_bytes());
    hasher.update(session.session.title.as_bytes());
    hex::encode(hasher.finalize())
}

/// Source of annotation text. Implementations must not block placement;
/// a provider returning `None` means "no annotation available".
pub trait AnnotationProvider: Send + Sync {
    fn annotate(&self, session: &ScheduledSession) -> Option<(String, f64, AnnotationProvenance)>;
}

/// Result of asking for an annotation through the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationOutcome {
    /// Annotations are switched off; nothing was computed.
    Disabled,
    /// The provider had nothing to offer.
    Unavailable,
    Annotated(AiAnnotation),
}

/// Enabled-gated annotation entry point.
pub fn annotate_session(
    enabled: bool,
    provider: &dyn AnnotationProvider,
    session: &ScheduledSession,
    now: DateTime<Utc>,
) -> AnnotationOutcome {
    if !enabled {
        return AnnotationOutcome::Disabled;
    }
    match provider.annotate(session) {
        None => AnnotationOutcome::Unavailable,
        Some((text, confidence, provenance)) => AnnotationOutcome::Annotated(AiAnnotation {
            input_hash: annotation_input_hash(session),
            computed_at: now,
            text,
            confidence: confidence.clamp(0.0, 1.0),
            provenance,
        }),
    }
}
