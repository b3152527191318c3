//! Calendar event access.
//!
//! The sync engine talks to calendars through [`CalendarStore`], an
//! async trait kept narrow enough that device calendars, remote APIs,
//! and the in-memory test double all fit behind it.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::SyncError;

/// Snapshot of one calendar event as the store sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Store-assigned identifier, opaque to the planner.
    pub event_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub notes: Option<String>,
}

/// How far an edit or delete reaches for recurring events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSpan {
    ThisEvent,
    FutureEvents,
    AllEvents,
}

/// Event the planner wants created or updated.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Backend-neutral calendar operations.
#[allow(async_fn_in_trait)]
pub trait CalendarStore {
    /// Every event overlapping `[from, until)`.
    async fn events_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<EventSnapshot>, SyncError>;

    /// Create an event, returning its store-assigned id.
    async fn create_event(&self, draft: EventDraft) -> Result<String, SyncError>;

    async fn update_event(&self, event_id: &str, draft: EventDraft) -> Result<(), SyncError>;

    /// Delete an event. Deleting an id the store no longer has is not
    /// an error.
    async fn delete_event(&self, event_id: &str, span: EventSpan) -> Result<(), SyncError>;
}

/// Test and offline store backed by a mutexed map.
#[derive(Default)]
pub struct InMemoryCalendarStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    events: HashMap<String, EventSnapshot>,
    next_id: u64,
}

impl InMemoryCalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an externally-created event, as if another app put it there.
    pub fn seed(&self, snapshot: EventSnapshot) {
        let mut inner = self.inner.lock().expect("calendar store poisoned");
        inner.events.insert(snapshot.event_id.clone(), snapshot);
    }

    pub fn event_count(&self) -> usize {
        self.inner.lock().expect("calendar store poisoned").events.len()
    }

    pub fn snapshot_all(&self) -> Vec<EventSnapshot> {
        let inner = self.inner.lock().expect("calendar store poisoned");
        let mut events: Vec<_> = inner.events.values().cloned().collect();
        events.sort_by(|a, b| a.start.cmp(&b.start).then(a.event_id.cmp(&b.event_id)));
        events
    }
}

impl CalendarStore for InMemoryCalendarStore {
    async fn events_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<EventSnapshot>, SyncError> {
        let inner = self.inner.lock().expect("calendar store poisoned");
        let mut events: Vec<_> = inner
            .events
            .values()
            .filter(|e| e.start < until && from < e.end)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start.cmp(&b.start).then(a.event_id.cmp(&b.event_id)));
        Ok(events)
    }

    async fn create_event(&self, draft: EventDraft) -> Result<String, SyncError> {
        let mut inner = self.inner.lock().expect("calendar store poisoned");
        inner.next_id += 1;
        let event_id = format!("evt-{}", inner.next_id);
        inner.events.insert(
            event_id.clone(),
            EventSnapshot {
                event_id: event_id.clone(),
                title: draft.title,
                start: draft.start,
                end: draft.end,
                notes: draft.notes,
            },
        );
        Ok(event_id)
    }

    async fn update_event(&self, event_id: &str, draft: EventDraft) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().expect("calendar store poisoned");
        let event = inner
            .events
            .get_mut(event_id)
            .ok_or_else(|| SyncError::EventNotFound {
                event_id: event_id.to_string(),
            })?;
        event.title = draft.title;
        event.start = draft.start;
        event.end = draft.end;
        event.notes = draft.notes;
        Ok(())
    }

    async fn delete_event(&self, event_id: &str, _span: EventSpan) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().expect("calendar store poisoned");
        inner.events.remove(event_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn create_update_delete_round_trip() {
        let store = InMemoryCalendarStore::new();
        let id = store
            .create_event(EventDraft {
                title: "Study".into(),
                start: at(9),
                end: at(10),
                notes: None,
            })
            .await
            .unwrap();

        store
            .update_event(
                &id,
                EventDraft {
                    title: "Study (moved)".into(),
                    start: at(11),
                    end: at(12),
                    notes: Some("moved".into()),
                },
            )
            .await
            .unwrap();

        let events = store.events_between(at(0), at(23)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Study (moved)");

        store.delete_event(&id, EventSpan::ThisEvent).await.unwrap();
        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn deleting_missing_event_is_ok() {
        let store = InMemoryCalendarStore::new();
        assert!(store.delete_event("gone", EventSpan::ThisEvent).await.is_ok());
    }

    #[tokio::test]
    async fn window_query_uses_overlap_not_containment() {
        let store = InMemoryCalendarStore::new();
        store
            .create_event(EventDraft {
                title: "long".into(),
                start: at(8),
                end: at(12),
                notes: None,
            })
            .await
            .unwrap();

        let overlapping = store.events_between(at(11), at(14)).await.unwrap();
        assert_eq!(overlapping.len(), 1);
        let disjoint = store.events_between(at(12), at(14)).await.unwrap();
        assert!(disjoint.is_empty());
    }
}
