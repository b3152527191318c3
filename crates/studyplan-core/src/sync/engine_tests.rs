//! Tests for engine module.

#[cfg(test)]
mod tests {
    use super::super::block::{build_blocks, DEFAULT_MERGE_GAP_MINUTES};
    use super::super::engine::*;
    use super::super::metadata::extract_metadata;
    use crate::assignment::AssignmentCategory;
    use crate::calendar::{EventSnapshot, InMemoryCalendarStore};
    use crate::scheduler::ScheduledSession;
    use crate::session::PlannerSession;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
    use uuid::Uuid;

    fn utc_offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, hour, minute, 0).unwrap()
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (at(0, 0), at(0, 0) + Duration::days(14))
    }

    fn scheduled(start: DateTime<Utc>, minutes: i64) -> ScheduledSession {
        let session = PlannerSession {
            id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            plan_step_id: None,
            session_index: 0,
            session_count: 1,
            title: "Problem set".to_string(),
            category: AssignmentCategory::Homework,
            due: start + Duration::days(3),
            estimated_minutes: minutes as u32,
            importance: 0.6,
            difficulty: 0.6,
            is_locked_to_due_date: false,
        };
        ScheduledSession {
            id: Uuid::new_v4(),
            session,
            start,
            end: start + Duration::minutes(minutes),
            is_locked: false,
            is_user_edited: false,
            user_edited_at: None,
            reschedule_count: 0,
            is_completed: false,
            annotation: None,
        }
    }

    #[tokio::test]
    async fn first_sync_creates_tagged_events() {
        let engine = CalendarSyncEngine::new(InMemoryCalendarStore::new(), utc_offset());
        let schedule = vec![scheduled(at(9, 0), 60), scheduled(at(14, 0), 45)];
        let (from, until) = window();

        let outcome = engine.sync(&schedule, from, until).await.unwrap();
        let SyncOutcome::Completed(diff) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(diff.added.len(), 2);

        for event in engine.store().snapshot_all() {
            let metadata = extract_metadata(event.notes.as_deref().unwrap());
            assert!(metadata.is_some(), "event missing planner tag");
        }
    }

    #[tokio::test]
    async fn second_sync_is_idempotent() {
        let engine = CalendarSyncEngine::new(InMemoryCalendarStore::new(), utc_offset());
        let schedule = vec![scheduled(at(9, 0), 60)];
        let (from, until) = window();

        engine.sync(&schedule, from, until).await.unwrap();
        let SyncOutcome::Completed(diff) = engine.sync(&schedule, from, until).await.unwrap()
        else {
            panic!("expected completion");
        };
        assert!(diff.is_idempotent(), "second diff: {:?}", diff);
        assert_eq!(engine.store().event_count(), 1);
    }

    #[tokio::test]
    async fn moved_schedule_updates_instead_of_recreating() {
        let engine = CalendarSyncEngine::new(InMemoryCalendarStore::new(), utc_offset());
        let (from, until) = window();

        engine.sync(&[scheduled(at(9, 0), 60)], from, until).await.unwrap();
        let original_id = engine.store().snapshot_all()[0].event_id.clone();

        let SyncOutcome::Completed(diff) = engine
            .sync(&[scheduled(at(11, 0), 60)], from, until)
            .await
            .unwrap()
        else {
            panic!("expected completion");
        };
        assert_eq!(diff.moved.len(), 1);
        assert!(diff.added.is_empty() && diff.removed.is_empty());

        let events = engine.store().snapshot_all();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, original_id);
        assert_eq!(events[0].start, at(11, 0));
    }

    #[tokio::test]
    async fn stale_planner_events_are_removed() {
        let engine = CalendarSyncEngine::new(InMemoryCalendarStore::new(), utc_offset());
        let (from, until) = window();

        engine.sync(&[scheduled(at(9, 0), 60)], from, until).await.unwrap();
        assert_eq!(engine.store().event_count(), 1);

        let SyncOutcome::Completed(diff) = engine.sync(&[], from, until).await.unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(engine.store().event_count(), 0);
    }

    #[tokio::test]
    async fn foreign_events_are_never_deleted() {
        let store = InMemoryCalendarStore::new();
        store.seed(EventSnapshot {
            event_id: "user-evt".into(),
            title: "Dentist".into(),
            start: at(9, 30),
            end: at(10, 30),
            notes: Some("remember insurance card".into()),
        });
        let engine = CalendarSyncEngine::new(store, utc_offset());
        let (from, until) = window();

        let SyncOutcome::Completed(diff) = engine.sync(&[], from, until).await.unwrap() else {
            panic!("expected completion");
        };
        assert!(diff.removed.is_empty());
        assert_eq!(engine.store().event_count(), 1);
    }

    #[tokio::test]
    async fn overlap_with_foreign_event_is_reported_as_conflict() {
        let store = InMemoryCalendarStore::new();
        store.seed(EventSnapshot {
            event_id: "user-evt".into(),
            title: "Dentist".into(),
            start: at(9, 30),
            end: at(10, 30),
            notes: None,
        });
        let engine = CalendarSyncEngine::new(store, utc_offset());
        let (from, until) = window();

        let SyncOutcome::Completed(diff) = engine
            .sync(&[scheduled(at(9, 0), 60)], from, until)
            .await
            .unwrap()
        else {
            panic!("expected completion");
        };
        assert_eq!(diff.conflicts.len(), 1);
        assert_eq!(diff.conflicts[0].event_title, "Dentist");
        // The conflict is reported but the block still syncs.
        assert_eq!(engine.store().event_count(), 2);
    }

    #[tokio::test]
    async fn malformed_tag_means_event_is_left_alone() {
        let store = InMemoryCalendarStore::new();
        store.seed(EventSnapshot {
            event_id: "broken".into(),
            title: "Coursework Session".into(),
            start: at(9, 0),
            end: at(10, 0),
            notes: Some("[StudyPlan]{broken json[/StudyPlan]".into()),
        });
        let engine = CalendarSyncEngine::new(store, utc_offset());
        let (from, until) = window();

        engine.sync(&[], from, until).await.unwrap();
        assert_eq!(engine.store().event_count(), 1);
    }

    #[test]
    fn diff_reason_summarizes_the_changes() {
        let schedule = vec![scheduled(at(9, 0), 60)];
        let blocks = build_blocks(&schedule, utc_offset(), DEFAULT_MERGE_GAP_MINUTES);

        let diff = diff_schedule(&blocks, &[], utc_offset());
        assert_eq!(diff.reason, "1 added");
        assert!(diff.confidence.is_none());

        let empty = diff_schedule(&[], &[], utc_offset());
        assert_eq!(empty.reason, "Calendar already matches the schedule");
    }

    #[test]
    fn diff_reason_mentions_conflicts() {
        let schedule = vec![scheduled(at(9, 0), 60)];
        let blocks = build_blocks(&schedule, utc_offset(), DEFAULT_MERGE_GAP_MINUTES);
        let existing = vec![EventSnapshot {
            event_id: "user-evt".into(),
            title: "Dentist".into(),
            start: at(9, 30),
            end: at(10, 30),
            notes: None,
        }];

        let diff = diff_schedule(&blocks, &existing, utc_offset());
        assert_eq!(diff.reason, "1 added; 1 overlap with existing events");
    }

    #[test]
    fn diff_pairs_same_day_blocks_as_resize_when_start_matches() {
        let schedule = vec![scheduled(at(9, 0), 60)];
        let blocks = build_blocks(&schedule, utc_offset(), DEFAULT_MERGE_GAP_MINUTES);

        // Same start, longer event already on the calendar.
        let existing = vec![EventSnapshot {
            event_id: "evt-1".into(),
            title: "Coursework Session".into(),
            start: at(9, 0),
            end: at(11, 0),
            notes: Some(
                r#"[StudyPlan]{"block_id":"old","source":"studyplan","day_key":"2025-11-03"}[/StudyPlan]"#
                    .into(),
            ),
        }];

        let diff = diff_schedule(&blocks, &existing, utc_offset());
        assert_eq!(diff.resized.len(), 1);
        assert!(diff.moved.is_empty() && diff.added.is_empty() && diff.removed.is_empty());
        assert_eq!(diff.change_count(), 1);
    }
}
