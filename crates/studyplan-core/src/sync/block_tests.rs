//! Tests for block module.

#[cfg(test)]
mod tests {
    use super::super::block::*;
    use crate::assignment::AssignmentCategory;
    use crate::scheduler::ScheduledSession;
    use crate::session::PlannerSession;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
    use uuid::Uuid;

    fn utc_offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn scheduled(
        category: AssignmentCategory,
        start: DateTime<Utc>,
        minutes: i64,
    ) -> ScheduledSession {
        let session = PlannerSession {
            id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            plan_step_id: None,
            session_index: 0,
            session_count: 1,
            title: "Practice problems".to_string(),
            category,
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

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, hour, minute, 0).unwrap()
    }

    #[test]
    fn sessions_nine_minutes_apart_merge() {
        let a = scheduled(AssignmentCategory::Homework, at(9, 0), 60);
        let b = scheduled(AssignmentCategory::Homework, at(10, 9), 45);
        let blocks = build_blocks(&[a, b], utc_offset(), DEFAULT_MERGE_GAP_MINUTES);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start, at(9, 0));
        assert_eq!(blocks[0].end, at(10, 54));
        assert_eq!(blocks[0].session_ids.len(), 2);
    }

    #[test]
    fn sessions_eleven_minutes_apart_stay_separate() {
        let a = scheduled(AssignmentCategory::Homework, at(9, 0), 60);
        let b = scheduled(AssignmentCategory::Homework, at(10, 11), 45);
        let blocks = build_blocks(&[a, b], utc_offset(), DEFAULT_MERGE_GAP_MINUTES);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn blocks_never_cross_local_midnight() {
        // 23:30-00:15 and 00:20-01:00 are adjacent in UTC but land on
        // different local days at +02:00.
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let a = scheduled(
            AssignmentCategory::Homework,
            Utc.with_ymd_and_hms(2025, 11, 3, 21, 30, 0).unwrap(),
            45,
        );
        let b = scheduled(
            AssignmentCategory::Homework,
            Utc.with_ymd_and_hms(2025, 11, 3, 22, 20, 0).unwrap(),
            40,
        );
        let blocks = build_blocks(&[a, b], offset, DEFAULT_MERGE_GAP_MINUTES);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].day_key, "2025-11-03");
        assert_eq!(blocks[1].day_key, "2025-11-04");
    }

    #[test]
    fn exam_or_quiz_member_names_the_block_exam_session() {
        let exam = scheduled(AssignmentCategory::Exam, at(9, 0), 60);
        let hw = scheduled(AssignmentCategory::Homework, at(10, 5), 45);
        let blocks = build_blocks(&[exam, hw], utc_offset(), DEFAULT_MERGE_GAP_MINUTES);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].title, "Exam Session");

        let only_hw = scheduled(AssignmentCategory::Homework, at(14, 0), 60);
        let blocks = build_blocks(&[only_hw], utc_offset(), DEFAULT_MERGE_GAP_MINUTES);
        assert_eq!(blocks[0].title, "Coursework Session");
    }

    #[test]
    fn block_id_is_stable_under_small_drift() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let a = compute_block_id(at(9, 0), at(10, 0), &ids);
        let b = compute_block_id(at(9, 2), at(10, 3), &ids);
        assert_eq!(a, b);

        let c = compute_block_id(at(9, 30), at(10, 30), &ids);
        assert_ne!(a, c);
    }

    #[test]
    fn block_id_depends_on_session_order_and_membership() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let a = compute_block_id(at(9, 0), at(10, 0), &[x, y]);
        let b = compute_block_id(at(9, 0), at(10, 0), &[y, x]);
        let c = compute_block_id(at(9, 0), at(10, 0), &[x]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn notes_list_member_sessions_with_durations() {
        let a = scheduled(AssignmentCategory::Homework, at(9, 0), 60);
        let blocks = build_blocks(&[a], utc_offset(), DEFAULT_MERGE_GAP_MINUTES);
        assert_eq!(blocks[0].notes_body(), "- Practice problems (60 min)");
    }

    #[test]
    fn empty_schedule_builds_no_blocks() {
        assert!(build_blocks(&[], utc_offset(), DEFAULT_MERGE_GAP_MINUTES).is_empty());
    }
}
