//! Schedule-index scoring.
//!
//! The index blends category weight, due-date proximity, and difficulty
//! into one value in [0, 1]. It is a pure function of its inputs so
//! ranking stays reproducible across runs.

use chrono::{DateTime, Utc};

use crate::assignment::AssignmentCategory;

const CATEGORY_WEIGHT: f64 = 0.45;
const PROXIMITY_WEIGHT: f64 = 0.35;
const DIFFICULTY_WEIGHT: f64 = 0.20;

/// Rank a session for placement. Higher means sooner.
pub fn compute_schedule_index(
    category: AssignmentCategory,
    due: DateTime<Utc>,
    difficulty: f64,
    now: DateTime<Utc>,
) -> f64 {
    let score = CATEGORY_WEIGHT * category.priority_weight()
        + PROXIMITY_WEIGHT * due_proximity(due, now)
        + DIFFICULTY_WEIGHT * difficulty.clamp(0.0, 1.0);
    score.clamp(0.0, 1.0)
}

/// 1.0 when due now or overdue, decaying as `1 / (1 + days_until_due)`.
fn due_proximity(due: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (due - now).num_seconds();
    if seconds <= 0 {
        return 1.0;
    }
    let days = seconds as f64 / 86_400.0;
    1.0 / (1.0 + days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn index_stays_in_unit_interval() {
        for category in [
            AssignmentCategory::Exam,
            AssignmentCategory::Quiz,
            AssignmentCategory::Homework,
            AssignmentCategory::Reading,
            AssignmentCategory::Review,
            AssignmentCategory::Project,
        ] {
            for days in [0, 1, 7, 30, 365] {
                let due = now() + Duration::days(days);
                let idx = compute_schedule_index(category, due, 1.0, now());
                assert!((0.0..=1.0).contains(&idx), "{:?} at {}d: {}", category, days, idx);
            }
        }
    }

    #[test]
    fn closer_due_date_scores_higher() {
        let soon = compute_schedule_index(
            AssignmentCategory::Homework,
            now() + Duration::days(1),
            0.6,
            now(),
        );
        let later = compute_schedule_index(
            AssignmentCategory::Homework,
            now() + Duration::days(10),
            0.6,
            now(),
        );
        assert!(soon > later);
    }

    #[test]
    fn overdue_gets_full_proximity() {
        assert_eq!(due_proximity(now() - Duration::hours(2), now()), 1.0);
        assert_eq!(due_proximity(now(), now()), 1.0);
    }

    #[test]
    fn exam_outranks_reading_at_same_distance() {
        let due = now() + Duration::days(3);
        let exam = compute_schedule_index(AssignmentCategory::Exam, due, 0.9, now());
        let reading = compute_schedule_index(AssignmentCategory::Reading, due, 0.5, now());
        assert!(exam > reading);
    }

    #[test]
    fn difficulty_outside_unit_range_is_clamped() {
        let due = now() + Duration::days(2);
        let hi = compute_schedule_index(AssignmentCategory::Quiz, due, 5.0, now());
        let capped = compute_schedule_index(AssignmentCategory::Quiz, due, 1.0, now());
        assert_eq!(hi, capped);
    }
}
