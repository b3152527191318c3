//! Schedulable session units derived from assignments and their plans.
//!
//! A [`PlannerSession`] is what the scheduler actually places on the
//! calendar. When an assignment has a plan, each plan step becomes one
//! session; otherwise the whole assignment becomes a single session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::{Assignment, AssignmentCategory};
use crate::plan::AssignmentPlan;
use crate::scheduler::priority::compute_schedule_index;

/// Shortest session the generator will emit, in minutes.
pub const MIN_SESSION_MINUTES: u32 = 15;

/// One schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerSession {
    pub id: Uuid,
    pub assignment_id: Uuid,
    /// Step id this session came from, when plan-derived.
    pub plan_step_id: Option<Uuid>,
    /// Position within the assignment's session set, 0-based.
    pub session_index: usize,
    /// Total sessions generated for the assignment.
    pub session_count: usize,
    pub title: String,
    pub category: AssignmentCategory,
    pub due: DateTime<Utc>,
    pub estimated_minutes: u32,
    /// Combined urgency/category importance, in [0, 1].
    pub importance: f64,
    /// Category-derived difficulty, in [0, 1].
    pub difficulty: f64,
    pub is_locked_to_due_date: bool,
}

impl PlannerSession {
    /// Deterministic ranking score used by the scheduler.
    pub fn schedule_index(&self, now: DateTime<Utc>) -> f64 {
        compute_schedule_index(self.category, self.due, self.difficulty, now)
    }
}

/// Expand an assignment into its schedulable sessions.
///
/// Plan steps map 1:1 to sessions in sequence order. Without a plan (or
/// with an empty one) the assignment collapses to a single session. A
/// completed assignment yields nothing.
pub fn generate_sessions(
    assignment: &Assignment,
    plan: Option<&AssignmentPlan>,
) -> Vec<PlannerSession> {
    if assignment.is_completed {
        return Vec::new();
    }

    let due = assignment.effective_due_datetime();
    let importance = assignment.importance();
    let difficulty = assignment.difficulty();

    let steps = plan.map(|p| p.steps.as_slice()).unwrap_or(&[]);
    if steps.is_empty() {
        return vec![PlannerSession {
            id: Uuid::new_v4(),
            assignment_id: assignment.id,
            plan_step_id: None,
            session_index: 0,
            session_count: 1,
            title: assignment.title.clone(),
            category: assignment.category,
            due,
            estimated_minutes: assignment.estimated_minutes.max(MIN_SESSION_MINUTES),
            importance,
            difficulty,
            is_locked_to_due_date: assignment.is_locked_to_due_date,
        }];
    }

    let count = steps.len();
    steps
        .iter()
        .map(|step| PlannerSession {
            id: Uuid::new_v4(),
            assignment_id: assignment.id,
            plan_step_id: Some(step.id),
            session_index: step.sequence_index,
            session_count: count,
            title: step.title.clone(),
            category: assignment.category,
            due,
            estimated_minutes: step.estimated_minutes.max(MIN_SESSION_MINUTES),
            importance,
            difficulty,
            is_locked_to_due_date: assignment.is_locked_to_due_date,
        })
        .collect()
}
