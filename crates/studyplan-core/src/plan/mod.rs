//! Assignment plan generation.
//!
//! Turns one assignment into an ordered set of plan steps based on its
//! category. Generation is deterministic: the same assignment (same id,
//! due date, estimate, custom plan) always yields the same step titles,
//! durations, sequence indices, and types. Nothing here reads the wall
//! clock; every date is derived from the assignment's own due date.

pub mod graph;

pub use graph::DependencyGraph;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::{Assignment, AssignmentCategory};

/// Kind of work a plan step represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Research,
    Preparation,
    Practice,
    Review,
    Task,
    Reading,
}

/// One unit of work within an assignment's execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub title: String,
    pub estimated_minutes: u32,
    /// Contiguous from 0 within a plan.
    pub sequence_index: usize,
    /// Step ids that must complete before this one. Only meaningful when
    /// the owning plan has sequence enforcement enabled.
    #[serde(default)]
    pub prerequisite_ids: Vec<Uuid>,
    pub step_type: StepType,
    /// Suggested day to start, derived from the assignment due date.
    pub recommended_start: Option<NaiveDate>,
    /// Day this step should be finished by.
    pub due_by: Option<NaiveDate>,
}

/// Validation issues reported by [`AssignmentPlan::validate`].
///
/// A plan with issues is still returned to the caller; generation never
/// aborts on validation problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "issue")]
pub enum PlanIssue {
    EmptyPlan,
    /// Sequence indices are not contiguous from 0.
    InvalidSequenceIndex,
    /// The prerequisite relation contains a cycle; the path includes the
    /// re-entered step at both ends.
    PrerequisiteCycle { path: Vec<Uuid> },
}

/// An ordered execution plan for one assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentPlan {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub steps: Vec<PlanStep>,
    /// When enabled, `prerequisite_ids` form a DAG the scheduler respects.
    pub sequence_enforcement_enabled: bool,
}

impl AssignmentPlan {
    /// Wire a pure linear chain: step n depends only on step n-1.
    pub fn setup_linear_chain(&mut self) {
        let ids: Vec<Uuid> = self.steps.iter().map(|s| s.id).collect();
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.prerequisite_ids = if i == 0 { Vec::new() } else { vec![ids[i - 1]] };
        }
        self.sequence_enforcement_enabled = true;
    }

    /// Check structural invariants, returning every issue found.
    pub fn validate(&self) -> Vec<PlanIssue> {
        let mut issues = Vec::new();

        if self.steps.is_empty() {
            issues.push(PlanIssue::EmptyPlan);
            return issues;
        }

        let mut indices: Vec<usize> = self.steps.iter().map(|s| s.sequence_index).collect();
        indices.sort_unstable();
        if indices.iter().enumerate().any(|(expect, &got)| expect != got) {
            issues.push(PlanIssue::InvalidSequenceIndex);
        }

        if self.sequence_enforcement_enabled {
            if let Some(path) = DependencyGraph::new(&self.steps).detect_cycle() {
                issues.push(PlanIssue::PrerequisiteCycle { path });
            }
        }

        issues
    }

    pub fn total_minutes(&self) -> u32 {
        self.steps.iter().map(|s| s.estimated_minutes).sum()
    }

    /// Diagnostic quality score (0-100). Never used for control flow.
    pub fn quality_score(&self, assignment: &Assignment) -> u32 {
        if self.steps.is_empty() {
            return 0;
        }
        let mut score = 100.0f64;

        let estimated = assignment.estimated_minutes.max(1) as f64;
        let coverage = (self.total_minutes() as f64 / estimated).min(1.0);
        score -= (1.0 - coverage) * 40.0;

        if !self.validate().is_empty() {
            score -= 30.0;
        }

        // A single oversized step is a weak plan.
        if self.steps.len() == 1 && assignment.estimated_minutes > 120 {
            score -= 15.0;
        }

        score.clamp(0.0, 100.0) as u32
    }

    /// Diagnostic complexity metric: unbounded, monotonic in step count,
    /// prerequisite edges, and total effort.
    pub fn complexity_score(&self) -> f64 {
        let edges: usize = self.steps.iter().map(|s| s.prerequisite_ids.len()).sum();
        self.steps.len() as f64 + edges as f64 + self.total_minutes() as f64 / 60.0
    }
}

/// Policy constants for plan generation. Observed defaults; every value
/// is configuration, not contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSettings {
    /// Floor applied to every generated step, any category.
    pub min_step_minutes: u32,
    /// Homework at or under this stays a single step.
    pub homework_split_threshold_minutes: u32,
    /// Target chunk size when homework is split.
    pub homework_chunk_minutes: u32,
    /// Target study-session length for exam steps.
    pub exam_session_minutes: u32,
    /// Days before the exam the first review step should start.
    pub exam_lead_days: u32,
    /// Target chunk size for reading steps.
    pub reading_chunk_minutes: u32,
    /// Readings at or under this collapse to a single step.
    pub reading_collapse_minutes: u32,
    /// Target chunk size for quiz preparation.
    pub quiz_chunk_minutes: u32,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            min_step_minutes: 15,
            homework_split_threshold_minutes: 60,
            homework_chunk_minutes: 90,
            exam_session_minutes: 60,
            exam_lead_days: 5,
            reading_chunk_minutes: 45,
            reading_collapse_minutes: 30,
            quiz_chunk_minutes: 60,
        }
    }
}

/// Generate a plan for one assignment according to its category policy.
pub fn generate_plan(assignment: &Assignment, settings: &PlanSettings) -> AssignmentPlan {
    let plan_id = Uuid::new_v4();
    let steps = match assignment.category {
        AssignmentCategory::Exam => exam_steps(assignment, settings, plan_id),
        AssignmentCategory::Quiz => quiz_steps(assignment, settings, plan_id),
        AssignmentCategory::Homework => homework_steps(assignment, settings, plan_id),
        AssignmentCategory::Reading => reading_steps(assignment, settings, plan_id),
        AssignmentCategory::Review => review_steps(assignment, settings, plan_id),
        AssignmentCategory::Project => project_steps(assignment, settings, plan_id),
    };

    AssignmentPlan {
        id: plan_id,
        assignment_id: assignment.id,
        steps,
        sequence_enforcement_enabled: false,
    }
}

// === Category policies ===

fn exam_steps(assignment: &Assignment, settings: &PlanSettings, plan_id: Uuid) -> Vec<PlanStep> {
    let total = assignment.estimated_minutes;
    let session = settings.exam_session_minutes.max(settings.min_step_minutes);
    let count = (total.div_ceil(session) as usize).clamp(3, 6);
    // Round up so summed duration always covers the estimate.
    let per_step = (total.div_ceil(count as u32)).max(settings.min_step_minutes);

    let lead = settings.exam_lead_days.max(1);
    (0..count)
        .map(|i| {
            let (title, step_type) = if i == 0 {
                (format!("Review notes for {}", assignment.title), StepType::Review)
            } else if i == count - 1 {
                (format!("Final review for {}", assignment.title), StepType::Review)
            } else if i % 2 == 1 {
                (format!("Practice problems ({})", i), StepType::Practice)
            } else {
                (format!("Review weak areas ({})", i), StepType::Review)
            };
            // Spread steps across the lead window, last step on the due day.
            let offset_days = if count > 1 {
                lead * (count - 1 - i) as u32 / (count - 1) as u32
            } else {
                0
            };
            PlanStep {
                id: Uuid::new_v4(),
                plan_id,
                title,
                estimated_minutes: per_step,
                sequence_index: i,
                prerequisite_ids: Vec::new(),
                step_type,
                recommended_start: assignment
                    .due_date
                    .checked_sub_days(Days::new(offset_days as u64)),
                due_by: Some(assignment.due_date),
            }
        })
        .collect()
}

fn quiz_steps(assignment: &Assignment, settings: &PlanSettings, plan_id: Uuid) -> Vec<PlanStep> {
    let total = assignment.estimated_minutes;
    let chunk = settings.quiz_chunk_minutes.max(settings.min_step_minutes);
    let count = (total.div_ceil(chunk) as usize).clamp(1, 3);
    // Each step stays within the total estimate (subject to the floor).
    let per_step = total
        .div_ceil(count as u32)
        .max(settings.min_step_minutes);

    (0..count)
        .map(|i| {
            let title = if count == 1 {
                format!("Prepare for {}", assignment.title)
            } else {
                format!("Prepare for {} ({}/{})", assignment.title, i + 1, count)
            };
            PlanStep {
                id: Uuid::new_v4(),
                plan_id,
                title,
                estimated_minutes: per_step,
                sequence_index: i,
                prerequisite_ids: Vec::new(),
                step_type: if i == count - 1 {
                    StepType::Review
                } else {
                    StepType::Practice
                },
                recommended_start: step_start(assignment.due_date, count, i),
                due_by: Some(assignment.due_date),
            }
        })
        .collect()
}

fn homework_steps(assignment: &Assignment, settings: &PlanSettings, plan_id: Uuid) -> Vec<PlanStep> {
    let total = assignment.estimated_minutes;
    if total <= settings.homework_split_threshold_minutes {
        return vec![PlanStep {
            id: Uuid::new_v4(),
            plan_id,
            title: format!("Complete {}", assignment.title),
            estimated_minutes: total.max(settings.min_step_minutes),
            sequence_index: 0,
            prerequisite_ids: Vec::new(),
            step_type: StepType::Task,
            recommended_start: step_start(assignment.due_date, 1, 0),
            due_by: Some(assignment.due_date),
        }];
    }

    // Split into chunks whose summed duration equals the total exactly.
    let count = total.div_ceil(settings.homework_chunk_minutes).max(2) as usize;
    let durations = split_exact(total, count, settings.min_step_minutes);
    durations
        .into_iter()
        .enumerate()
        .map(|(i, minutes)| PlanStep {
            id: Uuid::new_v4(),
            plan_id,
            title: format!("Work on {} (part {}/{})", assignment.title, i + 1, count),
            estimated_minutes: minutes,
            sequence_index: i,
            prerequisite_ids: Vec::new(),
            step_type: StepType::Task,
            recommended_start: step_start(assignment.due_date, count, i),
            due_by: Some(assignment.due_date),
        })
        .collect()
}

fn reading_steps(assignment: &Assignment, settings: &PlanSettings, plan_id: Uuid) -> Vec<PlanStep> {
    let total = assignment.estimated_minutes;
    let count = if total <= settings.reading_collapse_minutes {
        1
    } else {
        (total.div_ceil(settings.reading_chunk_minutes) as usize).max(1)
    };
    let durations = split_exact(total.max(settings.min_step_minutes), count, settings.min_step_minutes);

    durations
        .into_iter()
        .enumerate()
        .map(|(i, minutes)| {
            let title = if count == 1 {
                format!("Read {}", assignment.title)
            } else {
                format!("Read {} ({}/{})", assignment.title, i + 1, count)
            };
            PlanStep {
                id: Uuid::new_v4(),
                plan_id,
                title,
                estimated_minutes: minutes,
                sequence_index: i,
                prerequisite_ids: Vec::new(),
                step_type: StepType::Reading,
                recommended_start: step_start(assignment.due_date, count, i),
                due_by: Some(assignment.due_date),
            }
        })
        .collect()
}

fn review_steps(assignment: &Assignment, settings: &PlanSettings, plan_id: Uuid) -> Vec<PlanStep> {
    let total = assignment.estimated_minutes.max(settings.min_step_minutes);
    vec![PlanStep {
        id: Uuid::new_v4(),
        plan_id,
        title: format!("Review {}", assignment.title),
        estimated_minutes: total,
        sequence_index: 0,
        prerequisite_ids: Vec::new(),
        step_type: StepType::Review,
        recommended_start: step_start(assignment.due_date, 1, 0),
        due_by: Some(assignment.due_date),
    }]
}

fn project_steps(assignment: &Assignment, settings: &PlanSettings, plan_id: Uuid) -> Vec<PlanStep> {
    if !assignment.custom_plan.is_empty() {
        let count = assignment.custom_plan.len();
        return assignment
            .custom_plan
            .iter()
            .enumerate()
            .map(|(i, stub)| PlanStep {
                id: Uuid::new_v4(),
                plan_id,
                title: stub.title.clone(),
                estimated_minutes: stub.expected_minutes.max(settings.min_step_minutes),
                sequence_index: i,
                prerequisite_ids: Vec::new(),
                step_type: StepType::Task,
                recommended_start: step_start(assignment.due_date, count, i),
                due_by: Some(assignment.due_date),
            })
            .collect();
    }

    // Default arc: research first, review last.
    let total = assignment.estimated_minutes;
    let arc: [(&str, StepType, u32); 5] = [
        ("Research and gather sources", StepType::Research, 25),
        ("Outline the deliverable", StepType::Preparation, 15),
        ("Build the main deliverable", StepType::Task, 35),
        ("Revise and polish", StepType::Preparation, 15),
        ("Final review", StepType::Review, 10),
    ];
    arc.iter()
        .enumerate()
        .map(|(i, (phase, step_type, percent))| PlanStep {
            id: Uuid::new_v4(),
            plan_id,
            title: format!("{}: {}", phase, assignment.title),
            estimated_minutes: (total * percent / 100).max(settings.min_step_minutes),
            sequence_index: i,
            prerequisite_ids: Vec::new(),
            step_type: *step_type,
            recommended_start: step_start(assignment.due_date, arc.len(), i),
            due_by: Some(assignment.due_date),
        })
        .collect()
}

// === Helpers ===

/// Recommended start for step `i` of `count`: one day per remaining step
/// before the due date, never earlier than `count` days out.
fn step_start(due: NaiveDate, count: usize, i: usize) -> Option<NaiveDate> {
    let days_before = (count - i) as u64;
    due.checked_sub_days(Days::new(days_before))
}

/// Split `total` minutes into `count` chunks that sum to `total` exactly,
/// each at least `min` (the first chunks absorb the remainder).
fn split_exact(total: u32, count: usize, min: u32) -> Vec<u32> {
    let count = count.max(1) as u32;
    let base = total / count;
    let remainder = total % count;
    (0..count)
        .map(|i| {
            let extra = if i < remainder { 1 } else { 0 };
            (base + extra).max(min)
        })
        .collect()
}
