//! Assignment model: coursework items with due dates, categories, and
//! effort estimates.
//!
//! Assignments are the root input of the planning pipeline. They are plain
//! value types; once scheduled they change only through explicit updates,
//! never as a side effect of plan or schedule generation.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recurrence::RecurrenceRule;

/// Coursework category. Drives plan shape and scheduling priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentCategory {
    Exam,
    Quiz,
    Homework,
    Reading,
    Review,
    Project,
}

impl AssignmentCategory {
    /// Scheduling priority weight (0.0-1.0, higher schedules first).
    pub fn priority_weight(&self) -> f64 {
        match self {
            AssignmentCategory::Exam => 1.0,
            AssignmentCategory::Quiz => 0.9,
            AssignmentCategory::Project => 0.8,
            AssignmentCategory::Homework => 0.7,
            AssignmentCategory::Reading => 0.6,
            AssignmentCategory::Review => 0.5,
        }
    }

    /// Base difficulty estimate for this category (0.0-1.0).
    pub fn base_difficulty(&self) -> f64 {
        match self {
            AssignmentCategory::Exam => 0.9,
            AssignmentCategory::Project => 0.8,
            AssignmentCategory::Quiz => 0.7,
            AssignmentCategory::Homework => 0.6,
            AssignmentCategory::Reading => 0.5,
            AssignmentCategory::Review => 0.4,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AssignmentCategory::Exam => "Exam",
            AssignmentCategory::Quiz => "Quiz",
            AssignmentCategory::Homework => "Homework",
            AssignmentCategory::Reading => "Reading",
            AssignmentCategory::Review => "Review",
            AssignmentCategory::Project => "Project",
        }
    }
}

/// User-assigned urgency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentUrgency {
    Low,
    Medium,
    High,
    Critical,
}

impl AssignmentUrgency {
    /// Priority weight on a 0.0-1.0 scale.
    pub fn weight(&self) -> f64 {
        match self {
            AssignmentUrgency::Low => 0.2,
            AssignmentUrgency::Medium => 0.6,
            AssignmentUrgency::High => 0.8,
            AssignmentUrgency::Critical => 1.0,
        }
    }
}

/// A user-supplied plan step outline: ordered title/duration pairs that
/// override category-based plan generation (used for projects).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStepStub {
    pub id: Uuid,
    pub title: String,
    pub expected_minutes: u32,
}

impl PlanStepStub {
    pub fn new(title: impl Into<String>, expected_minutes: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            expected_minutes,
        }
    }
}

/// A coursework assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub title: String,
    pub category: AssignmentCategory,
    pub urgency: AssignmentUrgency,
    /// Due day. The time of day lives in `due_time_minutes`.
    pub due_date: NaiveDate,
    /// Minutes since midnight, local wall clock. None means end of day.
    pub due_time_minutes: Option<u32>,
    /// Total estimated effort in minutes.
    pub estimated_minutes: u32,
    /// When set, sessions must finish strictly before the due datetime.
    pub is_locked_to_due_date: bool,
    /// Optional user-supplied plan outline (projects).
    #[serde(default)]
    pub custom_plan: Vec<PlanStepStub>,
    /// Optional recurrence rule; completion spawns a successor instance.
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    /// Number of completed occurrences of a recurring assignment.
    #[serde(default)]
    pub completed_occurrences: u32,
    pub is_completed: bool,
}

impl Assignment {
    pub fn new(
        title: impl Into<String>,
        category: AssignmentCategory,
        due_date: NaiveDate,
        estimated_minutes: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            category,
            urgency: AssignmentUrgency::Medium,
            due_date,
            due_time_minutes: None,
            estimated_minutes,
            is_locked_to_due_date: false,
            custom_plan: Vec::new(),
            recurrence: None,
            completed_occurrences: 0,
            is_completed: false,
        }
    }

    /// The effective deadline instant. Without an explicit due time the
    /// assignment is due at 23:59 of its due day.
    pub fn effective_due_datetime(&self) -> DateTime<Utc> {
        let minutes = self.due_time_minutes.unwrap_or(23 * 60 + 59);
        let time = NaiveTime::from_num_seconds_from_midnight_opt(minutes * 60, 0)
            .unwrap_or(NaiveTime::MIN);
        self.due_date.and_time(time).and_utc()
    }

    pub fn has_explicit_due_time(&self) -> bool {
        self.due_time_minutes.is_some()
    }

    /// Importance on a 0.0-1.0 scale, derived from urgency.
    pub fn importance(&self) -> f64 {
        self.urgency.weight()
    }

    /// Difficulty estimate on a 0.0-1.0 scale: category base adjusted by
    /// estimated size (short work is easier, long work harder).
    pub fn difficulty(&self) -> f64 {
        let base = self.category.base_difficulty();
        let adjustment = if self.estimated_minutes < 30 {
            -0.1
        } else if self.estimated_minutes > 120 {
            0.1
        } else {
            0.0
        };
        (base + adjustment).clamp(0.0, 1.0)
    }
}
