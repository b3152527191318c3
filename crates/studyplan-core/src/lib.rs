//! # StudyPlan Core Library
//!
//! This library provides the core planning logic for the StudyPlan
//! assignment planner. It implements a CLI-first philosophy where every
//! operation is available through a standalone CLI binary, with any GUI
//! expected to be a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Plan Generation**: Deterministic expansion of assignments into
//!   ordered plan steps, by category policy
//! - **Scheduling**: Slot-based packing of sessions into a day window,
//!   ranked by a reproducible schedule index
//! - **Rescheduling**: Strategy ladder for missed blocks, gated and
//!   serialized against concurrent triggers
//! - **Calendar Sync**: Diff-and-apply projection of the schedule onto
//!   an external calendar with tagged, safely-deletable events
//! - **Storage**: SQLite-based persistence and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`generate_plan`]: Assignment-to-plan expansion
//! - [`Scheduler`]: Deterministic calendar placement
//! - [`AutoRescheduler`]: Missed-block recovery
//! - [`CalendarSyncEngine`]: Calendar projection
//! - [`PlannerDb`] / [`PlannerConfig`]: Persistence

pub mod annotate;
pub mod assignment;
pub mod calendar;
pub mod error;
pub mod plan;
pub mod recurrence;
pub mod reschedule;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod sync;

pub use annotate::{annotate_session, AiAnnotation, AnnotationOutcome, AnnotationProvider};
pub use assignment::{Assignment, AssignmentCategory, AssignmentUrgency, PlanStepStub};
pub use calendar::{CalendarStore, EventSnapshot, EventSpan, InMemoryCalendarStore};
pub use error::{ConfigError, CoreError, RepositoryError, Result};
pub use plan::{generate_plan, AssignmentPlan, DependencyGraph, PlanIssue, PlanSettings, PlanStep, StepType};
pub use recurrence::{next_occurrence, HolidayChecker, NextOccurrence, RecurrenceRule};
pub use reschedule::{AutoRescheduler, RescheduleOutcome, RescheduleRecord, RescheduleReport, RescheduleSettings, RescheduleStrategy};
pub use scheduler::{DoNotScheduleWindow, EnergyProfile, Interval, ScheduleResult, ScheduledSession, Scheduler, SchedulerSettings};
pub use session::{generate_sessions, PlannerSession};
pub use storage::{PlannerConfig, PlannerDb};
pub use sync::{CalendarSyncEngine, PendingScheduleSuggestion, ScheduleDiff, SuggestionSlot, SyncError, SyncOutcome};
