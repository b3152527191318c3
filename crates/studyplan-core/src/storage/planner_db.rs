//! SQLite-based storage for assignments, the schedule, and reschedule
//! history.
//!
//! Assignments are stored in explicit columns with nested structures
//! (custom plans, recurrence rules) as JSON. Scheduled sessions keep
//! their key fields in columns for querying and the full session as a
//! JSON payload. Reschedule history is append-only: there is no update
//! or delete path for it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use indoc::indoc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::data_dir;
use crate::assignment::{Assignment, AssignmentCategory, AssignmentUrgency};
use crate::error::RepositoryError;
use crate::reschedule::{RescheduleRecord, RescheduleStrategy};
use crate::scheduler::ScheduledSession;

// === Helper Functions ===

fn format_category(category: AssignmentCategory) -> &'static str {
    match category {
        AssignmentCategory::Exam => "exam",
        AssignmentCategory::Quiz => "quiz",
        AssignmentCategory::Homework => "homework",
        AssignmentCategory::Reading => "reading",
        AssignmentCategory::Review => "review",
        AssignmentCategory::Project => "project",
    }
}

fn parse_category(s: &str) -> AssignmentCategory {
    match s {
        "exam" => AssignmentCategory::Exam,
        "quiz" => AssignmentCategory::Quiz,
        "reading" => AssignmentCategory::Reading,
        "review" => AssignmentCategory::Review,
        "project" => AssignmentCategory::Project,
        _ => AssignmentCategory::Homework,
    }
}

fn format_urgency(urgency: AssignmentUrgency) -> &'static str {
    match urgency {
        AssignmentUrgency::Low => "low",
        AssignmentUrgency::Medium => "medium",
        AssignmentUrgency::High => "high",
        AssignmentUrgency::Critical => "critical",
    }
}

fn parse_urgency(s: &str) -> AssignmentUrgency {
    match s {
        "low" => AssignmentUrgency::Low,
        "high" => AssignmentUrgency::High,
        "critical" => AssignmentUrgency::Critical,
        _ => AssignmentUrgency::Medium,
    }
}

fn format_strategy(strategy: RescheduleStrategy) -> &'static str {
    match strategy {
        RescheduleStrategy::SameDaySlot => "same_day_slot",
        RescheduleStrategy::SameDayPushed => "same_day_pushed",
        RescheduleStrategy::NextDay => "next_day",
        RescheduleStrategy::Overflow => "overflow",
    }
}

fn parse_strategy(s: &str) -> RescheduleStrategy {
    match s {
        "same_day_slot" => RescheduleStrategy::SameDaySlot,
        "same_day_pushed" => RescheduleStrategy::SameDayPushed,
        "next_day" => RescheduleStrategy::NextDay,
        _ => RescheduleStrategy::Overflow,
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::QueryFailed(format!("bad datetime '{s}': {e}")))
}

fn parse_date(s: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| RepositoryError::QueryFailed(format!("bad date '{s}': {e}")))
}

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::QueryFailed(format!("bad uuid '{s}': {e}")))
}

fn json_column<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(s).map_err(|e| RepositoryError::QueryFailed(format!("bad json: {e}")))
}

// Intermediate row shapes so rusqlite closures stay on rusqlite errors
// and conversion failures surface as repository errors.
struct AssignmentRow {
    id: String,
    title: String,
    category: String,
    urgency: String,
    due_date: String,
    due_time_minutes: Option<u32>,
    estimated_minutes: u32,
    is_locked_to_due_date: bool,
    custom_plan: String,
    recurrence: Option<String>,
    completed_occurrences: u32,
    is_completed: bool,
}

struct HistoryRow {
    id: String,
    scheduled_session_id: String,
    assignment_id: String,
    strategy: String,
    old_start: String,
    old_end: String,
    new_start: Option<String>,
    new_end: Option<String>,
    occurred_at: String,
}

/// Planner database handle.
pub struct PlannerDb {
    conn: Connection,
}

impl PlannerDb {
    /// Open (creating and migrating as needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path).map_err(|e| RepositoryError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open the database at its default location.
    pub fn open_default() -> Result<Self, RepositoryError> {
        let path = default_db_path().map_err(|e| {
            RepositoryError::QueryFailed(format!("cannot resolve data directory: {e}"))
        })?;
        Self::open(&path)
    }

    fn migrate(&self) -> Result<(), RepositoryError> {
        self.conn
            .execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);")
            .map_err(|e| RepositoryError::MigrationFailed(e.to_string()))?;

        let version: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .optional()
            .map_err(|e| RepositoryError::MigrationFailed(e.to_string()))?
            .unwrap_or(0);

        if version < 1 {
            self.migrate_v1()?;
        }
        Ok(())
    }

    fn migrate_v1(&self) -> Result<(), RepositoryError> {
        self.conn
            .execute_batch(indoc! {"
                BEGIN;
                CREATE TABLE IF NOT EXISTS assignments (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    category TEXT NOT NULL,
                    urgency TEXT NOT NULL,
                    due_date TEXT NOT NULL,
                    due_time_minutes INTEGER,
                    estimated_minutes INTEGER NOT NULL,
                    is_locked_to_due_date INTEGER NOT NULL DEFAULT 0,
                    custom_plan TEXT NOT NULL DEFAULT '[]',
                    recurrence TEXT,
                    completed_occurrences INTEGER NOT NULL DEFAULT 0,
                    is_completed INTEGER NOT NULL DEFAULT 0
                );
                CREATE TABLE IF NOT EXISTS scheduled_sessions (
                    id TEXT PRIMARY KEY,
                    assignment_id TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    end_time TEXT NOT NULL,
                    session_json TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_sessions_start
                    ON scheduled_sessions(start_time);
                CREATE TABLE IF NOT EXISTS reschedule_history (
                    id TEXT PRIMARY KEY,
                    scheduled_session_id TEXT NOT NULL,
                    assignment_id TEXT NOT NULL,
                    strategy TEXT NOT NULL,
                    old_start TEXT NOT NULL,
                    old_end TEXT NOT NULL,
                    new_start TEXT,
                    new_end TEXT,
                    occurred_at TEXT NOT NULL
                );
                DELETE FROM schema_version;
                INSERT INTO schema_version (version) VALUES (1);
                COMMIT;
            "})
            .map_err(|e| RepositoryError::MigrationFailed(e.to_string()))
    }

    // === Assignments ===

    pub fn upsert_assignment(&self, assignment: &Assignment) -> Result<(), RepositoryError> {
        let custom_plan = serde_json::to_string(&assignment.custom_plan)
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
        let recurrence = assignment
            .recurrence
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        self.conn.execute(
            indoc! {"
                INSERT INTO assignments (
                    id, title, category, urgency, due_date, due_time_minutes,
                    estimated_minutes, is_locked_to_due_date, custom_plan,
                    recurrence, completed_occurrences, is_completed
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    category = excluded.category,
                    urgency = excluded.urgency,
                    due_date = excluded.due_date,
                    due_time_minutes = excluded.due_time_minutes,
                    estimated_minutes = excluded.estimated_minutes,
                    is_locked_to_due_date = excluded.is_locked_to_due_date,
                    custom_plan = excluded.custom_plan,
                    recurrence = excluded.recurrence,
                    completed_occurrences = excluded.completed_occurrences,
                    is_completed = excluded.is_completed
            "},
            params![
                assignment.id.to_string(),
                assignment.title,
                format_category(assignment.category),
                format_urgency(assignment.urgency),
                assignment.due_date.format("%Y-%m-%d").to_string(),
                assignment.due_time_minutes,
                assignment.estimated_minutes,
                assignment.is_locked_to_due_date,
                custom_plan,
                recurrence,
                assignment.completed_occurrences,
                assignment.is_completed,
            ],
        )?;
        Ok(())
    }

    pub fn get_assignment(&self, id: Uuid) -> Result<Assignment, RepositoryError> {
        let row = self
            .conn
            .query_row(
                indoc! {"
                    SELECT id, title, category, urgency, due_date, due_time_minutes,
                           estimated_minutes, is_locked_to_due_date, custom_plan,
                           recurrence, completed_occurrences, is_completed
                    FROM assignments WHERE id = ?1
                "},
                params![id.to_string()],
                row_to_assignment_row,
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound(format!("assignment {id}")))?;
        assignment_from_row(row)
    }

    /// All assignments, ordered by due date then id.
    pub fn list_assignments(&self) -> Result<Vec<Assignment>, RepositoryError> {
        let mut stmt = self.conn.prepare(indoc! {"
            SELECT id, title, category, urgency, due_date, due_time_minutes,
                   estimated_minutes, is_locked_to_due_date, custom_plan,
                   recurrence, completed_occurrences, is_completed
            FROM assignments ORDER BY due_date, id
        "})?;
        let rows = stmt.query_map([], row_to_assignment_row)?;
        let mut assignments = Vec::new();
        for row in rows {
            assignments.push(assignment_from_row(row?)?);
        }
        Ok(assignments)
    }

    pub fn delete_assignment(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.conn.execute(
            "DELETE FROM assignments WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    // === Scheduled sessions ===

    /// Replace the stored schedule wholesale, atomically.
    pub fn replace_schedule(&mut self, schedule: &[ScheduledSession]) -> Result<(), RepositoryError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM scheduled_sessions", [])?;
        for block in schedule {
            let json = serde_json::to_string(block)
                .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
            tx.execute(
                indoc! {"
                    INSERT INTO scheduled_sessions (id, assignment_id, start_time, end_time, session_json)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                "},
                params![
                    block.id.to_string(),
                    block.session.assignment_id.to_string(),
                    block.start.to_rfc3339(),
                    block.end.to_rfc3339(),
                    json,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// The stored schedule, ordered by start time.
    pub fn list_schedule(&self) -> Result<Vec<ScheduledSession>, RepositoryError> {
        let mut stmt = self
            .conn
            .prepare("SELECT session_json FROM scheduled_sessions ORDER BY start_time, id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut schedule = Vec::new();
        for row in rows {
            schedule.push(json_column(&row?)?);
        }
        Ok(schedule)
    }

    /// Persist changes to one stored block.
    pub fn update_scheduled_session(
        &self,
        block: &ScheduledSession,
    ) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(block)
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
        let changed = self.conn.execute(
            indoc! {"
                UPDATE scheduled_sessions
                SET assignment_id = ?2, start_time = ?3, end_time = ?4, session_json = ?5
                WHERE id = ?1
            "},
            params![
                block.id.to_string(),
                block.session.assignment_id.to_string(),
                block.start.to_rfc3339(),
                block.end.to_rfc3339(),
                json,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!(
                "scheduled session {}",
                block.id
            )));
        }
        Ok(())
    }

    // === Reschedule history (append-only) ===

    pub fn append_reschedule_records(
        &self,
        records: &[RescheduleRecord],
    ) -> Result<(), RepositoryError> {
        for record in records {
            self.conn.execute(
                indoc! {"
                    INSERT INTO reschedule_history (
                        id, scheduled_session_id, assignment_id, strategy,
                        old_start, old_end, new_start, new_end, occurred_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "},
                params![
                    record.id.to_string(),
                    record.scheduled_session_id.to_string(),
                    record.assignment_id.to_string(),
                    format_strategy(record.strategy),
                    record.old_start.to_rfc3339(),
                    record.old_end.to_rfc3339(),
                    record.new_start.map(|t| t.to_rfc3339()),
                    record.new_end.map(|t| t.to_rfc3339()),
                    record.occurred_at.to_rfc3339(),
                ],
            )?;
        }
        Ok(())
    }

    /// Full history, oldest first.
    pub fn list_reschedule_history(&self) -> Result<Vec<RescheduleRecord>, RepositoryError> {
        let mut stmt = self.conn.prepare(indoc! {"
            SELECT id, scheduled_session_id, assignment_id, strategy,
                   old_start, old_end, new_start, new_end, occurred_at
            FROM reschedule_history ORDER BY occurred_at, id
        "})?;
        let rows = stmt.query_map([], |row| {
            Ok(HistoryRow {
                id: row.get(0)?,
                scheduled_session_id: row.get(1)?,
                assignment_id: row.get(2)?,
                strategy: row.get(3)?,
                old_start: row.get(4)?,
                old_end: row.get(5)?,
                new_start: row.get(6)?,
                new_end: row.get(7)?,
                occurred_at: row.get(8)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            let row = row?;
            records.push(RescheduleRecord {
                id: parse_uuid(&row.id)?,
                scheduled_session_id: parse_uuid(&row.scheduled_session_id)?,
                assignment_id: parse_uuid(&row.assignment_id)?,
                strategy: parse_strategy(&row.strategy),
                old_start: parse_datetime(&row.old_start)?,
                old_end: parse_datetime(&row.old_end)?,
                new_start: row.new_start.as_deref().map(parse_datetime).transpose()?,
                new_end: row.new_end.as_deref().map(parse_datetime).transpose()?,
                occurred_at: parse_datetime(&row.occurred_at)?,
            });
        }
        Ok(records)
    }
}

fn row_to_assignment_row(row: &rusqlite::Row) -> Result<AssignmentRow, rusqlite::Error> {
    Ok(AssignmentRow {
        id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
        urgency: row.get(3)?,
        due_date: row.get(4)?,
        due_time_minutes: row.get(5)?,
        estimated_minutes: row.get(6)?,
        is_locked_to_due_date: row.get(7)?,
        custom_plan: row.get(8)?,
        recurrence: row.get(9)?,
        completed_occurrences: row.get(10)?,
        is_completed: row.get(11)?,
    })
}

fn assignment_from_row(row: AssignmentRow) -> Result<Assignment, RepositoryError> {
    Ok(Assignment {
        id: parse_uuid(&row.id)?,
        title: row.title,
        category: parse_category(&row.category),
        urgency: parse_urgency(&row.urgency),
        due_date: parse_date(&row.due_date)?,
        due_time_minutes: row.due_time_minutes,
        estimated_minutes: row.estimated_minutes,
        is_locked_to_due_date: row.is_locked_to_due_date,
        custom_plan: json_column(&row.custom_plan)?,
        recurrence: row.recurrence.as_deref().map(json_column).transpose()?,
        completed_occurrences: row.completed_occurrences,
        is_completed: row.is_completed,
    })
}

/// The default database file path.
pub fn default_db_path() -> std::io::Result<PathBuf> {
    Ok(data_dir()?.join("planner.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::PlanStepStub;
    use crate::recurrence::{EndCondition, Frequency, RecurrenceRule, SkipPolicy};
    use crate::session::PlannerSession;
    use chrono::{Duration, TimeZone};

    fn open_temp() -> (tempfile::TempDir, PlannerDb) {
        let dir = tempfile::tempdir().unwrap();
        let db = PlannerDb::open(&dir.path().join("planner.db")).unwrap();
        (dir, db)
    }

    fn sample_assignment() -> Assignment {
        let mut a = Assignment::new(
            "History Essay",
            AssignmentCategory::Project,
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            300,
        );
        a.urgency = AssignmentUrgency::High;
        a.due_time_minutes = Some(17 * 60);
        a.custom_plan = vec![PlanStepStub::new("Outline", 60), PlanStepStub::new("Draft", 180)];
        a.recurrence = Some(RecurrenceRule {
            frequency: Frequency::Weekly,
            interval: 1,
            end: EndCondition::AfterOccurrences(5),
            skip: SkipPolicy::default(),
        });
        a
    }

    fn sample_block(start_hour: u32) -> ScheduledSession {
        let start = Utc.with_ymd_and_hms(2025, 11, 10, start_hour, 0, 0).unwrap();
        ScheduledSession {
            id: Uuid::new_v4(),
            session: PlannerSession {
                id: Uuid::new_v4(),
                assignment_id: Uuid::new_v4(),
                plan_step_id: None,
                session_index: 0,
                session_count: 1,
                title: "Draft essay".to_string(),
                category: AssignmentCategory::Project,
                due: start + Duration::days(5),
                estimated_minutes: 60,
                importance: 0.7,
                difficulty: 0.8,
                is_locked_to_due_date: false,
            },
            start,
            end: start + Duration::minutes(60),
            is_locked: false,
            is_user_edited: false,
            user_edited_at: None,
            reschedule_count: 0,
            is_completed: false,
            annotation: None,
        }
    }

    #[test]
    fn assignment_round_trip_preserves_nested_structures() {
        let (_dir, db) = open_temp();
        let assignment = sample_assignment();
        db.upsert_assignment(&assignment).unwrap();

        let loaded = db.get_assignment(assignment.id).unwrap();
        assert_eq!(loaded.title, assignment.title);
        assert_eq!(loaded.category, assignment.category);
        assert_eq!(loaded.due_time_minutes, Some(17 * 60));
        assert_eq!(loaded.custom_plan.len(), 2);
        assert_eq!(loaded.custom_plan[1].expected_minutes, 180);
        assert_eq!(loaded.recurrence, assignment.recurrence);
    }

    #[test]
    fn upsert_overwrites_existing_assignment() {
        let (_dir, db) = open_temp();
        let mut assignment = sample_assignment();
        db.upsert_assignment(&assignment).unwrap();

        assignment.title = "History Essay (revised)".to_string();
        assignment.is_completed = true;
        db.upsert_assignment(&assignment).unwrap();

        let loaded = db.get_assignment(assignment.id).unwrap();
        assert_eq!(loaded.title, "History Essay (revised)");
        assert!(loaded.is_completed);
        assert_eq!(db.list_assignments().unwrap().len(), 1);
    }

    #[test]
    fn missing_assignment_is_not_found() {
        let (_dir, db) = open_temp();
        let err = db.get_assignment(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn schedule_replacement_is_wholesale() {
        let (_dir, mut db) = open_temp();
        db.replace_schedule(&[sample_block(9), sample_block(14)]).unwrap();
        assert_eq!(db.list_schedule().unwrap().len(), 2);

        let replacement = sample_block(11);
        db.replace_schedule(std::slice::from_ref(&replacement)).unwrap();
        let loaded = db.list_schedule().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, replacement.id);
        assert_eq!(loaded[0].session.title, "Draft essay");
    }

    #[test]
    fn scheduled_session_update_round_trips() {
        let (_dir, mut db) = open_temp();
        let mut block = sample_block(9);
        db.replace_schedule(std::slice::from_ref(&block)).unwrap();

        block.is_user_edited = true;
        block.user_edited_at = Some(block.start);
        block.start += Duration::hours(2);
        block.end += Duration::hours(2);
        db.update_scheduled_session(&block).unwrap();

        let loaded = db.list_schedule().unwrap();
        assert!(loaded[0].is_user_edited);
        assert_eq!(loaded[0].start, block.start);
    }

    #[test]
    fn updating_unknown_session_is_not_found() {
        let (_dir, db) = open_temp();
        let err = db.update_scheduled_session(&sample_block(9)).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn history_accumulates_across_appends() {
        let (_dir, db) = open_temp();
        let now = Utc.with_ymd_and_hms(2025, 11, 10, 12, 0, 0).unwrap();
        let record = |occurred_at| RescheduleRecord {
            id: Uuid::new_v4(),
            scheduled_session_id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            strategy: RescheduleStrategy::SameDaySlot,
            old_start: now - Duration::hours(3),
            old_end: now - Duration::hours(2),
            new_start: Some(now + Duration::hours(1)),
            new_end: Some(now + Duration::hours(2)),
            occurred_at,
        };

        db.append_reschedule_records(&[record(now)]).unwrap();
        db.append_reschedule_records(&[record(now + Duration::minutes(30))])
            .unwrap();

        let history = db.list_reschedule_history().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].occurred_at <= history[1].occurred_at);
        assert_eq!(history[0].strategy, RescheduleStrategy::SameDaySlot);
    }

    #[test]
    fn reopening_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.db");
        let assignment = sample_assignment();
        {
            let db = PlannerDb::open(&path).unwrap();
            db.upsert_assignment(&assignment).unwrap();
        }
        let db = PlannerDb::open(&path).unwrap();
        assert_eq!(db.get_assignment(assignment.id).unwrap().title, assignment.title);
    }
}
