//! Assignment management commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use studyplan_core::{Assignment, AssignmentCategory, AssignmentUrgency, PlannerDb};

use super::{parse_id, CliResult};

#[derive(Subcommand)]
pub enum AssignmentAction {
    /// Add a new assignment
    Add {
        /// Assignment title
        title: String,
        /// Category: exam, quiz, homework, reading, review, project
        #[arg(long, default_value = "homework")]
        category: String,
        /// Urgency: low, medium, high, critical
        #[arg(long, default_value = "medium")]
        urgency: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: String,
        /// Due time (HH:MM), defaults to end of day
        #[arg(long)]
        due_time: Option<String>,
        /// Estimated effort in minutes
        #[arg(long)]
        minutes: u32,
        /// Never move sessions off the due day
        #[arg(long)]
        locked: bool,
    },
    /// List assignments
    List {
        /// Include completed assignments
        #[arg(long)]
        all: bool,
    },
    /// Get assignment details
    Get {
        /// Assignment ID
        id: String,
    },
    /// Mark an assignment completed
    Complete {
        /// Assignment ID
        id: String,
    },
    /// Delete an assignment
    Delete {
        /// Assignment ID
        id: String,
    },
}

fn parse_category(raw: &str) -> Result<AssignmentCategory, Box<dyn std::error::Error>> {
    Ok(match raw {
        "exam" => AssignmentCategory::Exam,
        "quiz" => AssignmentCategory::Quiz,
        "homework" => AssignmentCategory::Homework,
        "reading" => AssignmentCategory::Reading,
        "review" => AssignmentCategory::Review,
        "project" => AssignmentCategory::Project,
        other => return Err(format!("unknown category: {other}").into()),
    })
}

fn parse_urgency(raw: &str) -> Result<AssignmentUrgency, Box<dyn std::error::Error>> {
    Ok(match raw {
        "low" => AssignmentUrgency::Low,
        "medium" => AssignmentUrgency::Medium,
        "high" => AssignmentUrgency::High,
        "critical" => AssignmentUrgency::Critical,
        other => return Err(format!("unknown urgency: {other}").into()),
    })
}

fn parse_due_time(raw: &str) -> Result<u32, Box<dyn std::error::Error>> {
    let (hours, minutes) = raw
        .split_once(':')
        .ok_or_else(|| format!("bad time '{raw}', expected HH:MM"))?;
    let hours: u32 = hours.parse()?;
    let minutes: u32 = minutes.parse()?;
    if hours > 23 || minutes > 59 {
        return Err(format!("bad time '{raw}'").into());
    }
    Ok(hours * 60 + minutes)
}

pub fn run(action: AssignmentAction) -> CliResult {
    let db = PlannerDb::open_default()?;

    match action {
        AssignmentAction::Add {
            title,
            category,
            urgency,
            due,
            due_time,
            minutes,
            locked,
        } => {
            let due_date = NaiveDate::parse_from_str(&due, "%Y-%m-%d")?;
            let mut assignment =
                Assignment::new(title, parse_category(&category)?, due_date, minutes);
            assignment.urgency = parse_urgency(&urgency)?;
            assignment.due_time_minutes = due_time.as_deref().map(parse_due_time).transpose()?;
            assignment.is_locked_to_due_date = locked;

            db.upsert_assignment(&assignment)?;
            println!("Assignment created: {}", assignment.id);
            println!("{}", serde_json::to_string_pretty(&assignment)?);
        }
        AssignmentAction::List { all } => {
            let assignments: Vec<_> = db
                .list_assignments()?
                .into_iter()
                .filter(|a| all || !a.is_completed)
                .collect();
            println!("{}", serde_json::to_string_pretty(&assignments)?);
        }
        AssignmentAction::Get { id } => {
            let assignment = db.get_assignment(parse_id(&id)?)?;
            println!("{}", serde_json::to_string_pretty(&assignment)?);
        }
        AssignmentAction::Complete { id } => {
            let mut assignment = db.get_assignment(parse_id(&id)?)?;
            assignment.is_completed = true;
            if assignment.recurrence.is_some() {
                assignment.completed_occurrences += 1;
            }
            db.upsert_assignment(&assignment)?;
            println!("Assignment completed: {}", assignment.id);
        }
        AssignmentAction::Delete { id } => {
            db.delete_assignment(parse_id(&id)?)?;
            println!("ok");
        }
    }
    Ok(())
}
