//! Deterministic calendar placement.
//!
//! Sessions are ranked by schedule index and packed into 15-minute slots
//! inside the configured day window, earliest feasible slot first. The
//! same inputs always produce the same placement: every tie in the sort
//! order is broken by stable fields (due date, assignment id, session
//! index) and the slot scan itself is exhaustive and ordered.

pub mod priority;

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotate::AiAnnotation;
use crate::session::PlannerSession;

/// Slot granularity in minutes. Placement starts and durations are
/// aligned to this grid.
pub const SLOT_MINUTES: i64 = 15;

/// Difficulty at or above which slots are chosen by energy, not just
/// earliest-first.
pub const ENERGY_PREFERENCE_THRESHOLD: f64 = 0.7;

/// Placement policy knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// First hour of the scheduling window, local time.
    pub day_start_hour: u32,
    /// Hour the window closes, local time. Sessions must end by it.
    pub day_end_hour: u32,
    /// Cap on scheduled study minutes per local day.
    pub max_minutes_per_day: u32,
    /// Sessions longer than this are split into consecutive blocks.
    pub max_block_minutes: u32,
    /// Shortest block the splitter will emit.
    pub min_block_minutes: u32,
    /// Free margin enforced around blocks this scheduler places.
    pub min_gap_minutes: u32,
    /// How many days ahead placement will look.
    pub horizon_days: u32,
    /// Recurring daily windows placement must stay out of.
    #[serde(default)]
    pub do_not_schedule: Vec<DoNotScheduleWindow>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            day_start_hour: 9,
            day_end_hour: 21,
            max_minutes_per_day: 360,
            max_block_minutes: 120,
            min_block_minutes: 15,
            min_gap_minutes: 15,
            horizon_days: 14,
            do_not_schedule: Vec::new(),
        }
    }
}

/// A daily window placement must avoid, in local minutes since
/// midnight. Applies every day inside the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoNotScheduleWindow {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl DoNotScheduleWindow {
    pub fn new(start_minute: u32, end_minute: u32) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }
}

/// Hourly energy curve used to bias hard sessions toward peak hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyProfile {
    /// One value in [0, 1] per local hour.
    pub hourly: [f64; 24],
}

impl EnergyProfile {
    /// The neutral profile: every hour scores 0.5, so energy never
    /// changes slot choice.
    pub fn flat() -> Self {
        Self { hourly: [0.5; 24] }
    }

    pub fn energy_at(&self, hour: u32) -> f64 {
        self.hourly[(hour % 24) as usize].clamp(0.0, 1.0)
    }
}

impl Default for EnergyProfile {
    fn default() -> Self {
        Self::flat()
    }
}

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// A session placed on the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSession {
    pub id: Uuid,
    pub session: PlannerSession,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Locked sessions are never moved by rescheduling.
    pub is_locked: bool,
    /// Set when a user moved this block by hand; rescheduling skips it.
    pub is_user_edited: bool,
    pub user_edited_at: Option<DateTime<Utc>>,
    /// How many times automatic rescheduling has pushed this block.
    pub reschedule_count: u32,
    pub is_completed: bool,
    pub annotation: Option<AiAnnotation>,
}

impl ScheduledSession {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Why a session could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowReason {
    /// No free slot ends before the session's due date.
    DueDateUnreachable,
    /// Every day inside the horizon is full.
    HorizonExhausted,
}

/// A session the scheduler could not place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverflowedSession {
    pub session: PlannerSession,
    pub reason: OverflowReason,
}

/// Output of one scheduling run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub scheduled: Vec<ScheduledSession>,
    pub overflow: Vec<OverflowedSession>,
}

/// Deterministic slot-packing scheduler.
pub struct Scheduler {
    settings: SchedulerSettings,
    energy: EnergyProfile,
    /// Offset in which day windows and day caps are interpreted.
    offset: FixedOffset,
}

impl Scheduler {
    pub fn new(settings: SchedulerSettings, energy: EnergyProfile, offset: FixedOffset) -> Self {
        Self {
            settings,
            energy,
            offset,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            SchedulerSettings::default(),
            EnergyProfile::flat(),
            FixedOffset::east_opt(0).expect("zero offset is valid"),
        )
    }

    /// Place `sessions` around `busy` intervals, starting no earlier
    /// than `now`. Sessions that cannot fit end up in `overflow`.
    pub fn schedule(
        &self,
        sessions: &[PlannerSession],
        busy: &[Interval],
        now: DateTime<Utc>,
    ) -> ScheduleResult {
        let mut ordered: Vec<&PlannerSession> = sessions.iter().collect();
        ordered.sort_by(|a, b| self.placement_order(a, b, now));

        let mut placed: Vec<Interval> = Vec::new();
        let mut used_per_day: HashMap<NaiveDate, u32> = HashMap::new();
        let mut result = ScheduleResult::default();

        for session in ordered {
            let chunks = chunk_durations(
                session.estimated_minutes,
                self.settings.max_block_minutes,
                self.settings.min_block_minutes,
            );

            let mut chunk_intervals = Vec::with_capacity(chunks.len());
            let mut failed: Option<OverflowReason> = None;
            for &minutes in &chunks {
                match self.find_slot(
                    minutes,
                    session,
                    busy,
                    &placed_plus(&placed, &chunk_intervals),
                    &used_with(&used_per_day, &chunk_intervals, self.offset),
                    now,
                ) {
                    Ok(interval) => chunk_intervals.push(interval),
                    Err(reason) => {
                        failed = Some(reason);
                        break;
                    }
                }
            }

            match failed {
                Some(reason) => result.overflow.push(OverflowedSession {
                    session: session.clone(),
                    reason,
                }),
                None => {
                    for interval in chunk_intervals {
                        *used_per_day
                            .entry(local_date(interval.start, self.offset))
                            .or_insert(0) += interval.duration_minutes() as u32;
                        placed.push(interval);
                        result.scheduled.push(ScheduledSession {
                            id: Uuid::new_v4(),
                            session: session.clone(),
                            start: interval.start,
                            end: interval.end,
                            is_locked: session.is_locked_to_due_date,
                            is_user_edited: false,
                            user_edited_at: None,
                            reschedule_count: 0,
                            is_completed: false,
                            annotation: None,
                        });
                    }
                }
            }
        }

        result
            .scheduled
            .sort_by(|a, b| a.start.cmp(&b.start).then(a.session.id.cmp(&b.session.id)));
        result
    }

    fn placement_order(&self, a: &PlannerSession, b: &PlannerSession, now: DateTime<Utc>) -> Ordering {
        b.schedule_index(now)
            .total_cmp(&a.schedule_index(now))
            .then(a.due.cmp(&b.due))
            .then(a.assignment_id.cmp(&b.assignment_id))
            .then(a.session_index.cmp(&b.session_index))
    }

    /// Earliest feasible slot for a block of `minutes`, scanning day by
    /// day inside the horizon. Hard sessions pick the highest-energy
    /// slot on the first day that has any room.
    fn find_slot(
        &self,
        minutes: u32,
        session: &PlannerSession,
        busy: &[Interval],
        placed: &[Interval],
        used_per_day: &HashMap<NaiveDate, u32>,
        now: DateTime<Utc>,
    ) -> Result<Interval, OverflowReason> {
        let duration = Duration::minutes(minutes as i64);
        let start_floor = round_up_to_slot(now);
        let gap = Duration::minutes(self.settings.min_gap_minutes as i64);
        let mut saw_due_cutoff = false;

        for day in 0..self.settings.horizon_days {
            let date = local_date(now, self.offset) + chrono::Days::new(day as u64);
            let Some(window) = self.day_window(date) else {
                continue;
            };

            let day_used = used_per_day.get(&date).copied().unwrap_or(0);
            if day_used + minutes > self.settings.max_minutes_per_day {
                continue;
            }

            let mut candidates: Vec<DateTime<Utc>> = Vec::new();
            let mut start = window.start.max(start_floor);
            start = round_up_to_slot(start);
            while start + duration <= window.end {
                let end = start + duration;
                if end > session.due {
                    saw_due_cutoff = true;
                    break;
                }
                let candidate = Interval::new(start, end);
                let blocked = busy.iter().any(|b| candidate.overlaps(b))
                    || self.in_blocked_window(&candidate, date)
                    || placed.iter().any(|p| {
                        // Margin applies around blocks this run placed.
                        candidate.start < p.end + gap && p.start < candidate.end + gap
                    });
                if !blocked {
                    candidates.push(start);
                }
                start += Duration::minutes(SLOT_MINUTES);
            }

            if candidates.is_empty() {
                continue;
            }

            let chosen = if session.difficulty >= ENERGY_PREFERENCE_THRESHOLD {
                // Highest energy wins; the scan order makes earliest the
                // tiebreak because only strictly better slots replace it.
                let mut best = candidates[0];
                let mut best_energy = self.energy.energy_at(local_hour(best, self.offset));
                for &slot in &candidates[1..] {
                    let e = self.energy.energy_at(local_hour(slot, self.offset));
                    if e > best_energy {
                        best = slot;
                        best_energy = e;
                    }
                }
                best
            } else {
                candidates[0]
            };

            return Ok(Interval::new(chosen, chosen + duration));
        }

        if saw_due_cutoff {
            Err(OverflowReason::DueDateUnreachable)
        } else {
            Err(OverflowReason::HorizonExhausted)
        }
    }

    /// Whether the candidate touches a do-not-schedule window on `date`.
    fn in_blocked_window(&self, candidate: &Interval, date: NaiveDate) -> bool {
        self.settings.do_not_schedule.iter().any(|window| {
            self.window_on(date, window)
                .is_some_and(|blocked| candidate.overlaps(&blocked))
        })
    }

    /// One do-not-schedule window as a concrete UTC interval on `date`.
    fn window_on(&self, date: NaiveDate, window: &DoNotScheduleWindow) -> Option<Interval> {
        if window.end_minute <= window.start_minute {
            return None;
        }
        let midnight = self
            .offset
            .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
            .single()?;
        let start = midnight + Duration::minutes(window.start_minute.min(1440) as i64);
        let end = midnight + Duration::minutes(window.end_minute.min(1440) as i64);
        Some(Interval::new(
            start.with_timezone(&Utc),
            end.with_timezone(&Utc),
        ))
    }

    /// The scheduling window for one local day, in UTC instants.
    fn day_window(&self, date: NaiveDate) -> Option<Interval> {
        let start = date.and_hms_opt(self.settings.day_start_hour, 0, 0)?;
        let end = date.and_hms_opt(self.settings.day_end_hour, 0, 0)?;
        let start = self.offset.from_local_datetime(&start).single()?;
        let end = self.offset.from_local_datetime(&end).single()?;
        Some(Interval::new(
            start.with_timezone(&Utc),
            end.with_timezone(&Utc),
        ))
    }
}

/// Split a duration into blocks of at most `max_block` minutes. The
/// trailing block is kept at `min_block` or longer by borrowing from the
/// block before it.
fn chunk_durations(total: u32, max_block: u32, min_block: u32) -> Vec<u32> {
    // A cap under twice the floor would make some totals unsplittable.
    let max_block = max_block.max(min_block.saturating_mul(2));
    let mut remaining = total.max(min_block);
    let mut chunks = Vec::new();
    while remaining > max_block {
        let take = if remaining - max_block < min_block {
            remaining - min_block
        } else {
            max_block
        };
        chunks.push(take);
        remaining -= take;
    }
    chunks.push(remaining);
    chunks
}

fn round_up_to_slot(t: DateTime<Utc>) -> DateTime<Utc> {
    let seconds = t.timestamp();
    let slot = SLOT_MINUTES * 60;
    let rounded = seconds.div_euclid(slot) * slot;
    let rounded = if rounded < seconds { rounded + slot } else { rounded };
    Utc.timestamp_opt(rounded, 0).single().unwrap_or(t)
}

fn local_date(t: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    t.with_timezone(&offset).date_naive()
}

fn local_hour(t: DateTime<Utc>, offset: FixedOffset) -> u32 {
    t.with_timezone(&offset).hour()
}

fn placed_plus(placed: &[Interval], extra: &[Interval]) -> Vec<Interval> {
    let mut all = placed.to_vec();
    all.extend_from_slice(extra);
    all
}

fn used_with(
    used: &HashMap<NaiveDate, u32>,
    extra: &[Interval],
    offset: FixedOffset,
) -> HashMap<NaiveDate, u32> {
    let mut out = used.clone();
    for interval in extra {
        *out.entry(local_date(interval.start, offset)).or_insert(0) +=
            interval.duration_minutes() as u32;
    }
    out
}
