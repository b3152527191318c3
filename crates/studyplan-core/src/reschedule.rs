//! Automatic rescheduling of missed study blocks.
//!
//! When a block's end time passes without completion, the rescheduler
//! tries a ladder of strategies: a later free slot the same day, then
//! displacing a lower-priority block, then the next day, and finally
//! overflow. The whole run is gated on the enabled flag (a disabled run
//! has zero side effects) and on an in-flight guard so concurrent
//! triggers cannot double-move blocks.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduler::{Interval, ScheduledSession, SLOT_MINUTES};

/// Free margin inserted ahead of any rescheduled block.
pub const PUSH_BUFFER_MINUTES: i64 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleSettings {
    /// Master switch. When false a trigger returns immediately.
    pub enabled: bool,
    /// A block pushed this many times overflows instead of moving
    /// again; also caps how many blocks one insertion may displace.
    pub max_push_count: u32,
    /// Allow displacing lower-priority blocks to make room.
    pub push_lower_priority: bool,
    /// Hour placement opens on a following day, local time.
    pub day_start_hour: u32,
    /// Hour after which nothing is placed on the same day, local time.
    pub day_end_hour: u32,
}

impl Default for RescheduleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_push_count: 3,
            push_lower_priority: true,
            day_start_hour: 9,
            day_end_hour: 21,
        }
    }
}

/// How a block was moved, in the order strategies are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleStrategy {
    /// Free slot later the same day.
    SameDaySlot,
    /// Took the slot of a displaced lower-priority block.
    SameDayPushed,
    /// First free slot the following day.
    NextDay,
    /// No placement found; the block left the schedule.
    Overflow,
}

/// One append-only history entry. New starts are absent for overflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleRecord {
    pub id: Uuid,
    pub scheduled_session_id: Uuid,
    pub assignment_id: Uuid,
    pub strategy: RescheduleStrategy,
    pub old_start: DateTime<Utc>,
    pub old_end: DateTime<Utc>,
    pub new_start: Option<DateTime<Utc>>,
    pub new_end: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RescheduleReport {
    pub records: Vec<RescheduleRecord>,
    /// Scheduled-session ids that fell off the calendar entirely.
    pub overflowed: Vec<Uuid>,
}

impl RescheduleReport {
    pub fn moved_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.strategy != RescheduleStrategy::Overflow)
            .count()
    }

    /// One-line summary suitable for a notification.
    pub fn summary(&self) -> String {
        let moved = self.moved_count();
        let overflowed = self.overflowed.len();
        match (moved, overflowed) {
            (0, 0) => "Nothing needed rescheduling".to_string(),
            (m, 0) => format!("Rescheduled {} study block{}", m, plural(m)),
            (0, o) => format!(
                "{} study block{} could not be rescheduled",
                o,
                plural(o)
            ),
            (m, o) => format!(
                "Rescheduled {} study block{}, {} overflowed",
                m,
                plural(m),
                o
            ),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RescheduleOutcome {
    /// Rescheduling is switched off; the schedule was not touched.
    Disabled,
    /// Another trigger is still running; this one did nothing.
    AlreadyRunning,
    Completed(RescheduleReport),
}

/// Moves missed blocks to new slots. One instance per schedule; the
/// in-flight flag serializes overlapping triggers.
pub struct AutoRescheduler {
    settings: RescheduleSettings,
    offset: FixedOffset,
    in_flight: AtomicBool,
}

impl AutoRescheduler {
    pub fn new(settings: RescheduleSettings, offset: FixedOffset) -> Self {
        Self {
            settings,
            offset,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &RescheduleSettings {
        &self.settings
    }

    /// Reschedule every missed block in `schedule`. Busy intervals are
    /// external calendar events placement must avoid.
    pub fn trigger(
        &self,
        schedule: &mut Vec<ScheduledSession>,
        busy: &[Interval],
        now: DateTime<Utc>,
    ) -> RescheduleOutcome {
        if !self.settings.enabled {
            return RescheduleOutcome::Disabled;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return RescheduleOutcome::AlreadyRunning;
        }
        let report = self.run(schedule, busy, now);
        self.in_flight.store(false, Ordering::Release);
        RescheduleOutcome::Completed(report)
    }

    fn run(
        &self,
        schedule: &mut Vec<ScheduledSession>,
        busy: &[Interval],
        now: DateTime<Utc>,
    ) -> RescheduleReport {
        let mut report = RescheduleReport::default();

        // Highest schedule index first, so exams and near-due work claim
        // the scarce same-day slots before lighter categories.
        let mut missed: Vec<(f64, DateTime<Utc>, Uuid)> = schedule
            .iter()
            .filter(|b| is_movable(b) && b.end <= now)
            .map(|b| (b.session.schedule_index(now), b.start, b.id))
            .collect();
        missed.sort_by(|a, b| {
            b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2))
        });

        for (_, _, id) in missed {
            self.reschedule_one(id, schedule, busy, now, &mut report);
        }
        report
    }

    fn reschedule_one(
        &self,
        id: Uuid,
        schedule: &mut Vec<ScheduledSession>,
        busy: &[Interval],
        now: DateTime<Utc>,
        report: &mut RescheduleReport,
    ) {
        let Some(idx) = schedule.iter().position(|b| b.id == id) else {
            return;
        };
        let old_start = schedule[idx].start;
        let old_end = schedule[idx].end;
        let duration = Duration::minutes(schedule[idx].duration_minutes());

        if schedule[idx].reschedule_count >= self.settings.max_push_count {
            self.overflow(idx, schedule, report, now);
            return;
        }

        let earliest = round_up_to_slot(now + Duration::minutes(PUSH_BUFFER_MINUTES));
        let occupied = occupied_for(schedule, id, busy);

        // Strategy 1: free slot later today.
        if let Some(start) = self.free_slot_in(
            earliest,
            self.local_day_end(now),
            duration,
            schedule[idx].session.due,
            &occupied,
        ) {
            self.apply_move(idx, schedule, start, duration, RescheduleStrategy::SameDaySlot, old_start, old_end, report, now);
            return;
        }

        // Strategy 2: displace lower-priority blocks later today. Each
        // displaced block is re-placed after the inserted one with a
        // 15-minute buffer, spilling to the next day only when the rest
        // of today has no room.
        if self.settings.push_lower_priority {
            if let Some((start, victims)) = self.plan_push(idx, schedule, duration, busy, now) {
                self.apply_move(idx, schedule, start, duration, RescheduleStrategy::SameDayPushed, old_start, old_end, report, now);
                let pushed_to = round_up_to_slot(
                    start + duration + Duration::minutes(PUSH_BUFFER_MINUTES),
                );
                for victim_id in victims {
                    self.replace_victim(victim_id, pushed_to, schedule, busy, now, report);
                }
                return;
            }
        }

        // Strategy 3: next day.
        let (next_start, next_end) = self.next_day_window(now);
        if let Some(start) = self.free_slot_in(
            next_start,
            next_end,
            duration,
            schedule[idx].session.due,
            &occupied,
        ) {
            self.apply_move(idx, schedule, start, duration, RescheduleStrategy::NextDay, old_start, old_end, report, now);
            return;
        }

        // Strategy 4: overflow.
        self.overflow(idx, schedule, report, now);
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_move(
        &self,
        idx: usize,
        schedule: &mut [ScheduledSession],
        start: DateTime<Utc>,
        duration: Duration,
        strategy: RescheduleStrategy,
        old_start: DateTime<Utc>,
        old_end: DateTime<Utc>,
        report: &mut RescheduleReport,
        now: DateTime<Utc>,
    ) {
        let block = &mut schedule[idx];
        block.start = start;
        block.end = start + duration;
        block.reschedule_count += 1;
        report.records.push(RescheduleRecord {
            id: Uuid::new_v4(),
            scheduled_session_id: block.id,
            assignment_id: block.session.assignment_id,
            strategy,
            old_start,
            old_end,
            new_start: Some(block.start),
            new_end: Some(block.end),
            occurred_at: now,
        });
    }

    fn overflow(
        &self,
        idx: usize,
        schedule: &mut Vec<ScheduledSession>,
        report: &mut RescheduleReport,
        now: DateTime<Utc>,
    ) {
        let block = schedule.remove(idx);
        report.overflowed.push(block.id);
        report.records.push(RescheduleRecord {
            id: Uuid::new_v4(),
            scheduled_session_id: block.id,
            assignment_id: block.session.assignment_id,
            strategy: RescheduleStrategy::Overflow,
            old_start: block.start,
            old_end: block.end,
            new_start: None,
            new_end: None,
            occurred_at: now,
        });
    }

    /// Insertion start for the missed block and the ids of the blocks it
    /// displaces. Candidate starts are the slots held by movable
    /// lower-priority blocks later today; a start qualifies only when
    /// everything the inserted interval overlaps is itself displaceable
    /// and at most `max_push_count` blocks are displaced. The candidate
    /// holding the lowest-priority work wins.
    fn plan_push(
        &self,
        missed_idx: usize,
        schedule: &[ScheduledSession],
        needed: Duration,
        busy: &[Interval],
        now: DateTime<Utc>,
    ) -> Option<(DateTime<Utc>, Vec<Uuid>)> {
        let missed = &schedule[missed_idx];
        let missed_score = missed.session.schedule_index(now);
        let day_end = self.local_day_end(now);

        let displaceable = |b: &ScheduledSession| {
            b.id != missed.id
                && is_movable(b)
                && b.start > now
                && b.session.schedule_index(now) < missed_score
        };

        let mut candidates: Vec<(f64, DateTime<Utc>)> = schedule
            .iter()
            .filter(|b| {
                displaceable(b)
                    && b.start + needed <= day_end
                    && b.start + needed <= missed.session.due
            })
            .map(|b| (b.session.schedule_index(now), b.start))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for (_, start) in candidates {
            let inserted = Interval::new(start, start + needed);
            if busy.iter().any(|b| inserted.overlaps(b)) {
                continue;
            }
            let overlapped: Vec<&ScheduledSession> = schedule
                .iter()
                .filter(|b| b.id != missed.id && b.interval().overlaps(&inserted))
                .collect();
            if overlapped.len() > self.settings.max_push_count as usize
                || !overlapped.iter().all(|b| displaceable(b))
            {
                continue;
            }
            let mut victims: Vec<(DateTime<Utc>, Uuid)> =
                overlapped.iter().map(|b| (b.start, b.id)).collect();
            victims.sort();
            return Some((start, victims.into_iter().map(|(_, id)| id).collect()));
        }
        None
    }

    /// Re-place a displaced block, starting no earlier than `pushed_to`
    /// the same day, then the next day, then overflow.
    fn replace_victim(
        &self,
        victim_id: Uuid,
        pushed_to: DateTime<Utc>,
        schedule: &mut Vec<ScheduledSession>,
        busy: &[Interval],
        now: DateTime<Utc>,
        report: &mut RescheduleReport,
    ) {
        let Some(victim_idx) = schedule.iter().position(|b| b.id == victim_id) else {
            return;
        };
        if schedule[victim_idx].reschedule_count >= self.settings.max_push_count {
            self.overflow(victim_idx, schedule, report, now);
            return;
        }
        let old_start = schedule[victim_idx].start;
        let old_end = schedule[victim_idx].end;
        let duration = Duration::minutes(schedule[victim_idx].duration_minutes());
        let due = schedule[victim_idx].session.due;
        let occupied = occupied_for(schedule, victim_id, busy);

        if let Some(s) =
            self.free_slot_in(pushed_to, self.local_day_end(now), duration, due, &occupied)
        {
            self.apply_move(victim_idx, schedule, s, duration, RescheduleStrategy::SameDaySlot, old_start, old_end, report, now);
            return;
        }
        let (next_start, next_end) = self.next_day_window(now);
        match self.free_slot_in(next_start, next_end, duration, due, &occupied) {
            Some(s) => self.apply_move(victim_idx, schedule, s, duration, RescheduleStrategy::NextDay, old_start, old_end, report, now),
            None => self.overflow(victim_idx, schedule, report, now),
        }
    }

    /// Earliest 15-minute-aligned start in `[from, until)` whose block
    /// avoids every occupied interval and ends by `due`.
    fn free_slot_in(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        duration: Duration,
        due: DateTime<Utc>,
        occupied: &[Interval],
    ) -> Option<DateTime<Utc>> {
        let mut start = round_up_to_slot(from);
        while start + duration <= until {
            let end = start + duration;
            if end > due {
                return None;
            }
            let candidate = Interval::new(start, end);
            if !occupied.iter().any(|o| candidate.overlaps(o)) {
                return Some(start);
            }
            start += Duration::minutes(SLOT_MINUTES);
        }
        None
    }

    fn local_day_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.offset).date_naive();
        let end = local
            .and_hms_opt(self.settings.day_end_hour, 0, 0)
            .unwrap_or_else(|| local.and_hms_opt(23, 59, 59).unwrap());
        self.offset
            .from_local_datetime(&end)
            .single()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(now)
    }

    fn next_day_window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let tomorrow = now.with_timezone(&self.offset).date_naive() + chrono::Days::new(1);
        let start = tomorrow
            .and_hms_opt(self.settings.day_start_hour, 0, 0)
            .unwrap_or_else(|| tomorrow.and_hms_opt(0, 0, 0).unwrap());
        let end = tomorrow
            .and_hms_opt(self.settings.day_end_hour, 0, 0)
            .unwrap_or_else(|| tomorrow.and_hms_opt(23, 59, 59).unwrap());
        let to_utc = |naive| {
            self.offset
                .from_local_datetime(&naive)
                .single()
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or(now)
        };
        (to_utc(start), to_utc(end))
    }
}

fn is_movable(block: &ScheduledSession) -> bool {
    !block.is_completed && !block.is_locked && !block.is_user_edited
}

fn occupied_for(schedule: &[ScheduledSession], moving: Uuid, busy: &[Interval]) -> Vec<Interval> {
    let mut occupied: Vec<Interval> = schedule
        .iter()
        .filter(|b| b.id != moving)
        .map(|b| b.interval())
        .collect();
    occupied.extend_from_slice(busy);
    occupied
}

fn round_up_to_slot(t: DateTime<Utc>) -> DateTime<Utc> {
    let slot = SLOT_MINUTES * 60;
    let seconds = t.timestamp();
    let rounded = seconds.div_euclid(slot) * slot;
    let rounded = if rounded < seconds { rounded + slot } else { rounded };
    Utc.timestamp_opt(rounded, 0).single().unwrap_or(t)
}
