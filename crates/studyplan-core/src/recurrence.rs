//! Recurrence engine: computes the next occurrence of a recurring
//! assignment when one is completed.
//!
//! All date math runs on `NaiveDate` plus minutes-since-midnight, so the
//! wall-clock time of day survives the transition exactly, including
//! across daylight-saving boundaries. Holiday determination is delegated
//! to a [`HolidayChecker`]; a checker that reports "unavailable" disables
//! holiday adjustment without failing the whole computation.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// How often the assignment repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
}

/// When the recurrence stops producing successors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCondition {
    Never,
    /// Stop once this many occurrences have been completed.
    AfterOccurrences(u32),
    /// Inclusive of the boundary date itself.
    Until(NaiveDate),
}

/// Direction used to move a date off a skipped day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipAdjustment {
    Forward,
    Backward,
}

/// Where holiday data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidaySource {
    None,
    DeviceCalendar,
}

/// Rules for shifting an occurrence off weekends and holidays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipPolicy {
    #[serde(default)]
    pub skip_weekends: bool,
    #[serde(default)]
    pub skip_holidays: bool,
    #[serde(default = "SkipPolicy::default_source")]
    pub holiday_source: HolidaySource,
    #[serde(default = "SkipPolicy::default_adjustment")]
    pub adjustment: SkipAdjustment,
}

impl SkipPolicy {
    fn default_source() -> HolidaySource {
        HolidaySource::None
    }

    fn default_adjustment() -> SkipAdjustment {
        SkipAdjustment::Forward
    }

    pub fn none() -> Self {
        Self {
            skip_weekends: false,
            skip_holidays: false,
            holiday_source: HolidaySource::None,
            adjustment: SkipAdjustment::Forward,
        }
    }

    fn is_active(&self) -> bool {
        self.skip_weekends || self.skip_holidays
    }
}

impl Default for SkipPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// A recurrence rule attached to an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Every `interval` days/weeks. Clamped to at least 1.
    pub interval: u32,
    pub end: EndCondition,
    #[serde(default)]
    pub skip: SkipPolicy,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency, interval: u32) -> Self {
        Self {
            frequency,
            interval: interval.max(1),
            end: EndCondition::Never,
            skip: SkipPolicy::none(),
        }
    }
}

/// Answer from a holiday source for a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidayAnswer {
    Holiday,
    NotHoliday,
    /// The source cannot answer (no access, no data). No adjustment is made.
    Unavailable,
}

/// External holiday source. The engine never reads calendars itself.
pub trait HolidayChecker {
    fn check(&self, date: NaiveDate, source: HolidaySource) -> HolidayAnswer;
}

/// Checker for rules without holiday skipping, and a safe fallback.
pub struct NoHolidays;

impl HolidayChecker for NoHolidays {
    fn check(&self, _date: NaiveDate, _source: HolidaySource) -> HolidayAnswer {
        HolidayAnswer::NotHoliday
    }
}

/// The next due date/time produced from a completed occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextOccurrence {
    pub due_date: NaiveDate,
    /// Preserved exactly from the completed occurrence.
    pub due_time_minutes: Option<u32>,
}

// Upper bound on skip-adjustment steps; covers a year of blocked days.
const MAX_ADJUST_DAYS: u32 = 370;

/// Compute the next occurrence after completing the one due on `due_date`.
///
/// `completed_occurrences` counts occurrences completed so far, including
/// the one just finished. Returns `None` when the rule has ended or the
/// assignment has no due date to advance from.
pub fn next_occurrence(
    rule: &RecurrenceRule,
    due_date: Option<NaiveDate>,
    due_time_minutes: Option<u32>,
    completed_occurrences: u32,
    holidays: &dyn HolidayChecker,
) -> Option<NextOccurrence> {
    let base = due_date?;
    let interval = rule.interval.max(1) as u64;

    let stepped = match rule.frequency {
        Frequency::Daily => base.checked_add_days(Days::new(interval))?,
        Frequency::Weekly => base.checked_add_days(Days::new(interval * 7))?,
    };

    let adjusted = adjust_for_skips(stepped, rule, holidays)?;

    match rule.end {
        EndCondition::Never => {}
        EndCondition::AfterOccurrences(count) => {
            if completed_occurrences >= count {
                return None;
            }
        }
        EndCondition::Until(end_date) => {
            // Inclusive boundary: an occurrence landing on the end date
            // itself is still produced.
            if adjusted > end_date {
                return None;
            }
        }
    }

    Some(NextOccurrence {
        due_date: adjusted,
        due_time_minutes,
    })
}

fn adjust_for_skips(
    date: NaiveDate,
    rule: &RecurrenceRule,
    holidays: &dyn HolidayChecker,
) -> Option<NaiveDate> {
    if !rule.skip.is_active() {
        return Some(date);
    }

    let mut current = date;
    for _ in 0..MAX_ADJUST_DAYS {
        if !is_skipped(current, rule, holidays) {
            return Some(current);
        }
        current = match rule.skip.adjustment {
            SkipAdjustment::Forward => current.checked_add_days(Days::new(1))?,
            SkipAdjustment::Backward => current.checked_sub_days(Days::new(1))?,
        };
    }
    // Every candidate within the bound was blocked; the rule has no
    // valid successor.
    None
}

fn is_skipped(date: NaiveDate, rule: &RecurrenceRule, holidays: &dyn HolidayChecker) -> bool {
    if rule.skip.skip_weekends
        && matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    {
        return true;
    }
    if rule.skip.skip_holidays {
        match holidays.check(date, rule.skip.holiday_source) {
            HolidayAnswer::Holiday => return true,
            // Unavailable source disables holiday adjustment entirely.
            HolidayAnswer::NotHoliday | HolidayAnswer::Unavailable => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct FixedHolidays(Vec<NaiveDate>);

    impl HolidayChecker for FixedHolidays {
        fn check(&self, date: NaiveDate, _source: HolidaySource) -> HolidayAnswer {
            if self.0.contains(&date) {
                HolidayAnswer::Holiday
            } else {
                HolidayAnswer::NotHoliday
            }
        }
    }

    struct BrokenSource;

    impl HolidayChecker for BrokenSource {
        fn check(&self, _date: NaiveDate, _source: HolidaySource) -> HolidayAnswer {
            HolidayAnswer::Unavailable
        }
    }

    #[test]
    fn daily_interval_advances_by_days() {
        let rule = RecurrenceRule::new(Frequency::Daily, 3);
        let next =
            next_occurrence(&rule, Some(date(2025, 3, 3)), Some(540), 1, &NoHolidays).unwrap();
        assert_eq!(next.due_date, date(2025, 3, 6));
        assert_eq!(next.due_time_minutes, Some(540));
    }

    #[test]
    fn weekly_interval_advances_by_weeks() {
        let rule = RecurrenceRule::new(Frequency::Weekly, 2);
        let next =
            next_occurrence(&rule, Some(date(2025, 3, 3)), None, 1, &NoHolidays).unwrap();
        assert_eq!(next.due_date, date(2025, 3, 17));
    }

    #[test]
    fn no_due_date_produces_no_successor() {
        let rule = RecurrenceRule::new(Frequency::Daily, 1);
        assert!(next_occurrence(&rule, None, None, 0, &NoHolidays).is_none());
    }

    #[test]
    fn skip_weekends_moves_friday_plus_three_to_monday() {
        // Friday 2025-03-07 + 3 days = Monday 2025-03-10 already; use
        // Thursday so the step lands on Sunday.
        let mut rule = RecurrenceRule::new(Frequency::Daily, 3);
        rule.skip.skip_weekends = true;
        let next =
            next_occurrence(&rule, Some(date(2025, 3, 6)), Some(600), 1, &NoHolidays).unwrap();
        // Thu + 3 = Sun -> forward to Mon.
        assert_eq!(next.due_date, date(2025, 3, 10));
        assert_eq!(next.due_date.weekday(), Weekday::Mon);
        assert_eq!(next.due_time_minutes, Some(600));
    }

    #[test]
    fn skip_weekends_backward_moves_to_friday() {
        let mut rule = RecurrenceRule::new(Frequency::Daily, 2);
        rule.skip.skip_weekends = true;
        rule.skip.adjustment = SkipAdjustment::Backward;
        // Fri + 2 = Sun -> backward to Fri.
        let next =
            next_occurrence(&rule, Some(date(2025, 3, 7)), None, 1, &NoHolidays).unwrap();
        assert_eq!(next.due_date, date(2025, 3, 7));
    }

    #[test]
    fn holiday_skipping_chains_past_consecutive_holidays() {
        let mut rule = RecurrenceRule::new(Frequency::Daily, 1);
        rule.skip.skip_holidays = true;
        rule.skip.holiday_source = HolidaySource::DeviceCalendar;
        let holidays = FixedHolidays(vec![date(2025, 12, 25), date(2025, 12, 26)]);
        let next =
            next_occurrence(&rule, Some(date(2025, 12, 24)), None, 1, &holidays).unwrap();
        assert_eq!(next.due_date, date(2025, 12, 27));
    }

    #[test]
    fn unavailable_holiday_source_applies_no_adjustment() {
        let mut rule = RecurrenceRule::new(Frequency::Daily, 1);
        rule.skip.skip_holidays = true;
        rule.skip.holiday_source = HolidaySource::DeviceCalendar;
        let next =
            next_occurrence(&rule, Some(date(2025, 12, 24)), None, 1, &BrokenSource).unwrap();
        assert_eq!(next.due_date, date(2025, 12, 25));
    }

    struct EveryDayHoliday;

    impl HolidayChecker for EveryDayHoliday {
        fn check(&self, _date: NaiveDate, _source: HolidaySource) -> HolidayAnswer {
            HolidayAnswer::Holiday
        }
    }

    #[test]
    fn fully_blocked_skip_window_produces_no_successor() {
        let mut rule = RecurrenceRule::new(Frequency::Daily, 1);
        rule.skip.skip_holidays = true;
        rule.skip.holiday_source = HolidaySource::DeviceCalendar;
        assert!(
            next_occurrence(&rule, Some(date(2025, 1, 1)), None, 1, &EveryDayHoliday).is_none()
        );
    }

    #[test]
    fn after_occurrences_stops_at_count() {
        let mut rule = RecurrenceRule::new(Frequency::Daily, 1);
        rule.end = EndCondition::AfterOccurrences(3);
        assert!(next_occurrence(&rule, Some(date(2025, 1, 1)), None, 2, &NoHolidays).is_some());
        assert!(next_occurrence(&rule, Some(date(2025, 1, 1)), None, 3, &NoHolidays).is_none());
    }

    #[test]
    fn until_is_inclusive_of_boundary_date() {
        let mut rule = RecurrenceRule::new(Frequency::Daily, 1);
        rule.end = EndCondition::Until(date(2025, 1, 2));
        let next = next_occurrence(&rule, Some(date(2025, 1, 1)), None, 1, &NoHolidays).unwrap();
        assert_eq!(next.due_date, date(2025, 1, 2));
        assert!(next_occurrence(&rule, Some(date(2025, 1, 2)), None, 2, &NoHolidays).is_none());
    }

    #[test]
    fn time_of_day_preserved_across_dst_boundary() {
        // US spring-forward happens 2025-03-09; the stored wall-clock
        // minutes must carry over untouched.
        let rule = RecurrenceRule::new(Frequency::Daily, 1);
        let next =
            next_occurrence(&rule, Some(date(2025, 3, 8)), Some(9 * 60 + 30), 1, &NoHolidays)
                .unwrap();
        assert_eq!(next.due_date, date(2025, 3, 9));
        assert_eq!(next.due_time_minutes, Some(9 * 60 + 30));
    }
}
