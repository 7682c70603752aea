//! Calendar view of a single cycle
//!
//! Classifies each day of a month relative to one recorded cycle (period,
//! ovulation, fertile, normal) and attaches the pregnancy chance shown in
//! the day tooltip.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{add_days, days_between, days_in_month, WeekStart};
use crate::error::CycleError;
use crate::projection::{fertility_window, period_end_date, FERTILE_DAYS_BEFORE_OVULATION};
use crate::types::{CycleRecord, DailyProbability};

/// Pregnancy chance (percent) for each day of the fertility window,
/// starting five days before ovulation
pub const FERTILITY_PROBABILITIES: [f64; 7] = [6.4, 7.8, 10.7, 19.3, 23.5, 15.7, 5.7];

/// Chance shown for a period day outside the fertility window
pub const PERIOD_DAY_PROBABILITY: f64 = 1.0;

/// Chance shown for an ordinary day
pub const NORMAL_DAY_PROBABILITY: f64 = 2.1;

/// Role of a calendar day within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    Period,
    Ovulation,
    Fertile,
    Normal,
}

/// One cell of a month grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub kind: DayKind,
    /// Percent; `None` when no figure is available for the day
    pub pregnancy_chance: Option<f64>,
}

/// A month of classified days for one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub week_start: WeekStart,
    /// Empty cells before the first day of the month
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

/// Classify `date` against `record`.
///
/// Period days win over ovulation, which wins over the rest of the
/// fertility window.
pub fn classify_day(record: &CycleRecord, date: NaiveDate) -> DayKind {
    let period_end = period_end_date(record.start_date, record.period_length);
    if date >= record.start_date && date <= period_end {
        return DayKind::Period;
    }
    if date == record.ovulation_date {
        return DayKind::Ovulation;
    }
    if fertility_window(record.ovulation_date).contains(date) {
        return DayKind::Fertile;
    }
    DayKind::Normal
}

/// Default per-day chances over the fertility window for an ovulation date
pub fn standard_probability_log(ovulation_date: NaiveDate) -> Vec<DailyProbability> {
    let first = add_days(ovulation_date, -FERTILE_DAYS_BEFORE_OVULATION);
    FERTILITY_PROBABILITIES
        .iter()
        .enumerate()
        .map(|(offset, &probability)| DailyProbability {
            date: add_days(first, offset as i64),
            probability,
        })
        .collect()
}

/// Pregnancy chance for `date`.
///
/// Uses the backend-supplied log when the record carries one, otherwise the
/// standard fertility table; days outside either fall back to the period or
/// normal-day figure.
pub fn pregnancy_chance(record: &CycleRecord, date: NaiveDate) -> Option<f64> {
    let logged = if record.probability_log.is_empty() {
        standard_chance(record.ovulation_date, date)
    } else {
        record
            .probability_log
            .iter()
            .find(|entry| entry.date == date)
            .map(|entry| entry.probability)
    };
    if logged.is_some() {
        return logged;
    }

    match classify_day(record, date) {
        DayKind::Period => Some(PERIOD_DAY_PROBABILITY),
        DayKind::Normal => Some(NORMAL_DAY_PROBABILITY),
        DayKind::Ovulation | DayKind::Fertile => None,
    }
}

fn standard_chance(ovulation_date: NaiveDate, date: NaiveDate) -> Option<f64> {
    let first = add_days(ovulation_date, -FERTILE_DAYS_BEFORE_OVULATION);
    let offset = days_between(first, date);
    usize::try_from(offset)
        .ok()
        .and_then(|i| FERTILITY_PROBABILITIES.get(i).copied())
}

/// Build the month grid for `year`/`month` around `record`
pub fn month_view(
    record: &CycleRecord,
    year: i32,
    month: u32,
    week_start: WeekStart,
) -> Result<MonthView, CycleError> {
    let length = days_in_month(year, month)
        .ok_or_else(|| CycleError::InvalidInput(format!("invalid month {}-{:02}", year, month)))?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| CycleError::InvalidInput(format!("invalid month {}-{:02}", year, month)))?;

    let days = (0..length)
        .map(|offset| {
            let date = add_days(first, i64::from(offset));
            CalendarDay {
                date,
                kind: classify_day(record, date),
                pregnancy_chance: pregnancy_chance(record, date),
            }
        })
        .collect();

    Ok(MonthView {
        year,
        month,
        week_start,
        leading_blanks: week_start.offset_of(first),
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CycleInput;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn january() -> CycleRecord {
        CycleRecord::from_input(None, &CycleInput::new(d(2024, 1, 1), 5, 28))
    }

    #[test]
    fn test_classify_day() {
        let record = january();
        assert_eq!(classify_day(&record, d(2023, 12, 31)), DayKind::Normal);
        assert_eq!(classify_day(&record, d(2024, 1, 1)), DayKind::Period);
        assert_eq!(classify_day(&record, d(2024, 1, 5)), DayKind::Period);
        assert_eq!(classify_day(&record, d(2024, 1, 6)), DayKind::Normal);
        assert_eq!(classify_day(&record, d(2024, 1, 10)), DayKind::Fertile);
        assert_eq!(classify_day(&record, d(2024, 1, 15)), DayKind::Ovulation);
        assert_eq!(classify_day(&record, d(2024, 1, 16)), DayKind::Fertile);
        assert_eq!(classify_day(&record, d(2024, 1, 17)), DayKind::Normal);
    }

    #[test]
    fn test_period_takes_precedence_over_fertile() {
        // 20-day cycle: ovulation on day 7, window opens on day 2
        let record = CycleRecord::from_input(None, &CycleInput::new(d(2024, 1, 1), 5, 20));
        assert_eq!(classify_day(&record, d(2024, 1, 3)), DayKind::Period);
        assert_eq!(classify_day(&record, d(2024, 1, 6)), DayKind::Fertile);
        assert_eq!(classify_day(&record, d(2024, 1, 7)), DayKind::Ovulation);
    }

    #[test]
    fn test_standard_probability_log() {
        let log = standard_probability_log(d(2024, 1, 15));
        assert_eq!(log.len(), 7);
        assert_eq!(log[0].date, d(2024, 1, 10));
        assert_eq!(log[5].date, d(2024, 1, 15));
        assert_eq!(log[5].probability, 15.7);
        assert_eq!(log[6].date, d(2024, 1, 16));
    }

    #[test]
    fn test_pregnancy_chance_defaults() {
        let record = january();
        assert_eq!(pregnancy_chance(&record, d(2024, 1, 2)), Some(PERIOD_DAY_PROBABILITY));
        assert_eq!(pregnancy_chance(&record, d(2024, 1, 20)), Some(NORMAL_DAY_PROBABILITY));
        assert_eq!(pregnancy_chance(&record, d(2024, 1, 14)), Some(23.5));
    }

    #[test]
    fn test_pregnancy_chance_prefers_backend_log() {
        let mut record = january();
        record.probability_log = vec![DailyProbability {
            date: d(2024, 1, 15),
            probability: 30.0,
        }];

        assert_eq!(pregnancy_chance(&record, d(2024, 1, 15)), Some(30.0));
        // Fertile day missing from the supplied log has no figure
        assert_eq!(pregnancy_chance(&record, d(2024, 1, 12)), None);
        assert_eq!(pregnancy_chance(&record, d(2024, 1, 25)), Some(NORMAL_DAY_PROBABILITY));
    }

    #[test]
    fn test_month_view_layout() {
        let record = january();
        let view = month_view(&record, 2024, 1, WeekStart::Monday).unwrap();

        // 2024-01-01 is a Monday
        assert_eq!(view.leading_blanks, 0);
        assert_eq!(view.days.len(), 31);
        assert_eq!(view.days[14].kind, DayKind::Ovulation);

        let sunday_view = month_view(&record, 2024, 1, WeekStart::Sunday).unwrap();
        assert_eq!(sunday_view.leading_blanks, 1);

        let feb = month_view(&record, 2024, 2, WeekStart::Monday).unwrap();
        assert_eq!(feb.days.len(), 29);
        assert_eq!(feb.leading_blanks, 3);
    }

    #[test]
    fn test_month_view_rejects_bad_month() {
        let record = january();
        assert!(month_view(&record, 2024, 0, WeekStart::Monday).is_err());
        assert!(month_view(&record, 2024, 13, WeekStart::Monday).is_err());
    }
}
