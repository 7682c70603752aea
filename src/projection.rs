//! Cycle projection
//!
//! Derives the forward view of a single cycle from its start date, period
//! length and cycle length:
//! - Last day of flow
//! - Next predicted period start
//! - Ovulation date (fixed 14-day luteal phase)
//! - Fertility window (5 days before to 1 day after ovulation)
//! - Safe window (the day after flow ends plus one, up to the window's first day)
//!
//! The calculator is total. Implausible inputs still produce dates, and
//! are reported through [`ProjectionFlag`]s rather than errors.

use chrono::NaiveDate;

use crate::dates::add_days;
use crate::types::{CycleProjection, FertilityWindow, ProjectionFlag, SafeWindow};

/// Days from ovulation to the next period
pub const LUTEAL_PHASE_DAYS: i64 = 14;

/// Fertile days before ovulation
pub const FERTILE_DAYS_BEFORE_OVULATION: i64 = 5;

/// Fertile days after ovulation
pub const FERTILE_DAYS_AFTER_OVULATION: i64 = 1;

/// Project a cycle forward from its declared values.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use ovula::projection::project_cycle;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let projection = project_cycle(start, 5, 28);
/// assert_eq!(projection.ovulation_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
/// ```
pub fn project_cycle(start_date: NaiveDate, period_length: u32, cycle_length: u32) -> CycleProjection {
    let ovulation = ovulation_date(start_date, cycle_length);

    let mut flags = Vec::new();
    if i64::from(cycle_length) <= LUTEAL_PHASE_DAYS {
        flags.push(ProjectionFlag::OvulationNotAfterStart);
    }
    if period_length > cycle_length {
        flags.push(ProjectionFlag::PeriodExceedsCycle);
    }

    CycleProjection {
        start_date,
        end_date: period_end_date(start_date, period_length),
        next_period_date: next_period_date(start_date, cycle_length),
        ovulation_date: ovulation,
        fertility_window: fertility_window(ovulation),
        safe_window: safe_window(start_date, period_length, ovulation),
        flags,
    }
}

/// Last day of flow: `start + (period_length - 1)`
pub fn period_end_date(start_date: NaiveDate, period_length: u32) -> NaiveDate {
    add_days(start_date, i64::from(period_length) - 1)
}

/// Next period start: `start + cycle_length`
pub fn next_period_date(start_date: NaiveDate, cycle_length: u32) -> NaiveDate {
    add_days(start_date, i64::from(cycle_length))
}

/// Ovulation: `start + cycle_length - 14`
pub fn ovulation_date(start_date: NaiveDate, cycle_length: u32) -> NaiveDate {
    add_days(start_date, i64::from(cycle_length) - LUTEAL_PHASE_DAYS)
}

/// Fertility window around an ovulation date
pub fn fertility_window(ovulation_date: NaiveDate) -> FertilityWindow {
    FertilityWindow {
        start: add_days(ovulation_date, -FERTILE_DAYS_BEFORE_OVULATION),
        end: add_days(ovulation_date, FERTILE_DAYS_AFTER_OVULATION),
    }
}

/// Safe window: `start + period_length + 1` through `ovulation - 5`.
///
/// The end is the fertility window's first day, as the cycle list shows it.
/// `None` when that range is empty.
pub fn safe_window(start_date: NaiveDate, period_length: u32, ovulation_date: NaiveDate) -> Option<SafeWindow> {
    let start = add_days(start_date, i64::from(period_length) + 1);
    let end = add_days(ovulation_date, -FERTILE_DAYS_BEFORE_OVULATION);
    (start <= end).then_some(SafeWindow { start, end })
}
