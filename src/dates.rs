//! Calendar-date arithmetic
//!
//! All cycle math runs on local calendar dates with no time-of-day component.
//! These helpers are the only place day offsets are applied, so the
//! calculators never have to think about overflow at the ends of the
//! representable range.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CycleError;

/// First day of the week used for week equality and month grids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeekStart::Monday => "monday",
            WeekStart::Sunday => "sunday",
        }
    }

    /// Number of days `date` sits after the start of its week
    pub fn offset_of(&self, date: NaiveDate) -> u32 {
        match self {
            WeekStart::Monday => date.weekday().num_days_from_monday(),
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
        }
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeekStart {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(WeekStart::Monday),
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            other => Err(CycleError::InvalidInput(format!(
                "unknown week start '{}' (expected monday or sunday)",
                other
            ))),
        }
    }
}

/// Offset `date` by a signed number of days.
///
/// Saturates at `NaiveDate::MIN` / `NaiveDate::MAX` instead of panicking.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Signed number of days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

pub fn is_same_day(a: NaiveDate, b: NaiveDate) -> bool {
    a == b
}

/// True when both dates fall in the same week for the given week start
pub fn is_same_week(a: NaiveDate, b: NaiveDate, week_start: WeekStart) -> bool {
    start_of_week(a, week_start) == start_of_week(b, week_start)
}

pub fn is_same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// First day of the week containing `date`
pub fn start_of_week(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    add_days(date, -i64::from(week_start.offset_of(date)))
}

/// Number of days in the given month, or `None` for an invalid month
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(days_between(first, next) as u32)
}

/// Today's local calendar date
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_add_days_crosses_month_and_year() {
        assert_eq!(add_days(d(2024, 1, 30), 3), d(2024, 2, 2));
        assert_eq!(add_days(d(2024, 12, 30), 5), d(2025, 1, 4));
        assert_eq!(add_days(d(2024, 3, 1), -1), d(2024, 2, 29));
    }

    #[test]
    fn test_add_days_saturates() {
        assert_eq!(add_days(NaiveDate::MAX, 10), NaiveDate::MAX);
        assert_eq!(add_days(NaiveDate::MIN, -10), NaiveDate::MIN);
    }

    #[test]
    fn test_days_between_is_signed() {
        assert_eq!(days_between(d(2024, 1, 1), d(2024, 1, 29)), 28);
        assert_eq!(days_between(d(2024, 1, 29), d(2024, 1, 1)), -28);
    }

    #[test]
    fn test_same_week_respects_week_start() {
        // 2024-01-07 is a Sunday, 2024-01-08 a Monday
        assert!(!is_same_week(d(2024, 1, 7), d(2024, 1, 8), WeekStart::Monday));
        assert!(is_same_week(d(2024, 1, 7), d(2024, 1, 8), WeekStart::Sunday));
        assert!(is_same_week(d(2024, 1, 8), d(2024, 1, 14), WeekStart::Monday));
    }

    #[test]
    fn test_same_month() {
        assert!(is_same_month(d(2024, 2, 1), d(2024, 2, 29)));
        assert!(!is_same_month(d(2024, 2, 1), d(2023, 2, 1)));
        assert!(is_same_day(d(2024, 2, 1), d(2024, 2, 1)));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2024, 12), Some(31));
        assert_eq!(days_in_month(2024, 13), None);
    }

    #[test]
    fn test_week_start_parse() {
        assert_eq!("Sunday".parse::<WeekStart>().unwrap(), WeekStart::Sunday);
        assert_eq!("mon".parse::<WeekStart>().unwrap(), WeekStart::Monday);
        assert!("friday".parse::<WeekStart>().is_err());
    }
}
