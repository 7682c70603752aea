//! Core types for the Ovula engine
//!
//! These are the normalized shapes that flow between the schema boundary,
//! the calculators and the tracker. Every date here is a plain
//! `NaiveDate`; the wire representations live in [`crate::schema`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CycleError;
use crate::projection;

/// Longest period a submission may declare (days)
pub const MAX_PERIOD_LENGTH: u32 = 30;

/// Opaque identifier assigned by the system of record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(pub String);

impl CycleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CycleId {
    fn from(value: &str) -> Self {
        CycleId(value.to_string())
    }
}

/// One observed menstrual cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    /// Absent for a calculated projection that was never saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CycleId>,
    /// First day of menstrual flow
    pub start_date: NaiveDate,
    /// Days of flow
    pub period_length: u32,
    /// Days from this cycle's start to the next cycle's start
    pub cycle_length: u32,
    /// `start_date + cycle_length - 14`
    pub ovulation_date: NaiveDate,
    /// Whether the notification collaborator should remind for this cycle
    #[serde(default)]
    pub reminder_enabled: bool,
    /// Per-day pregnancy chance supplied by the backend, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probability_log: Vec<DailyProbability>,
}

impl CycleRecord {
    /// Build a record from a submission, deriving the ovulation date
    pub fn from_input(id: Option<CycleId>, input: &CycleInput) -> Self {
        Self {
            id,
            start_date: input.start_date,
            period_length: input.period_length,
            cycle_length: input.cycle_length,
            ovulation_date: projection::ovulation_date(input.start_date, input.cycle_length),
            reminder_enabled: input.reminder_enabled,
            probability_log: Vec::new(),
        }
    }

    /// Forward projection for this record
    pub fn projection(&self) -> CycleProjection {
        projection::project_cycle(self.start_date, self.period_length, self.cycle_length)
    }

    /// The submission that would recreate this record
    pub fn to_input(&self) -> CycleInput {
        CycleInput {
            start_date: self.start_date,
            period_length: self.period_length,
            cycle_length: self.cycle_length,
            reminder_enabled: self.reminder_enabled,
        }
    }
}

/// User-declared cycle values, as submitted from a form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleInput {
    pub start_date: NaiveDate,
    pub period_length: u32,
    pub cycle_length: u32,
    #[serde(default)]
    pub reminder_enabled: bool,
}

impl CycleInput {
    pub fn new(start_date: NaiveDate, period_length: u32, cycle_length: u32) -> Self {
        Self {
            start_date,
            period_length,
            cycle_length,
            reminder_enabled: false,
        }
    }

    pub fn with_reminder(mut self, enabled: bool) -> Self {
        self.reminder_enabled = enabled;
        self
    }

    /// Check a submission before it is sent to the system of record.
    ///
    /// Projections never go through this; only save and update do.
    pub fn validate(&self, today: NaiveDate) -> Result<(), CycleError> {
        if self.period_length == 0 || self.period_length > MAX_PERIOD_LENGTH {
            return Err(CycleError::InvalidInput(format!(
                "period length must be between 1 and {} days, got {}",
                MAX_PERIOD_LENGTH, self.period_length
            )));
        }
        if self.cycle_length == 0 {
            return Err(CycleError::InvalidInput(
                "cycle length must be positive".to_string(),
            ));
        }
        if self.period_length > self.cycle_length {
            return Err(CycleError::InvalidInput(format!(
                "period length ({}) exceeds cycle length ({})",
                self.period_length, self.cycle_length
            )));
        }
        if self.start_date > today {
            return Err(CycleError::InvalidInput(format!(
                "start date {} is in the future",
                self.start_date
            )));
        }
        Ok(())
    }
}

/// Days treated as high conception probability around ovulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FertilityWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FertilityWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Low-fertility stretch between the end of flow and the fertility window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SafeWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Something implausible about a projection's inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionFlag {
    /// Cycle length of 14 days or less puts ovulation on or before the start date
    OvulationNotAfterStart,
    /// Declared period is longer than the cycle itself
    PeriodExceedsCycle,
}

/// Derived, never-persisted view of one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProjection {
    pub start_date: NaiveDate,
    /// Last day of flow
    pub end_date: NaiveDate,
    pub next_period_date: NaiveDate,
    pub ovulation_date: NaiveDate,
    pub fertility_window: FertilityWindow,
    /// `None` when the fertility window opens before the period has ended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_window: Option<SafeWindow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ProjectionFlag>,
}

impl CycleProjection {
    /// No projection flags were raised
    pub fn is_plausible(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Regularity of recent cycle history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regularity {
    #[default]
    Regular,
    Irregular,
}

impl Regularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regularity::Regular => "regular",
            Regularity::Irregular => "irregular",
        }
    }
}

/// Aggregate statistics over a newest-first history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleHistorySummary {
    pub total_cycles: usize,
    /// `None` when there is no history
    pub average_cycle_length: Option<u32>,
    /// `None` when there is no history
    pub average_period_length: Option<u32>,
    pub next_predicted_date: Option<NaiveDate>,
    pub regularity: Regularity,
}

/// Pregnancy chance for one calendar day, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyProbability {
    pub date: NaiveDate,
    pub probability: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_record_from_input_derives_ovulation() {
        let input = CycleInput::new(d(2024, 1, 1), 5, 28).with_reminder(true);
        let record = CycleRecord::from_input(Some(CycleId::from("7")), &input);

        assert_eq!(record.ovulation_date, d(2024, 1, 15));
        assert!(record.reminder_enabled);
        assert_eq!(record.to_input(), input);
    }

    #[test]
    fn test_validate_accepts_typical_input() {
        let input = CycleInput::new(d(2024, 1, 1), 5, 28);
        assert!(input.validate(d(2024, 1, 10)).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let today = d(2024, 1, 10);
        assert!(CycleInput::new(d(2024, 1, 1), 0, 28).validate(today).is_err());
        assert!(CycleInput::new(d(2024, 1, 1), 31, 40).validate(today).is_err());
        assert!(CycleInput::new(d(2024, 1, 1), 5, 0).validate(today).is_err());
        assert!(CycleInput::new(d(2024, 1, 1), 10, 8).validate(today).is_err());
        assert!(CycleInput::new(d(2024, 1, 11), 5, 28).validate(today).is_err());
    }

    #[test]
    fn test_fertility_window_contains_is_inclusive() {
        let window = FertilityWindow {
            start: d(2024, 1, 10),
            end: d(2024, 1, 16),
        };
        assert!(window.contains(d(2024, 1, 10)));
        assert!(window.contains(d(2024, 1, 16)));
        assert!(!window.contains(d(2024, 1, 17)));
    }

    #[test]
    fn test_is_plausible_tracks_flags() {
        let mut projection = crate::projection::project_cycle(d(2024, 1, 1), 5, 28);
        assert!(projection.is_plausible());

        projection.flags = vec![ProjectionFlag::PeriodExceedsCycle];
        assert!(!projection.is_plausible());
    }

    #[test]
    fn test_regularity_serializes_lowercase() {
        let json = serde_json::to_string(&Regularity::Irregular).unwrap();
        assert_eq!(json, "\"irregular\"");
        assert_eq!(Regularity::default(), Regularity::Regular);
    }
}
