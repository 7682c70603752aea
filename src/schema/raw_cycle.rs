//! Backend wire shapes for cycle records
//!
//! The backend delivers dates in several encodings (ISO strings, SQL
//! date-times, `[year, month, day, ...]` arrays, compact digit strings) and
//! ids as numbers or strings. Everything here is normalized into
//! [`crate::types`] before it reaches a calculator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CycleError;
use crate::projection;
use crate::types::{CycleId, CycleRecord, DailyProbability};

/// A date as the backend may send it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDate {
    /// `[year, month, day, ...]` with a 1-based month
    Components(Vec<i64>),
    /// Compact digits sent as a JSON number, e.g. `20240115`
    Number(i64),
    Text(String),
}

impl RawDate {
    /// Normalize to a calendar date
    pub fn to_date(&self) -> Result<NaiveDate, CycleError> {
        match self {
            RawDate::Components(parts) => date_from_components(parts),
            RawDate::Number(n) => parse_date_str(&n.to_string()),
            RawDate::Text(s) => parse_date_str(s),
        }
    }
}

impl From<NaiveDate> for RawDate {
    fn from(date: NaiveDate) -> Self {
        RawDate::Text(date.format("%Y-%m-%d").to_string())
    }
}

fn date_from_components(parts: &[i64]) -> Result<NaiveDate, CycleError> {
    if parts.len() < 3 {
        return Err(CycleError::DateParseError(format!(
            "date array needs at least [year, month, day], got {:?}",
            parts
        )));
    }
    let invalid = || CycleError::DateParseError(format!("invalid date components {:?}", parts));

    let year = i32::try_from(parts[0]).map_err(|_| invalid())?;
    let month = u32::try_from(parts[1]).map_err(|_| invalid())?;
    let day = u32::try_from(parts[2]).map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Parse one of the textual date encodings.
///
/// Accepted: `YYYY-MM-DD`, ISO/SQL date-times (truncated to the date as
/// written), `YYYYMMDD`, `YYYYMDD`, `YYMMDD`, and `DD/MM/YYYY`.
pub fn parse_date_str(input: &str) -> Result<NaiveDate, CycleError> {
    let s = input.trim();
    let invalid = || CycleError::DateParseError(format!("unrecognized date '{}'", input));

    if s.is_empty() {
        return Err(invalid());
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        let num = |range: std::ops::Range<usize>| s[range].parse::<u32>().map_err(|_| invalid());
        let (year, month, day) = match s.len() {
            8 => (num(0..4)? as i32, num(4..6)?, num(6..8)?),
            7 => (num(0..4)? as i32, num(4..5)?, num(5..7)?),
            6 => {
                let yy = num(0..2)? as i32;
                let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
                (year, num(2..4)?, num(4..6)?)
            }
            _ => return Err(invalid()),
        };
        return NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid);
    }

    if s.contains('/') {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let day: u32 = parts[0].trim().parse().map_err(|_| invalid())?;
        let month: u32 = parts[1].trim().parse().map_err(|_| invalid())?;
        let year: i32 = parts[2].trim().parse().map_err(|_| invalid())?;
        return NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid);
    }

    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| invalid())
}

/// Record id as the backend may send it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl From<&RawId> for CycleId {
    fn from(raw: &RawId) -> Self {
        match raw {
            RawId::Number(n) => CycleId(n.to_string()),
            RawId::Text(s) => CycleId(s.clone()),
        }
    }
}

/// One entry of a backend pregnancy-probability log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProbabilityEntry {
    pub date: RawDate,
    #[serde(alias = "pregnancyProbability")]
    pub probability: f64,
}

/// A cycle record in the backend's wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCycleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RawId>,
    pub start_date: RawDate,
    /// Period length; the backend calls it `numberOfDays`
    #[serde(default, alias = "periodLength")]
    pub number_of_days: Option<i64>,
    #[serde(default)]
    pub cycle_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovulation_date: Option<RawDate>,
    #[serde(default)]
    pub reminder_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pregnancy_prob_logs: Option<Vec<RawProbabilityEntry>>,
}

impl RawCycleRecord {
    pub fn id(&self) -> Option<CycleId> {
        self.id.as_ref().map(CycleId::from)
    }

    /// Normalize into a [`CycleRecord`].
    ///
    /// Dates must parse. A missing or negative length becomes 0 with a
    /// warning, which the regularity check treats as out of range. A
    /// missing ovulation date is derived from the start and cycle length.
    pub fn to_record(&self) -> Result<CycleRecord, CycleError> {
        let id = self.id();
        let start_date = self.start_date.to_date()?;
        let period_length = normalize_length(self.number_of_days, "numberOfDays", id.as_ref());
        let cycle_length = normalize_length(self.cycle_length, "cycleLength", id.as_ref());

        let ovulation_date = match &self.ovulation_date {
            Some(raw) => raw.to_date()?,
            None => projection::ovulation_date(start_date, cycle_length),
        };

        let probability_log = match &self.pregnancy_prob_logs {
            Some(entries) => entries
                .iter()
                .map(|e| {
                    Ok(DailyProbability {
                        date: e.date.to_date()?,
                        probability: e.probability,
                    })
                })
                .collect::<Result<Vec<_>, CycleError>>()?,
            None => Vec::new(),
        };

        Ok(CycleRecord {
            id,
            start_date,
            period_length,
            cycle_length,
            ovulation_date,
            reminder_enabled: self.reminder_enabled.unwrap_or(false),
            probability_log,
        })
    }
}

impl From<&CycleRecord> for RawCycleRecord {
    fn from(record: &CycleRecord) -> Self {
        let logs = (!record.probability_log.is_empty()).then(|| {
            record
                .probability_log
                .iter()
                .map(|e| RawProbabilityEntry {
                    date: e.date.into(),
                    probability: e.probability,
                })
                .collect()
        });

        Self {
            id: record.id.as_ref().map(|id| RawId::Text(id.0.clone())),
            start_date: record.start_date.into(),
            number_of_days: Some(i64::from(record.period_length)),
            cycle_length: Some(i64::from(record.cycle_length)),
            ovulation_date: Some(record.ovulation_date.into()),
            reminder_enabled: Some(record.reminder_enabled),
            pregnancy_prob_logs: logs,
        }
    }
}

fn normalize_length(value: Option<i64>, field: &str, id: Option<&CycleId>) -> u32 {
    match value {
        Some(v) => u32::try_from(v).unwrap_or_else(|_| {
            warn!(cycle_id = ?id, field, value = v, "length out of range, treating as 0");
            0
        }),
        None => {
            warn!(cycle_id = ?id, field, "length missing, treating as 0");
            0
        }
    }
}

/// Standard backend response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, turning `success: false` into an error
    pub fn into_result(self) -> Result<Option<T>, CycleError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(CycleError::Backend(
                self.message.unwrap_or_else(|| "request failed".to_string()),
            ))
        }
    }
}
