//! Adapter from backend payloads to normalized cycle records
//!
//! Accepts a bare JSON array, NDJSON, or the backend's `{success, message,
//! data}` envelope, and hands back [`CycleRecord`]s ordered newest first.

use serde::Serialize;
use tracing::debug;

use crate::error::CycleError;
use crate::history::sort_newest_first;
use crate::projection;
use crate::schema::raw_cycle::{ApiEnvelope, RawCycleRecord};
use crate::types::{CycleId, CycleRecord};

/// Adapter for converting backend payloads to cycle records
pub struct CycleRecordAdapter;

impl CycleRecordAdapter {
    /// Parse a JSON array of raw records
    pub fn parse_array(json: &str) -> Result<Vec<RawCycleRecord>, CycleError> {
        let records: Vec<RawCycleRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (one raw record per line)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawCycleRecord>, CycleError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawCycleRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(CycleError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse a list response, either enveloped or a bare array.
    ///
    /// A successful envelope without `data` is an empty list.
    pub fn parse_response(json: &str) -> Result<Vec<RawCycleRecord>, CycleError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.is_array() {
            return Ok(serde_json::from_value(value)?);
        }
        if value.get("success").is_some() {
            let envelope: ApiEnvelope<Vec<RawCycleRecord>> = serde_json::from_value(value)?;
            return Ok(envelope.into_result()?.unwrap_or_default());
        }
        Err(CycleError::ParseError(
            "expected a JSON array or a {success, data} envelope".to_string(),
        ))
    }

    /// Parse a single-record response, either enveloped or bare
    pub fn parse_single(json: &str) -> Result<RawCycleRecord, CycleError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("success").is_some() {
            let envelope: ApiEnvelope<RawCycleRecord> = serde_json::from_value(value)?;
            return envelope
                .into_result()?
                .ok_or_else(|| CycleError::ParseError("response carries no data".to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Normalize raw records and order them newest first
    pub fn to_records(raw: &[RawCycleRecord]) -> Result<Vec<CycleRecord>, CycleError> {
        let mut records = raw
            .iter()
            .enumerate()
            .map(|(index, r)| {
                r.to_record().map_err(|e| match e {
                    CycleError::DateParseError(msg) => {
                        CycleError::DateParseError(format!("record {}: {}", index, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        sort_newest_first(&mut records);
        debug!(count = records.len(), "normalized cycle records");
        Ok(records)
    }

    /// Report problems in raw records without failing the batch
    pub fn validate_records(raw: &[RawCycleRecord]) -> Vec<RecordIssue> {
        let mut issues = Vec::new();
        for (index, r) in raw.iter().enumerate() {
            let id = r.id();
            let mut push = |message: String| {
                issues.push(RecordIssue {
                    index,
                    id: id.clone(),
                    message,
                })
            };

            let start = match r.start_date.to_date() {
                Ok(date) => Some(date),
                Err(e) => {
                    push(e.to_string());
                    None
                }
            };

            match r.number_of_days {
                None => push("numberOfDays is missing".to_string()),
                Some(v) if v <= 0 => push(format!("numberOfDays must be positive, got {}", v)),
                _ => {}
            }
            match r.cycle_length {
                None => push("cycleLength is missing".to_string()),
                Some(v) if v <= 0 => push(format!("cycleLength must be positive, got {}", v)),
                _ => {}
            }

            if let Some(raw_ovulation) = &r.ovulation_date {
                match raw_ovulation.to_date() {
                    Err(e) => push(e.to_string()),
                    Ok(ovulation) => {
                        let expected = match (start, r.cycle_length.and_then(|v| u32::try_from(v).ok())) {
                            (Some(start), Some(cycle)) => Some(projection::ovulation_date(start, cycle)),
                            _ => None,
                        };
                        if let Some(expected) = expected.filter(|e| *e != ovulation) {
                            push(format!(
                                "ovulationDate {} does not match startDate + cycleLength - 14 ({})",
                                ovulation, expected
                            ));
                        }
                    }
                }
            }
        }
        issues
    }
}

/// A problem found in one raw record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordIssue {
    pub index: usize,
    pub id: Option<CycleId>,
    pub message: String,
}
