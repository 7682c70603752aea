//! Cycle tracker orchestration
//!
//! This module provides the public API that hosts drive. It wires the
//! system of record to the calculators:
//! 1. `CycleBackend` - fetch and mutate cycle history
//! 2. `history` - aggregate the cached list into a summary
//! 3. `projection` - recalculate a submitted cycle without persisting it
//! 4. `calendar` / `reminder` - per-day views of a single cycle

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::backend::CycleBackend;
use crate::calendar::{self, MonthView};
use crate::dates::WeekStart;
use crate::error::CycleError;
use crate::history::{sort_newest_first, summarize_history};
use crate::projection::project_cycle;
use crate::reminder::{self, Reminder};
use crate::schema::{CycleRecordAdapter, RawDate};
use crate::types::{CycleHistorySummary, CycleId, CycleInput, CycleProjection, CycleRecord};

/// Project a single cycle from a JSON request.
///
/// The request carries `start_date`, `period_length` and `cycle_length`
/// (camelCase and `numberOfDays` are accepted too). The start date may use
/// any encoding the backend uses.
///
/// # Example
/// ```ignore
/// let json = project_cycle_json(r#"{"start_date": "2024-01-01", "period_length": 5, "cycle_length": 28}"#)?;
/// ```
pub fn project_cycle_json(json: &str) -> Result<String, CycleError> {
    let request: ProjectionRequest = serde_json::from_str(json)?;
    let start_date = request.start_date.to_date()?;
    let projection = project_cycle(start_date, request.period_length, request.cycle_length);
    Ok(serde_json::to_string(&projection)?)
}

/// Summarize a cycle list given as a bare JSON array or a backend envelope
pub fn summarize_history_json(json: &str, today: NaiveDate) -> Result<String, CycleError> {
    let raw = CycleRecordAdapter::parse_response(json)?;
    let records = CycleRecordAdapter::to_records(&raw)?;
    let summary = summarize_history(&records, today);
    Ok(serde_json::to_string(&summary)?)
}

/// Month grid for a single record given as JSON (bare or enveloped)
pub fn month_view_json(
    json: &str,
    year: i32,
    month: u32,
    week_start: WeekStart,
) -> Result<String, CycleError> {
    let record = CycleRecordAdapter::parse_single(json)?.to_record()?;
    let view = calendar::month_view(&record, year, month, week_start)?;
    Ok(serde_json::to_string(&view)?)
}

#[derive(Debug, Deserialize)]
struct ProjectionRequest {
    #[serde(alias = "startDate")]
    start_date: RawDate,
    #[serde(alias = "periodLength", alias = "numberOfDays")]
    period_length: u32,
    #[serde(alias = "cycleLength")]
    cycle_length: u32,
}

/// Stateful tracker holding a newest-first cache of the backend's history.
///
/// The cache is refetched after every mutation, so it never diverges from
/// the system of record by more than one failed call.
pub struct CycleTracker<B: CycleBackend> {
    backend: B,
    records: Vec<CycleRecord>,
    week_start: WeekStart,
}

impl<B: CycleBackend> CycleTracker<B> {
    /// Create a tracker and load the initial history
    pub fn new(backend: B) -> Result<Self, CycleError> {
        let mut tracker = Self {
            backend,
            records: Vec::new(),
            week_start: WeekStart::default(),
        };
        tracker.refresh()?;
        Ok(tracker)
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    /// Refetch the history from the backend
    pub fn refresh(&mut self) -> Result<&[CycleRecord], CycleError> {
        let mut records = self.backend.list()?;
        sort_newest_first(&mut records);
        debug!(count = records.len(), "refreshed cycle history");
        self.records = records;
        Ok(&self.records)
    }

    /// Cached history, newest first
    pub fn records(&self) -> &[CycleRecord] {
        &self.records
    }

    pub fn find(&self, id: &CycleId) -> Option<&CycleRecord> {
        self.records.iter().find(|r| r.id.as_ref() == Some(id))
    }

    pub fn summary(&self, today: NaiveDate) -> CycleHistorySummary {
        summarize_history(&self.records, today)
    }

    /// Recalculate a submission; nothing is persisted
    pub fn project(&self, input: &CycleInput) -> CycleProjection {
        project_cycle(input.start_date, input.period_length, input.cycle_length)
    }

    /// Validate and persist a new cycle
    pub fn save(&mut self, input: &CycleInput, today: NaiveDate) -> Result<CycleRecord, CycleError> {
        input.validate(today)?;
        let record = self.backend.create(input)?;
        info!(cycle_id = ?record.id, start_date = %record.start_date, "saved cycle");
        self.refresh()?;
        Ok(record)
    }

    /// Validate and fully replace an existing cycle
    pub fn update(
        &mut self,
        id: &CycleId,
        input: &CycleInput,
        today: NaiveDate,
    ) -> Result<CycleRecord, CycleError> {
        input.validate(today)?;
        let record = self.backend.update(id, input)?;
        info!(cycle_id = %id, start_date = %record.start_date, "updated cycle");
        self.refresh()?;
        Ok(record)
    }

    pub fn delete(&mut self, id: &CycleId) -> Result<(), CycleError> {
        self.backend.delete(id)?;
        info!(cycle_id = %id, "deleted cycle");
        self.refresh()?;
        Ok(())
    }

    /// Month grid for one cached cycle
    pub fn month_view(&self, id: &CycleId, year: i32, month: u32) -> Result<MonthView, CycleError> {
        let record = self
            .find(id)
            .ok_or_else(|| CycleError::NotFound(id.to_string()))?;
        calendar::month_view(record, year, month, self.week_start)
    }

    pub fn due_reminders(&self, today: NaiveDate) -> Vec<Reminder> {
        reminder::due_reminders(&self.records, today)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}
