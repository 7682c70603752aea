//! System-of-record collaborators
//!
//! The engine never owns cycle history; it reads and writes it through a
//! [`CycleBackend`]. Two implementations ship with the crate:
//! - [`MemoryBackend`] keeps records in process, used by tests and the FFI
//! - [`JsonFileBackend`] persists records as a JSON array in the backend's
//!   wire format, used by the CLI

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CycleError;
use crate::history::sort_newest_first;
use crate::schema::{CycleRecordAdapter, RawCycleRecord};
use crate::types::{CycleId, CycleInput, CycleRecord};

/// Trait for the store that owns cycle history
pub trait CycleBackend {
    /// All records, newest first
    fn list(&self) -> Result<Vec<CycleRecord>, CycleError>;

    /// One record by id
    fn get(&self, id: &CycleId) -> Result<CycleRecord, CycleError>;

    /// Persist a new cycle and return it with its assigned id
    fn create(&mut self, input: &CycleInput) -> Result<CycleRecord, CycleError>;

    /// Replace the declared values of an existing cycle
    fn update(&mut self, id: &CycleId, input: &CycleInput) -> Result<CycleRecord, CycleError>;

    fn delete(&mut self, id: &CycleId) -> Result<(), CycleError>;
}

/// In-process backend
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    records: Vec<CycleRecord>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records; records without an id get one
    pub fn with_records(records: Vec<CycleRecord>) -> Self {
        let mut records: Vec<CycleRecord> = records
            .into_iter()
            .map(|mut r| {
                if r.id.is_none() {
                    r.id = Some(new_id());
                }
                r
            })
            .collect();
        sort_newest_first(&mut records);
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, id: &CycleId) -> Result<usize, CycleError> {
        self.records
            .iter()
            .position(|r| r.id.as_ref() == Some(id))
            .ok_or_else(|| CycleError::NotFound(id.to_string()))
    }
}

impl CycleBackend for MemoryBackend {
    fn list(&self) -> Result<Vec<CycleRecord>, CycleError> {
        Ok(self.records.clone())
    }

    fn get(&self, id: &CycleId) -> Result<CycleRecord, CycleError> {
        let index = self.position(id)?;
        Ok(self.records[index].clone())
    }

    fn create(&mut self, input: &CycleInput) -> Result<CycleRecord, CycleError> {
        let record = CycleRecord::from_input(Some(new_id()), input);
        self.records.push(record.clone());
        sort_newest_first(&mut self.records);
        debug!(cycle_id = ?record.id, "created cycle");
        Ok(record)
    }

    fn update(&mut self, id: &CycleId, input: &CycleInput) -> Result<CycleRecord, CycleError> {
        let index = self.position(id)?;
        // Backend-supplied probabilities belong to the old dates
        let record = CycleRecord::from_input(Some(id.clone()), input);
        self.records[index] = record.clone();
        sort_newest_first(&mut self.records);
        debug!(cycle_id = %id, "updated cycle");
        Ok(record)
    }

    fn delete(&mut self, id: &CycleId) -> Result<(), CycleError> {
        let index = self.position(id)?;
        self.records.remove(index);
        debug!(cycle_id = %id, "deleted cycle");
        Ok(())
    }
}

fn new_id() -> CycleId {
    CycleId(Uuid::new_v4().to_string())
}

/// Backend persisted as a JSON array of wire-format records.
///
/// Every call reads the file, so edits made by other tools are picked up.
/// A missing file is an empty history.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<MemoryBackend, CycleError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no history file yet");
            return Ok(MemoryBackend::new());
        }
        let json = fs::read_to_string(&self.path)?;
        if json.trim().is_empty() {
            return Ok(MemoryBackend::new());
        }
        let raw = CycleRecordAdapter::parse_response(&json)?;
        let records = CycleRecordAdapter::to_records(&raw)?;
        let missing_ids = records.iter().filter(|r| r.id.is_none()).count();
        let backend = MemoryBackend::with_records(records);

        // Ids handed out by list must still resolve on the next load
        if missing_ids > 0 {
            info!(path = %self.path.display(), count = missing_ids, "assigned ids to stored cycles");
            self.store(&backend)?;
        }
        Ok(backend)
    }

    fn store(&self, backend: &MemoryBackend) -> Result<(), CycleError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw: Vec<RawCycleRecord> = backend.records.iter().map(RawCycleRecord::from).collect();
        let json = serde_json::to_string_pretty(&raw)?;
        fs::write(&self.path, json)?;
        info!(path = %self.path.display(), count = raw.len(), "wrote cycle history");
        Ok(())
    }

    fn modify<T>(
        &mut self,
        op: impl FnOnce(&mut MemoryBackend) -> Result<T, CycleError>,
    ) -> Result<T, CycleError> {
        let mut backend = self.load()?;
        let out = op(&mut backend)?;
        self.store(&backend)?;
        Ok(out)
    }
}

impl CycleBackend for JsonFileBackend {
    fn list(&self) -> Result<Vec<CycleRecord>, CycleError> {
        self.load()?.list()
    }

    fn get(&self, id: &CycleId) -> Result<CycleRecord, CycleError> {
        self.load()?.get(id)
    }

    fn create(&mut self, input: &CycleInput) -> Result<CycleRecord, CycleError> {
        self.modify(|b| b.create(input))
    }

    fn update(&mut self, id: &CycleId, input: &CycleInput) -> Result<CycleRecord, CycleError> {
        self.modify(|b| b.update(id, input))
    }

    fn delete(&mut self, id: &CycleId) -> Result<(), CycleError> {
        self.modify(|b| b.delete(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_memory_backend_crud() {
        let mut backend = MemoryBackend::new();
        let first = backend.create(&CycleInput::new(d(2024, 1, 1), 5, 28)).unwrap();
        let second = backend.create(&CycleInput::new(d(2024, 1, 29), 4, 30)).unwrap();

        let listed = backend.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);

        let id = first.id.clone().unwrap();
        let updated = backend.update(&id, &CycleInput::new(d(2024, 1, 2), 5, 27)).unwrap();
        assert_eq!(updated.ovulation_date, d(2024, 1, 15));
        assert_eq!(backend.get(&id).unwrap(), updated);

        backend.delete(&id).unwrap();
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_memory_backend_missing_id() {
        let mut backend = MemoryBackend::new();
        let missing = CycleId::from("nope");
        assert!(matches!(backend.get(&missing), Err(CycleError::NotFound(_))));
        assert!(matches!(backend.delete(&missing), Err(CycleError::NotFound(_))));
        assert!(matches!(
            backend.update(&missing, &CycleInput::new(d(2024, 1, 1), 5, 28)),
            Err(CycleError::NotFound(_))
        ));
    }

    #[test]
    fn test_with_records_assigns_ids() {
        let record = CycleRecord::from_input(None, &CycleInput::new(d(2024, 1, 1), 5, 28));
        let backend = MemoryBackend::with_records(vec![record]);
        assert!(backend.list().unwrap()[0].id.is_some());
    }

    #[test]
    fn test_json_file_backend_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cycles.json");

        let mut backend = JsonFileBackend::new(&path);
        assert!(backend.list().unwrap().is_empty());

        let created = backend.create(&CycleInput::new(d(2024, 1, 1), 5, 28)).unwrap();
        backend.create(&CycleInput::new(d(2024, 1, 29), 5, 28)).unwrap();

        let reopened = JsonFileBackend::new(&path);
        let records = reopened.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].start_date, d(2024, 1, 29));

        let id = created.id.unwrap();
        assert_eq!(reopened.get(&id).unwrap().ovulation_date, d(2024, 1, 15));

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"numberOfDays\": 5"));
    }

    #[test]
    fn test_json_file_backend_keeps_assigned_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycles.json");
        fs::write(
            &path,
            r#"[{"startDate": "2024-03-01", "numberOfDays": 5, "cycleLength": 28},
                {"startDate": "2024-02-02", "numberOfDays": 5, "cycleLength": 28}]"#,
        )
        .unwrap();

        let mut backend = JsonFileBackend::new(&path);
        let first: Vec<Option<CycleId>> = backend.list().unwrap().into_iter().map(|r| r.id).collect();
        let second: Vec<Option<CycleId>> = backend.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(first, second);

        let newest = first[0].clone().unwrap();
        let older = first[1].clone().unwrap();
        let updated = backend
            .update(&older, &CycleInput::new(d(2024, 2, 1), 4, 29))
            .unwrap();
        assert_eq!(updated.id, Some(older.clone()));

        backend.delete(&newest).unwrap();
        let remaining = backend.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, Some(older));
        assert_eq!(remaining[0].start_date, d(2024, 2, 1));
    }

    #[test]
    fn test_json_file_backend_reads_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycles.json");
        fs::write(
            &path,
            r#"{"success": true, "data": [{"id": 4, "startDate": "2024-03-01", "numberOfDays": 5, "cycleLength": 28}]}"#,
        )
        .unwrap();

        let mut backend = JsonFileBackend::new(&path);
        let id = CycleId::from("4");
        assert_eq!(backend.get(&id).unwrap().start_date, d(2024, 3, 1));

        backend.delete(&id).unwrap();
        assert!(backend.list().unwrap().is_empty());
    }
}
