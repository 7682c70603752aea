//! Ovula - On-device menstrual-cycle projection and history engine
//!
//! Ovula turns a handful of user-declared values into cycle dates and
//! summarizes a recorded history: projection (period end, next period,
//! ovulation, fertility window) → history aggregation (averages, next
//! predicted period, regularity) → calendar and reminder views.
//!
//! ## Modules
//!
//! - **Core**: `dates`, `projection`, `history`, `calendar`, `reminder` are
//!   pure and total over `chrono::NaiveDate`
//! - **Boundary**: `schema` normalizes backend payloads, `backend` and
//!   `storage` are the injected collaborators, `tracker` orchestrates them

pub mod backend;
pub mod calendar;
pub mod config;
pub mod dates;
pub mod error;
pub mod history;
pub mod projection;
pub mod reminder;
pub mod schema;
pub mod storage;
pub mod tracker;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use backend::{CycleBackend, JsonFileBackend, MemoryBackend};
pub use config::Config;
pub use error::CycleError;
pub use history::summarize_history;
pub use projection::project_cycle;
pub use tracker::{project_cycle_json, summarize_history_json, CycleTracker};
pub use types::{
    CycleHistorySummary, CycleId, CycleInput, CycleProjection, CycleRecord, FertilityWindow,
    Regularity,
};

// Schema exports
pub use schema::{CycleRecordAdapter, RawCycleRecord};

/// Ovula version reported by the FFI and the CLI
pub const OVULA_VERSION: &str = env!("CARGO_PKG_VERSION");
