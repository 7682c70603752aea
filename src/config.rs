//! Environment-driven configuration
//!
//! - `OVULA_DATA_DIR`: where the local cycle file and session store live
//! - `OVULA_WEEK_START`: `monday` (default) or `sunday`
//! - `OVULA_LOG`: tracing filter for the CLI, falling back to `RUST_LOG`

use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::dates::WeekStart;
use crate::error::CycleError;

pub const DATA_DIR_VAR: &str = "OVULA_DATA_DIR";
pub const WEEK_START_VAR: &str = "OVULA_WEEK_START";
pub const LOG_VAR: &str = "OVULA_LOG";

const CYCLES_FILE: &str = "cycles.json";
const SESSION_FILE: &str = "session.json";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub week_start: WeekStart,
    pub log_filter: String,
}

impl Config {
    /// Load from the process environment
    pub fn load() -> Result<Self, CycleError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CycleError> {
        let data_dir = match lookup(DATA_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let dir = default_data_dir()?;
                info!("{DATA_DIR_VAR} not set, using default: {}", dir.display());
                dir
            }
        };

        let week_start = try_load(&lookup, WEEK_START_VAR, WeekStart::default().as_str())?;

        let log_filter = lookup(LOG_VAR)
            .or_else(|| lookup("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            data_dir,
            week_start,
            log_filter,
        })
    }

    /// Local system-of-record file used by the CLI
    pub fn cycles_path(&self) -> PathBuf {
        self.data_dir.join(CYCLES_FILE)
    }

    /// Session key/value file
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }
}

fn default_data_dir() -> Result<PathBuf, CycleError> {
    dirs::data_local_dir()
        .map(|dir| dir.join("ovula"))
        .ok_or_else(|| {
            CycleError::InvalidInput(format!(
                "no local data directory on this platform, set {DATA_DIR_VAR}"
            ))
        })
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, CycleError>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            CycleError::InvalidInput(format!("{key}: {e}"))
        })
}
