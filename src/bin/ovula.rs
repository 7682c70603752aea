//! Ovula CLI - Command-line interface for the Ovula engine
//!
//! Commands:
//! - project: Project one cycle from declared values
//! - summary: Summarize a cycle history (file, stdin, or the local store)
//! - calendar: Month grid for one cycle
//! - add / edit / remove / list: Manage the local cycle store
//! - reminders: Reminders due today
//! - validate: Validate a backend payload
//! - doctor: Diagnose configuration and local data

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use ovula::calendar;
use ovula::config::{Config, LOG_VAR};
use ovula::dates;
use ovula::schema::{parse_date_str, CycleRecordAdapter};
use ovula::storage::{AuthToken, CachedProfile, FileStore, SessionStorage};
use ovula::{CycleError, CycleId, CycleInput, CycleRecord, CycleTracker, JsonFileBackend, OVULA_VERSION};

/// Ovula - On-device menstrual-cycle projection and history engine
#[derive(Parser)]
#[command(name = "ovula")]
#[command(author = "HealApp Engineering")]
#[command(version = OVULA_VERSION)]
#[command(about = "Project cycles and summarize cycle history", long_about = None)]
struct Cli {
    /// Directory holding the local cycle store (overrides OVULA_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "json-pretty")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project one cycle from declared values (nothing is saved)
    Project {
        /// First day of the period
        #[arg(long)]
        start: String,

        /// Days of flow
        #[arg(long)]
        period: u32,

        /// Days until the next period starts
        #[arg(long)]
        cycle: u32,
    },

    /// Summarize a cycle history
    Summary {
        /// Input file path (use - for stdin); defaults to the local store
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Reference date (defaults to the local date)
        #[arg(long)]
        today: Option<String>,
    },

    /// Month grid for one cycle
    Calendar {
        /// Input file path (use - for stdin); defaults to the local store
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Cycle id
        #[arg(long)]
        id: String,

        /// Month as YYYY-MM
        #[arg(long)]
        month: String,
    },

    /// Record a new cycle in the local store
    Add {
        #[command(flatten)]
        cycle: CycleArgs,
    },

    /// Replace a cycle in the local store
    Edit {
        /// Cycle id
        #[arg(long)]
        id: String,

        #[command(flatten)]
        cycle: CycleArgs,
    },

    /// Delete a cycle from the local store
    Remove {
        /// Cycle id
        #[arg(long)]
        id: String,
    },

    /// List cycles in the local store, newest first
    List,

    /// Reminders due for the local store
    Reminders {
        /// Reference date (defaults to the local date)
        #[arg(long)]
        today: Option<String>,
    },

    /// Validate a backend cycle payload
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and local data
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct CycleArgs {
    /// First day of the period
    #[arg(long)]
    start: String,

    /// Days of flow
    #[arg(long)]
    period: u32,

    /// Days until the next period starts
    #[arg(long)]
    cycle: u32,

    /// Enable ovulation and fertility reminders
    #[arg(long)]
    reminder: bool,
}

impl CycleArgs {
    fn to_input(&self) -> Result<CycleInput, CliFailure> {
        let start = parse_date_str(&self.start)?;
        Ok(CycleInput::new(start, self.period, self.cycle).with_reminder(self.reminder))
    }
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of records or a {success, data} envelope
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine readable
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    debug!(data_dir = %config.data_dir.display(), week_start = %config.week_start, "loaded config");

    let format = cli.format;
    match cli.command {
        Commands::Project {
            start,
            period,
            cycle,
        } => {
            let start = parse_date_str(&start)?;
            emit(&ovula::project_cycle(start, period, cycle), &format)
        }

        Commands::Summary { input, today } => {
            let today = parse_today(today.as_deref())?;
            let records = load_records(input.as_deref(), &config)?;
            emit(&ovula::summarize_history(&records, today), &format)
        }

        Commands::Calendar { input, id, month } => {
            let (year, month) = parse_month(&month)?;
            let id = CycleId(id);
            let records = load_records(input.as_deref(), &config)?;
            let record = records
                .iter()
                .find(|r| r.id.as_ref() == Some(&id))
                .ok_or_else(|| CycleError::NotFound(id.to_string()))?;
            emit(&calendar::month_view(record, year, month, config.week_start)?, &format)
        }

        Commands::Add { cycle } => {
            let mut tracker = open_tracker(&config)?;
            let record = tracker.save(&cycle.to_input()?, dates::today())?;
            emit(&record, &format)
        }

        Commands::Edit { id, cycle } => {
            let mut tracker = open_tracker(&config)?;
            let record = tracker.update(&CycleId(id), &cycle.to_input()?, dates::today())?;
            emit(&record, &format)
        }

        Commands::Remove { id } => {
            let mut tracker = open_tracker(&config)?;
            tracker.delete(&CycleId(id))?;
            emit(tracker.records(), &format)
        }

        Commands::List => {
            let tracker = open_tracker(&config)?;
            emit(tracker.records(), &format)
        }

        Commands::Reminders { today } => {
            let today = parse_today(today.as_deref())?;
            let tracker = open_tracker(&config)?;
            emit(&tracker.due_reminders(today), &format)
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { json } => cmd_doctor(&config, json),
    }
}

fn open_tracker(config: &Config) -> Result<CycleTracker<JsonFileBackend>, CliFailure> {
    let backend = JsonFileBackend::new(config.cycles_path());
    Ok(CycleTracker::new(backend)?.with_week_start(config.week_start))
}

fn load_records(input: Option<&Path>, config: &Config) -> Result<Vec<CycleRecord>, CliFailure> {
    match input {
        Some(path) => {
            let data = read_input(path)?;
            let raw = CycleRecordAdapter::parse_response(&data)?;
            Ok(CycleRecordAdapter::to_records(&raw)?)
        }
        None => Ok(open_tracker(config)?.records().to_vec()),
    }
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), CliFailure> {
    let input_data = read_input(input)?;

    let records = match input_format {
        InputFormat::Json => CycleRecordAdapter::parse_response(&input_data)?,
        InputFormat::Ndjson => CycleRecordAdapter::parse_ndjson(&input_data)?,
    };

    let issues = CycleRecordAdapter::validate_records(&records);
    let invalid: std::collections::BTreeSet<usize> = issues.iter().map(|i| i.index).collect();

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - invalid.len(),
        invalid_records: invalid.len(),
        errors: issues
            .iter()
            .map(|i| ValidationErrorDetail {
                index: i.index,
                cycle_id: i.id.as_ref().map(|id| id.to_string()),
                error: i.message.clone(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Cycle {} (index {}): {}",
                    err.cycle_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(CliFailure::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: &Config, json: bool) -> Result<(), CliFailure> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "ovula_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Ovula version {}", OVULA_VERSION),
    });

    checks.push(DoctorCheck {
        name: "config".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "data dir {}, weeks start on {}, log filter '{}'",
            config.data_dir.display(),
            config.week_start,
            config.log_filter
        ),
    });

    let cycles_path = config.cycles_path();
    if cycles_path.exists() {
        match check_cycle_store(&cycles_path) {
            Ok(count) => checks.push(DoctorCheck {
                name: "cycles".to_string(),
                status: CheckStatus::Ok,
                message: format!("Cycle store valid ({} records)", count),
            }),
            Err(e) => checks.push(DoctorCheck {
                name: "cycles".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot load cycle store: {}", e),
            }),
        }
    } else {
        checks.push(DoctorCheck {
            name: "cycles".to_string(),
            status: CheckStatus::Warning,
            message: format!("Cycle store {} does not exist yet", cycles_path.display()),
        });
    }

    let session = SessionStorage::new(FileStore::new(config.storage_path()));
    match (session.get(AuthToken), session.get(CachedProfile)) {
        (Ok(token), Ok(profile)) => checks.push(DoctorCheck {
            name: "session".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "token {}, profile {}",
                if token.is_some() { "present" } else { "absent" },
                profile.map(|p| p.full_name).unwrap_or_else(|| "absent".to_string())
            ),
        }),
        (Err(e), _) | (_, Err(e)) => checks.push(DoctorCheck {
            name: "session".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read session store: {}", e),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (use --input - to read it)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        version: OVULA_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Ovula Doctor Report");
        println!("===================");
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliFailure::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, CliFailure> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_today(today: Option<&str>) -> Result<NaiveDate, CliFailure> {
    match today {
        Some(s) => Ok(parse_date_str(s)?),
        None => Ok(dates::today()),
    }
}

fn parse_month(value: &str) -> Result<(i32, u32), CliFailure> {
    let usage = || CliFailure::Usage(format!("expected --month as YYYY-MM, got '{}'", value));
    let (year, month) = value.split_once('-').ok_or_else(usage)?;
    let year = year.parse().map_err(|_| usage())?;
    let month = month.parse().map_err(|_| usage())?;
    Ok((year, month))
}

fn emit<T: Serialize + ?Sized>(value: &T, format: &OutputFormat) -> Result<(), CliFailure> {
    let out = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    };
    println!("{}", out);
    Ok(())
}

/// Count records in the store, failing on the first malformed one
fn check_cycle_store(path: &Path) -> Result<usize, CycleError> {
    let data = fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(0);
    }
    let raw = CycleRecordAdapter::parse_response(&data)?;
    if let Some(issue) = CycleRecordAdapter::validate_records(&raw).first() {
        return Err(CycleError::ParseError(format!(
            "record {}: {}",
            issue.index, issue.message
        )));
    }
    Ok(raw.len())
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Cycle(CycleError),
    Json(serde_json::Error),
    Usage(String),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<CycleError> for CliFailure {
    fn from(e: CycleError) -> Self {
        CliFailure::Cycle(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::Cycle(e) => {
                let (code, hint) = match &e {
                    CycleError::ParseError(_) | CycleError::JsonError(_) => {
                        ("PARSE_ERROR", "Ensure input is a cycle array or a {success, data} envelope")
                    }
                    CycleError::DateParseError(_) => ("DATE_ERROR", "Use YYYY-MM-DD dates"),
                    CycleError::InvalidInput(_) => ("INVALID_INPUT", "Check the declared cycle values"),
                    CycleError::NotFound(_) => ("NOT_FOUND", "Run 'ovula list' to see cycle ids"),
                    CycleError::Backend(_) => ("BACKEND_ERROR", "The system of record rejected the request"),
                    CycleError::Storage(_) | CycleError::Io(_) => {
                        ("STORAGE_ERROR", "Run 'ovula doctor' to check the data directory")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CliFailure::Usage(msg) => CliError {
                code: "USAGE_ERROR".to_string(),
                message: msg,
                hint: Some("See 'ovula --help'".to_string()),
            },
            CliFailure::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            CliFailure::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    index: usize,
    cycle_id: Option<String>,
    error: String,
}

#[derive(Serialize)]
struct DoctorReport {
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
