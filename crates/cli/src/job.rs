//! Job files.
//!
//! A job binds one reconciliation config to the export it reads and the
//! ledger it writes:
//!
//! ```toml
//! [reconcile]
//! name = "ventas"
//! identity = ["Codigo"]
//! # ...
//!
//! [source]
//! kind = "json"
//! path = "exports/ventas.json"
//! table = "ventasList"
//!
//! [store]
//! kind = "sheets"
//! spreadsheet_id = "1AbC..."
//! sheet = "Ventas"
//! ```
//!
//! Relative paths resolve against the job file's directory, after `~` and
//! `$VAR` expansion.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use sheetsync_io::CaptureOptions;
use sheetsync_recon::ReconConfig;

pub const DEFAULT_TOKEN_ENV: &str = "SHEETSYNC_TOKEN";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub reconcile: ReconConfig,
    pub source: SourceConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Json,
    Csv,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub path: String,
    /// JSON: key holding the record array. Also the label in capture errors.
    #[serde(default)]
    pub table: Option<String>,
    /// How long to wait for the export to appear before giving up.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
    #[serde(default = "default_true")]
    pub trim: bool,
    /// CSV only; sniffed when absent.
    #[serde(default)]
    pub delimiter: Option<char>,
    /// Treat an export with no records as a real, empty snapshot (marking
    /// every stored record terminal) instead of a capture failure.
    #[serde(default)]
    pub allow_empty: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Csv {
        path: String,
        #[serde(default)]
        delimiter: Option<char>,
    },
    Sheets {
        spreadsheet_id: String,
        sheet: String,
        #[serde(default = "default_token_env")]
        token_env: String,
        #[serde(default)]
        api_base: Option<String>,
    },
}

fn default_wait_secs() -> u64 {
    CaptureOptions::default().wait.as_secs()
}

fn default_true() -> bool {
    true
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

#[derive(Debug)]
pub enum JobError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(String),
    Invalid(String),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "cannot read job file {}: {source}", path.display())
            }
            Self::Parse(msg) => write!(f, "job file parse error: {msg}"),
            Self::Invalid(msg) => write!(f, "invalid job: {msg}"),
        }
    }
}

impl std::error::Error for JobError {}

/// `<config dir>/sheetsync/job.toml`, e.g. `~/.config/sheetsync/job.toml`.
pub fn default_job_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sheetsync").join("job.toml"))
}

impl JobConfig {
    /// Read, parse and validate a job file. Paths in the result are resolved.
    pub fn load(path: &Path) -> Result<Self, JobError> {
        let content = std::fs::read_to_string(path).map_err(|source| JobError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml(&content, base_dir)
    }

    pub fn from_toml(input: &str, base_dir: &Path) -> Result<Self, JobError> {
        let mut job: JobConfig =
            toml::from_str(input).map_err(|e| JobError::Parse(e.to_string()))?;
        job.validate()?;
        job.source.path = resolve_path(base_dir, &job.source.path)?;
        if let StoreConfig::Csv { path, .. } = &mut job.store {
            *path = resolve_path(base_dir, path)?;
        }
        Ok(job)
    }

    fn validate(&self) -> Result<(), JobError> {
        self.reconcile
            .validate()
            .map_err(|e| JobError::Invalid(format!("[reconcile] {e}")))?;

        if self.source.path.trim().is_empty() {
            return Err(JobError::Invalid("[source] path must not be empty".into()));
        }
        check_delimiter("source", self.source.delimiter)?;
        if self.source.kind == SourceKind::Json && self.source.delimiter.is_some() {
            return Err(JobError::Invalid(
                "[source] delimiter only applies to kind = \"csv\"".into(),
            ));
        }

        match &self.store {
            StoreConfig::Csv { path, delimiter } => {
                if path.trim().is_empty() {
                    return Err(JobError::Invalid("[store] path must not be empty".into()));
                }
                check_delimiter("store", *delimiter)?;
            }
            StoreConfig::Sheets {
                spreadsheet_id,
                sheet,
                token_env,
                ..
            } => {
                for (field, value) in [
                    ("spreadsheet_id", spreadsheet_id),
                    ("sheet", sheet),
                    ("token_env", token_env),
                ] {
                    if value.trim().is_empty() {
                        return Err(JobError::Invalid(format!("[store] {field} must not be empty")));
                    }
                }
            }
        }
        Ok(())
    }
}

impl SourceConfig {
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            table: self.table.clone(),
            wait: Duration::from_secs(self.wait_secs),
            trim: self.trim,
            allow_empty: self.allow_empty,
            ..CaptureOptions::default()
        }
    }

    /// Validated ASCII in [`JobConfig::load`].
    pub fn delimiter_byte(&self) -> Option<u8> {
        self.delimiter.map(|c| c as u8)
    }
}

impl StoreConfig {
    pub fn label(&self) -> String {
        match self {
            Self::Csv { path, .. } => format!("csv {path}"),
            Self::Sheets {
                spreadsheet_id,
                sheet,
                ..
            } => format!("google sheet {spreadsheet_id} / {sheet}"),
        }
    }
}

fn check_delimiter(section: &str, delimiter: Option<char>) -> Result<(), JobError> {
    match delimiter {
        Some(c) if !c.is_ascii() => Err(JobError::Invalid(format!(
            "[{section}] delimiter must be a single ASCII character, got '{c}'"
        ))),
        _ => Ok(()),
    }
}

fn resolve_path(base_dir: &Path, raw: &str) -> Result<String, JobError> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| JobError::Invalid(format!("cannot expand path '{raw}': {e}")))?;
    let path = PathBuf::from(expanded.as_ref());
    let resolved = if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    };
    Ok(resolved.to_string_lossy().into_owned())
}
