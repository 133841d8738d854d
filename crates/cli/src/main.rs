// sheetsync CLI - mirror a source export into a spreadsheet ledger

mod exit_codes;
mod job;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use sheetsync_recon::{CaptureError, ReconError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use exit_codes::{recon_exit_code, EXIT_INVALID_JOB, EXIT_SUCCESS, EXIT_USAGE};
use job::JobError;

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(about = "Reconcile a source export into a spreadsheet ledger")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More logging on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation pass
    #[command(after_help = "\
Examples:
  sheetsync run jobs/ventas.toml
  sheetsync run jobs/ventas.toml --dry-run --json
  sheetsync run --output last-pass.json -v

Without JOB, reads $SHEETSYNC_JOB, then ~/.config/sheetsync/job.toml.

Exit codes:
  0  pass committed (or planned, with --dry-run)
  3  invalid job file
  4  ledger header missing an identity or status column
  5  export missing or table not found
  6  ledger read/write failed")]
    Run {
        /// Path to the job file
        #[arg(env = "SHEETSYNC_JOB")]
        job: Option<PathBuf>,

        /// Plan the writes and report them without touching the ledger
        #[arg(long)]
        dry_run: bool,

        /// Print the pass report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Check a job file (and a CSV ledger's header) without running a pass
    #[command(after_help = "\
Examples:
  sheetsync validate jobs/ventas.toml")]
    Validate {
        /// Path to the job file
        #[arg(env = "SHEETSYNC_JOB")]
        job: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            job,
            dry_run,
            json,
            output,
        } => resolve_job(job).and_then(|job| run::cmd_run(job, dry_run, json, output)),
        Commands::Validate { job } => resolve_job(job).and_then(run::cmd_validate),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn resolve_job(job: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match job {
        Some(path) => Ok(path),
        None => job::default_job_path().ok_or_else(|| {
            CliError::new(EXIT_USAGE, "no job file given and no config directory found")
                .with_hint("pass a job path or set SHEETSYNC_JOB")
        }),
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<JobError> for CliError {
    fn from(err: JobError) -> Self {
        let hint = match &err {
            JobError::Read { .. } => Some("pass a job path, or set SHEETSYNC_JOB".to_string()),
            JobError::Parse(_) => Some("check the [reconcile], [source] and [store] tables".to_string()),
            JobError::Invalid(_) => None,
        };
        Self { code: EXIT_INVALID_JOB, message: err.to_string(), hint }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::Schema(_) => {
                Some("compare [reconcile] column names and header_row with the ledger's header".to_string())
            }
            ReconError::Capture(CaptureError::TableNotFound { .. }) => {
                Some("is the export still being written, or empty? raise [source] wait_secs, or set allow_empty".to_string())
            }
            ReconError::Store(_) => {
                Some("writes before the failure stay applied; the next pass picks up the rest".to_string())
            }
            _ => None,
        };
        Self { code, message: error_chain(&err), hint }
    }
}

/// `outer: cause: root cause`
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use exit_codes::{EXIT_CAPTURE, EXIT_SCHEMA, EXIT_STORE_IO};
    use sheetsync_recon::{SchemaError, StoreIoError, StoreOp};

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn store_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: CliError =
            ReconError::from(StoreIoError::with_source(StoreOp::ReadHeader, "cannot read ledger.csv", io))
                .into();
        assert_eq!(err.code, EXIT_STORE_IO);
        assert_eq!(err.message, "store read_header failed: cannot read ledger.csv: no such file");
        assert!(err.hint.is_some());
    }

    #[test]
    fn schema_and_capture_codes() {
        let err: CliError = ReconError::from(SchemaError::EmptyHeader).into();
        assert_eq!(err.code, EXIT_SCHEMA);

        let err: CliError = ReconError::from(CaptureError::TableNotFound {
            table: "ventasList".into(),
            waited_ms: 0,
        })
        .into();
        assert_eq!(err.code, EXIT_CAPTURE);
        assert!(err.hint.unwrap().contains("wait_secs"));
    }

    #[test]
    fn job_errors_are_invalid_job() {
        let err: CliError = JobError::Invalid("[store] sheet must not be empty".into()).into();
        assert_eq!(err.code, EXIT_INVALID_JOB);
        assert_eq!(err.message, "invalid job: [store] sheet must not be empty");
    }

    #[test]
    fn verbose_flag_counts() {
        let cli = Cli::try_parse_from(["sheetsync", "-vv", "validate", "job.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Validate { job: Some(_) }));
    }
}
