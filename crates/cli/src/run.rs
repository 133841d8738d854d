// `sheetsync run` and `sheetsync validate`

use std::path::PathBuf;

use sheetsync_io::{CsvSnapshot, CsvStore, JsonSnapshot};
use sheetsync_recon::schema::ColumnLayout;
use sheetsync_recon::{
    CommitMode, LedgerStore, PassReport, ReconError, Reconciler, RowSpan, SnapshotSource,
};
use sheetsync_sheets_client::{SheetsClient, SheetsCredentials, SheetsStore};

use crate::exit_codes::{EXIT_ERROR, EXIT_INVALID_JOB};
use crate::job::{JobConfig, SourceConfig, SourceKind, StoreConfig};
use crate::CliError;

pub fn cmd_run(
    job_path: PathBuf,
    dry_run: bool,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let job = JobConfig::load(&job_path)?;
    let reconciler = Reconciler::new(&job.reconcile).map_err(ReconError::from)?;

    let mut source = open_source(&job.source);
    let mut store = open_store(&job)?;
    let mode = if dry_run { CommitMode::DryRun } else { CommitMode::Apply };
    tracing::info!(
        job = %job_path.display(),
        source = %source.describe(),
        store = %store.describe(),
        dry_run,
        "starting pass"
    );

    let report = reconciler.run_pass(source.as_mut(), store.as_mut(), mode)?;

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&report, &job.reconcile.terminal_status, &job.store.label());
    Ok(())
}

pub fn cmd_validate(job_path: PathBuf) -> Result<(), CliError> {
    let job = JobConfig::load(&job_path)?;
    let config = &job.reconcile;

    eprintln!(
        "valid: job '{}' ({} {} -> {}), {} identity field(s), {} volatile field(s), {} writes",
        config.name,
        job.source.kind,
        job.source.path,
        job.store.label(),
        config.identity.len(),
        config.volatile.len(),
        config.strategy,
    );

    // CSV ledgers are local, so the header can be checked without a pass.
    if let StoreConfig::Csv { path, delimiter } = &job.store {
        let mut store = CsvStore::open(path, delimiter.map(|c| c as u8)).map_err(ReconError::from)?;
        let header = store
            .read_header(RowSpan::single(config.header_row, config.max_columns))
            .map_err(ReconError::from)?;
        let layout = ColumnLayout::resolve(&header, config).map_err(ReconError::from)?;
        eprintln!("header: {} column(s) at row {}", layout.width(), config.header_row);
    }
    Ok(())
}

fn open_source(config: &SourceConfig) -> Box<dyn SnapshotSource> {
    let options = config.capture_options();
    match config.kind {
        SourceKind::Json => Box::new(JsonSnapshot::new(&config.path, options)),
        SourceKind::Csv => Box::new(CsvSnapshot::new(
            &config.path,
            config.delimiter_byte(),
            options,
        )),
    }
}

fn open_store(job: &JobConfig) -> Result<Box<dyn LedgerStore>, CliError> {
    match &job.store {
        StoreConfig::Csv { path, delimiter } => {
            let store =
                CsvStore::open(path, delimiter.map(|c| c as u8)).map_err(ReconError::from)?;
            Ok(Box::new(store))
        }
        StoreConfig::Sheets {
            spreadsheet_id,
            sheet,
            token_env,
            api_base,
        } => {
            let creds = SheetsCredentials::from_env(token_env, api_base.as_deref()).map_err(|e| {
                CliError::new(EXIT_INVALID_JOB, e.to_string())
                    .with_hint(format!("export {token_env}=$(gcloud auth print-access-token)"))
            })?;
            let client = SheetsClient::new(creds, spreadsheet_id.as_str())
                .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
            let store = SheetsStore::new(client, sheet.as_str())
                .with_data_start(job.reconcile.first_data_row());
            Ok(Box::new(store))
        }
    }
}

fn print_summary(report: &PassReport, terminal_status: &str, store_label: &str) {
    let s = &report.summary;
    let verb = if report.meta.dry_run { "would write" } else { "wrote" };
    eprintln!(
        "{}: {} snapshot record(s) vs {} ledger row(s), {} updated, {} inserted, {} marked {}, {} unchanged",
        report.meta.config_name,
        s.snapshot_records,
        s.stored_rows,
        s.updated,
        s.inserted,
        s.marked_terminal,
        terminal_status,
        s.unchanged,
    );
    if s.skipped_blank > 0 || s.duplicate_snapshot_keys > 0 || s.shadowed_store_rows > 0 {
        eprintln!(
            "skipped: {} blank key(s), {} duplicate snapshot key(s), {} shadowed ledger row(s)",
            s.skipped_blank, s.duplicate_snapshot_keys, s.shadowed_store_rows,
        );
    }
    if report.plan.is_empty() {
        eprintln!("{store_label}: up to date");
    } else {
        eprintln!("{store_label}: {verb} {} range(s)", report.plan.write_count());
    }
}
