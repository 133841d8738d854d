// Snapshot sources over exported table files

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::Value;
use sheetsync_recon::{CaptureError, RawRecord, SnapshotSource};

use crate::csv::{parse_rows, read_file_as_utf8, sniff_delimiter};

pub const DEFAULT_WAIT: Duration = Duration::from_secs(15);
pub const DEFAULT_POLL: Duration = Duration::from_millis(500);

/// How a file source waits for and cleans its table.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// For JSON, the key holding the record array when the top level is an
    /// object. Always used as the table label in errors.
    pub table: Option<String>,
    pub wait: Duration,
    pub poll: Duration,
    pub trim: bool,
    /// Accept a table with no records. Off by default: every stored record
    /// absent from an empty capture would be marked terminal.
    pub allow_empty: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            table: None,
            wait: DEFAULT_WAIT,
            poll: DEFAULT_POLL,
            trim: true,
            allow_empty: false,
        }
    }
}

/// Result of one look at the file.
enum Attempt {
    Ready(Vec<RawRecord>),
    NotYet,
}

/// Poll `load` until it yields records or `options.wait` runs out. An empty
/// table counts as not rendered yet unless `options.allow_empty`.
fn wait_for(
    path: &Path,
    options: &CaptureOptions,
    mut load: impl FnMut(&str) -> Result<Attempt, CaptureError>,
) -> Result<Vec<RawRecord>, CaptureError> {
    let started = Instant::now();
    loop {
        match read_file_as_utf8(path) {
            Ok(content) => {
                match load(&content)? {
                    Attempt::Ready(records) if records.is_empty() && !options.allow_empty => {
                        tracing::debug!(path = %path.display(), "table has no records yet");
                    }
                    Attempt::Ready(records) => {
                        tracing::debug!(path = %path.display(), records = records.len(), "snapshot captured");
                        return Ok(records);
                    }
                    Attempt::NotYet => {}
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CaptureError::Unavailable(format!("{}: {e}", path.display())));
            }
        }

        let waited = started.elapsed();
        if waited >= options.wait {
            return Err(CaptureError::TableNotFound {
                table: table_label(path, options),
                waited_ms: waited.as_millis() as u64,
            });
        }
        tracing::debug!(path = %path.display(), "table not ready; waiting");
        std::thread::sleep(options.poll.min(options.wait - waited));
    }
}

fn table_label(path: &Path, options: &CaptureOptions) -> String {
    options
        .table
        .clone()
        .unwrap_or_else(|| path.display().to_string())
}

/// Trim a captured value and fold multi-line text onto one line with `" | "`.
pub fn clean_value(raw: &str, trim: bool) -> String {
    if !raw.contains('\n') {
        return if trim { raw.trim().to_string() } else { raw.to_string() };
    }
    let lines: Vec<&str> = if trim {
        raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
    } else {
        raw.lines().collect()
    };
    lines.join(" | ")
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// An exported table as JSON: an array of objects, or an object holding that
/// array under the table name.
#[derive(Debug, Clone)]
pub struct JsonSnapshot {
    path: PathBuf,
    options: CaptureOptions,
}

impl JsonSnapshot {
    pub fn new(path: impl Into<PathBuf>, options: CaptureOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    fn decode(&self, content: &str) -> Result<Attempt, CaptureError> {
        // A half-written export reads as empty or truncated; try again later.
        if content.trim().is_empty() {
            return Ok(Attempt::NotYet);
        }
        let root: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) if e.is_eof() => return Ok(Attempt::NotYet),
            Err(e) => return Err(CaptureError::Malformed(e.to_string())),
        };

        let rows = match (&root, &self.options.table) {
            (Value::Array(rows), _) => rows,
            (Value::Object(map), Some(table)) => match map.get(table) {
                Some(Value::Array(rows)) => rows,
                Some(_) => {
                    return Err(CaptureError::Malformed(format!("'{table}' is not an array")));
                }
                None => return Ok(Attempt::NotYet),
            },
            (Value::Object(_), None) => {
                return Err(CaptureError::Malformed(
                    "top-level object needs a table name".into(),
                ));
            }
            _ => return Err(CaptureError::Malformed("expected an array of objects".into())),
        };

        let mut records: Vec<RawRecord> = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let Value::Object(fields) = row else {
                return Err(CaptureError::Malformed(format!("record {i} is not an object")));
            };
            records.push(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), clean_value(&scalar_text(v), self.options.trim)))
                    .collect(),
            );
        }
        Ok(Attempt::Ready(records))
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

impl SnapshotSource for JsonSnapshot {
    fn capture(&mut self) -> Result<Vec<RawRecord>, CaptureError> {
        wait_for(&self.path, &self.options, |content| self.decode(content))
    }

    fn describe(&self) -> String {
        format!("json snapshot {}", self.path.display())
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// An exported table as CSV: a header row, then one record per line.
#[derive(Debug, Clone)]
pub struct CsvSnapshot {
    path: PathBuf,
    delimiter: Option<u8>,
    options: CaptureOptions,
}

impl CsvSnapshot {
    pub fn new(path: impl Into<PathBuf>, delimiter: Option<u8>, options: CaptureOptions) -> Self {
        Self {
            path: path.into(),
            delimiter,
            options,
        }
    }

    fn decode(&self, content: &str) -> Result<Attempt, CaptureError> {
        let delimiter = self.delimiter.unwrap_or_else(|| sniff_delimiter(content));
        let mut rows = parse_rows(content, delimiter)
            .map_err(|e| CaptureError::Malformed(e.to_string()))?
            .into_iter();

        let Some(header) = rows.next() else {
            return Ok(Attempt::NotYet);
        };
        let header: Vec<String> = header.iter().map(|h| clean_value(h, true)).collect();

        let records: Vec<RawRecord> = rows
            .filter(|cells| cells.iter().any(|c| !c.is_empty()))
            .map(|cells| {
                header
                    .iter()
                    .zip(cells.iter())
                    .filter(|(name, _)| !name.is_empty())
                    .map(|(name, cell)| (name.clone(), clean_value(cell, self.options.trim)))
                    .collect()
            })
            .collect();
        Ok(Attempt::Ready(records))
    }
}

impl SnapshotSource for CsvSnapshot {
    fn capture(&mut self) -> Result<Vec<RawRecord>, CaptureError> {
        wait_for(&self.path, &self.options, |content| self.decode(content))
    }

    fn describe(&self) -> String {
        format!("csv snapshot {}", self.path.display())
    }
}
