// CSV file as a ledger store

use std::io::Read;
use std::path::{Path, PathBuf};

use sheetsync_recon::memory::MemoryStore;
use sheetsync_recon::{LedgerStore, RowSpan, StoreIoError, StoreOp};

/// A CSV file held in memory for the length of a pass.
///
/// Reads come from the file as it was opened. Writes go to the in-memory
/// grid and reach disk on [`LedgerStore::flush`], which replaces the file
/// through a temp file + rename. The file is always written back as UTF-8.
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    delimiter: u8,
    grid: MemoryStore,
    dirty: bool,
}

impl CsvStore {
    /// Load `path`. The delimiter is sniffed unless given.
    pub fn open(path: impl Into<PathBuf>, delimiter: Option<u8>) -> Result<Self, StoreIoError> {
        let path = path.into();
        let content = read_file_as_utf8(&path).map_err(|e| {
            StoreIoError::with_source(StoreOp::ReadHeader, format!("cannot read {}", path.display()), e)
        })?;
        let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
        let rows = parse_rows(&content, delimiter).map_err(|e| {
            StoreIoError::with_source(StoreOp::ReadRows, format!("cannot parse {}", path.display()), e)
        })?;
        tracing::debug!(path = %path.display(), rows = rows.len(), delimiter = %(delimiter as char).escape_default(), "ledger loaded");

        Ok(Self {
            path,
            delimiter,
            grid: MemoryStore::from_rows(rows),
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn rows(&self) -> &[Vec<String>] {
        self.grid.rows()
    }

    fn persist(&self) -> Result<(), StoreIoError> {
        let tmp_path = self.path.with_extension("csv.tmp");
        let write_err = |e: csv::Error| {
            StoreIoError::with_source(StoreOp::Flush, format!("cannot write {}", tmp_path.display()), e)
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(&tmp_path)
            .map_err(write_err)?;

        for row in self.grid.rows() {
            // Trailing empties are not written, so rows may differ in width.
            let width = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
            writer.write_record(&row[..width]).map_err(write_err)?;
        }
        writer.flush().map_err(|e| {
            StoreIoError::with_source(StoreOp::Flush, format!("cannot write {}", tmp_path.display()), e)
        })?;
        drop(writer);

        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            StoreIoError::with_source(StoreOp::Flush, format!("cannot replace {}", self.path.display()), e)
        })
    }
}

impl LedgerStore for CsvStore {
    fn read_header(&mut self, span: RowSpan) -> Result<Vec<String>, StoreIoError> {
        self.grid.read_header(span)
    }

    fn read_rows(&mut self, span: RowSpan) -> Result<Vec<Vec<String>>, StoreIoError> {
        self.grid.read_rows(span)
    }

    fn write_row(&mut self, row: u32, values: &[String]) -> Result<(), StoreIoError> {
        self.dirty = true;
        self.grid.write_row(row, values)
    }

    fn write_cell(&mut self, row: u32, column: usize, value: &str) -> Result<(), StoreIoError> {
        self.dirty = true;
        self.grid.write_cell(row, column, value)
    }

    fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<(), StoreIoError> {
        self.dirty = true;
        self.grid.append_rows(rows)
    }

    fn flush(&mut self) -> Result<(), StoreIoError> {
        if !self.dirty {
            return Ok(());
        }
        self.persist()?;
        self.dirty = false;
        tracing::info!(path = %self.path.display(), "ledger written");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("csv ledger {}", self.path.display())
    }
}

pub(crate) fn parse_rows(content: &str, delimiter: u8) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    reader
        .records()
        .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
        .collect()
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map_or(1, |r| r.len())
            })
            .collect();

        let Some(&target) = counts.first() else {
            return best;
        };
        if target <= 1 {
            continue;
        }

        // More columns breaks ties.
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Windows-1252 fallback for Excel exports).
pub fn read_file_as_utf8(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}
