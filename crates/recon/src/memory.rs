//! In-memory adapters, for tests and dry runs.

use crate::adapter::{LedgerStore, SnapshotSource};
use crate::error::{CaptureError, StoreIoError, StoreOp};
use crate::model::{RawRecord, RowSpan};

/// A grid of cells where `grid[0]` is sheet row 1.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    grid: Vec<Vec<String>>,
    fail_after: Option<usize>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            grid: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
            ..Self::default()
        }
    }

    /// Let `n` write calls succeed, then fail every later one.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.grid
    }

    /// Cell at 1-based `row`, 0-based `column`; "" when outside the grid.
    pub fn cell(&self, row: u32, column: usize) -> &str {
        (row as usize)
            .checked_sub(1)
            .and_then(|r| self.grid.get(r))
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Successful write calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn last_populated(&self) -> usize {
        self.grid
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1)
    }

    fn check_write(&mut self, op: StoreOp) -> Result<(), StoreIoError> {
        if let Some(limit) = self.fail_after {
            if self.writes >= limit {
                return Err(StoreIoError::new(op, format!("injected failure after {limit} writes")));
            }
        }
        self.writes += 1;
        Ok(())
    }

    fn row_mut(&mut self, row: u32, op: StoreOp) -> Result<&mut Vec<String>, StoreIoError> {
        let idx = (row as usize)
            .checked_sub(1)
            .ok_or_else(|| StoreIoError::new(op, "row 0 is not addressable"))?;
        if self.grid.len() <= idx {
            self.grid.resize(idx + 1, Vec::new());
        }
        Ok(&mut self.grid[idx])
    }
}

fn clip(row: &[String], width: usize) -> Vec<String> {
    row.iter().take(width).cloned().collect()
}

impl LedgerStore for MemoryStore {
    fn read_header(&mut self, span: RowSpan) -> Result<Vec<String>, StoreIoError> {
        let idx = (span.start as usize)
            .checked_sub(1)
            .ok_or_else(|| StoreIoError::new(StoreOp::ReadHeader, "row 0 is not addressable"))?;
        Ok(self.grid.get(idx).map(|r| clip(r, span.width)).unwrap_or_default())
    }

    fn read_rows(&mut self, span: RowSpan) -> Result<Vec<Vec<String>>, StoreIoError> {
        let start = (span.start as usize)
            .checked_sub(1)
            .ok_or_else(|| StoreIoError::new(StoreOp::ReadRows, "row 0 is not addressable"))?;
        let end = span
            .end
            .map_or(self.last_populated(), |e| (e as usize).min(self.last_populated()));
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(self.grid[start..end].iter().map(|r| clip(r, span.width)).collect())
    }

    fn write_row(&mut self, row: u32, values: &[String]) -> Result<(), StoreIoError> {
        self.check_write(StoreOp::WriteRow)?;
        let cells = self.row_mut(row, StoreOp::WriteRow)?;
        if cells.len() < values.len() {
            cells.resize(values.len(), String::new());
        }
        cells[..values.len()].clone_from_slice(values);
        Ok(())
    }

    fn write_cell(&mut self, row: u32, column: usize, value: &str) -> Result<(), StoreIoError> {
        self.check_write(StoreOp::WriteCell)?;
        let cells = self.row_mut(row, StoreOp::WriteCell)?;
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value.to_string();
        Ok(())
    }

    fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<(), StoreIoError> {
        self.check_write(StoreOp::AppendRows)?;
        let at = self.last_populated();
        self.grid.splice(at..at, rows.iter().cloned());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory store ({} rows)", self.grid.len())
    }
}

/// Serves a fixed snapshot, or a fixed capture failure.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<RawRecord>,
    missing_table: Option<String>,
}

impl MemorySource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            missing_table: None,
        }
    }

    /// A source whose `table` never renders.
    pub fn missing(table: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            missing_table: Some(table.into()),
        }
    }

    pub fn set_records(&mut self, records: Vec<RawRecord>) {
        self.records = records;
    }
}

impl SnapshotSource for MemorySource {
    fn capture(&mut self) -> Result<Vec<RawRecord>, CaptureError> {
        match self.missing_table {
            Some(ref table) => Err(CaptureError::TableNotFound {
                table: table.clone(),
                waited_ms: 0,
            }),
            None => Ok(self.records.clone()),
        }
    }

    fn describe(&self) -> String {
        format!("memory source ({} records)", self.records.len())
    }
}
