//! Contracts for the two external collaborators of a pass.

use crate::error::{CaptureError, StoreIoError};
use crate::model::{RawRecord, RowSpan, WriteOp, WritePlan};

/// Produces the current snapshot, in the order the source lists it.
pub trait SnapshotSource {
    /// Fails with [`CaptureError`] when the table cannot be found within the
    /// source's own bounded wait.
    fn capture(&mut self) -> Result<Vec<RawRecord>, CaptureError>;

    /// Label for logs.
    fn describe(&self) -> String {
        "snapshot source".into()
    }
}

/// A tabular store addressed by 1-based row and 0-based column.
pub trait LedgerStore {
    fn read_header(&mut self, span: RowSpan) -> Result<Vec<String>, StoreIoError>;

    /// Rows in `span`, positionally aligned to the header. Trailing empty
    /// cells may be omitted.
    fn read_rows(&mut self, span: RowSpan) -> Result<Vec<Vec<String>>, StoreIoError>;

    /// Overwrite one full row in place. Never shifts other rows.
    fn write_row(&mut self, row: u32, values: &[String]) -> Result<(), StoreIoError>;

    fn write_cell(&mut self, row: u32, column: usize, value: &str) -> Result<(), StoreIoError>;

    /// Append after the last populated row, keeping the given order.
    fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<(), StoreIoError>;

    /// Apply a whole plan. The default issues the updates one by one, then a
    /// single append; the first failure stops it and earlier writes stay.
    /// Stores with a batch endpoint should override this.
    fn apply(&mut self, plan: &WritePlan) -> Result<(), StoreIoError> {
        for op in &plan.updates {
            match op {
                WriteOp::Row { row, values } => self.write_row(*row, values)?,
                WriteOp::Cell { row, column, value } => self.write_cell(*row, *column, value)?,
            }
        }
        if !plan.inserts.is_empty() {
            self.append_rows(&plan.inserts)?;
        }
        Ok(())
    }

    /// Persist buffered writes, if the store buffers.
    fn flush(&mut self) -> Result<(), StoreIoError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "ledger store".into()
    }
}
