//! One sheet tab as a ledger store.

use sheetsync_recon::{LedgerStore, RowSpan, StoreIoError, StoreOp, WriteOp, WritePlan};

use crate::a1;
use crate::client::{SheetsClient, SheetsError, ValueRange};

pub struct SheetsStore {
    client: SheetsClient,
    sheet: String,
    data_start_row: u32,
}

impl SheetsStore {
    pub fn new(client: SheetsClient, sheet: impl Into<String>) -> Self {
        Self {
            client,
            sheet: sheet.into(),
            data_start_row: 2,
        }
    }

    /// First row below the header; appends are anchored there.
    pub fn with_data_start(mut self, row: u32) -> Self {
        self.data_start_row = row;
        self
    }

    fn value_range(&self, op: &WriteOp) -> ValueRange {
        match op {
            WriteOp::Row { row, values } => ValueRange {
                range: a1::row(&self.sheet, *row, values.len()),
                values: vec![values.clone()],
            },
            WriteOp::Cell { row, column, value } => ValueRange {
                range: a1::cell(&self.sheet, *row, *column),
                values: vec![vec![value.clone()]],
            },
        }
    }

    fn err(op: StoreOp, range: &str) -> impl FnOnce(SheetsError) -> StoreIoError + '_ {
        move |e| StoreIoError::with_source(op, range, e)
    }
}

impl LedgerStore for SheetsStore {
    fn read_header(&mut self, span: RowSpan) -> Result<Vec<String>, StoreIoError> {
        let range = a1::span(&self.sheet, span);
        let rows = self
            .client
            .get_values(&range)
            .map_err(Self::err(StoreOp::ReadHeader, &range))?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    fn read_rows(&mut self, span: RowSpan) -> Result<Vec<Vec<String>>, StoreIoError> {
        let range = a1::span(&self.sheet, span);
        self.client
            .get_values(&range)
            .map_err(Self::err(StoreOp::ReadRows, &range))
    }

    fn write_row(&mut self, row: u32, values: &[String]) -> Result<(), StoreIoError> {
        let range = a1::row(&self.sheet, row, values.len());
        self.client
            .update_values(&range, &[values.to_vec()])
            .map_err(Self::err(StoreOp::WriteRow, &range))
    }

    fn write_cell(&mut self, row: u32, column: usize, value: &str) -> Result<(), StoreIoError> {
        let range = a1::cell(&self.sheet, row, column);
        self.client
            .update_values(&range, &[vec![value.to_string()]])
            .map_err(Self::err(StoreOp::WriteCell, &range))
    }

    fn append_rows(&mut self, rows: &[Vec<String>]) -> Result<(), StoreIoError> {
        let range = a1::cell(&self.sheet, self.data_start_row, 0);
        self.client
            .append(&range, rows)
            .map_err(Self::err(StoreOp::AppendRows, &range))
    }

    /// One `batchUpdate` for every update, then one `append` for the inserts.
    fn apply(&mut self, plan: &WritePlan) -> Result<(), StoreIoError> {
        if !plan.updates.is_empty() {
            let data: Vec<ValueRange> = plan.updates.iter().map(|op| self.value_range(op)).collect();
            let op = if plan.updates.iter().all(|op| matches!(op, WriteOp::Cell { .. })) {
                StoreOp::WriteCell
            } else {
                StoreOp::WriteRow
            };
            let label = format!("batch of {} ranges", data.len());
            let cells = self
                .client
                .batch_update(&data)
                .map_err(Self::err(op, &label))?;
            tracing::info!(ranges = data.len(), cells, sheet = %self.sheet, "batch update applied");
        }
        if !plan.inserts.is_empty() {
            self.append_rows(&plan.inserts)?;
            tracing::info!(rows = plan.inserts.len(), sheet = %self.sheet, "rows appended");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("google sheet {} / {}", self.client.spreadsheet_id(), self.sheet)
    }
}
