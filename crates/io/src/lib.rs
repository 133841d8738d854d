// File adapters: a CSV file as the ledger, exported tables as snapshots

pub mod csv;
pub mod snapshot;

pub use csv::CsvStore;
pub use snapshot::{CaptureOptions, CsvSnapshot, JsonSnapshot};
