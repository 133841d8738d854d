//! Google Sheets client: the `spreadsheets.values` slice a ledger needs.
//!
//! Blocking reqwest client (no Tokio runtime required). Reads with `get`,
//! rewrites with `batchUpdate`, appends with `append`. The bearer token is
//! the caller's business; nothing here mints or refreshes one.
//!
//! No retries. A failed call surfaces as a store error and the pass stops.

pub mod a1;
mod client;
mod credentials;
mod store;

pub use client::{SheetsClient, SheetsError, ValueRange, DEFAULT_API_BASE};
pub use credentials::SheetsCredentials;
pub use store::SheetsStore;
