//! `sheetsync-recon`: snapshot-to-ledger reconciliation engine.
//!
//! Pure engine crate: reads through the [`SnapshotSource`] and [`LedgerStore`]
//! traits, classifies records, and hands back a write plan. No file or network
//! IO of its own.

pub mod adapter;
pub mod clock;
pub mod config;
pub mod detect;
pub mod disappear;
pub mod engine;
pub mod error;
pub mod index;
pub mod key;
pub mod memory;
pub mod model;
pub mod planner;
pub mod schema;

pub use adapter::{LedgerStore, SnapshotSource};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ReconConfig, WriteStrategy};
pub use engine::{run, CommitMode, Reconciler};
pub use error::{CaptureError, ConfigError, ReconError, SchemaError, StoreIoError, StoreOp};
pub use model::{PassReport, PassState, PassSummary, RawRecord, RowSpan, WriteOp, WritePlan};
