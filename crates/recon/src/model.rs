use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::WriteStrategy;
use crate::key::BusinessKey;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One captured record: column name → value. Missing fields read as "".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<HashMap<String, String>> for RawRecord {
    fn from(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A row as read from the store, at its 1-based sheet position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub row: u32,
    pub cells: Vec<String>,
}

impl StoredRecord {
    pub fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    /// Cells padded (or cut) to `width`. Stores drop trailing empties.
    pub fn padded(&self, width: usize) -> Vec<String> {
        let mut cells = self.cells.clone();
        cells.resize(width, String::new());
        cells
    }
}

/// Rows to read from the store: 1-based, inclusive, `end = None` reads to the
/// last populated row. `width` bounds the columns read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub start: u32,
    pub end: Option<u32>,
    pub width: usize,
}

impl RowSpan {
    pub fn single(row: u32, width: usize) -> Self {
        Self {
            start: row,
            end: Some(row),
            width,
        }
    }

    pub fn from_row(start: u32, width: usize) -> Self {
        Self {
            start,
            end: None,
            width,
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Insert,
    Update,
    MarkTerminal,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::MarkTerminal => write!(f, "mark_terminal"),
        }
    }
}

/// One per-record decision of a pass.
///
/// `values` is always the full row as it should read after the write.
/// `changed` lists the 0-based columns whose stored value differs from it;
/// empty for inserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEntry {
    pub key: BusinessKey,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_row: Option<u32>,
    pub values: Vec<String>,
    pub changed: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    pub fn count(&self, action: Action) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// WritePlan
// ---------------------------------------------------------------------------

/// A positional write against an existing row. `column` is 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WriteOp {
    Row { row: u32, values: Vec<String> },
    Cell { row: u32, column: usize, value: String },
}

impl WriteOp {
    pub fn row(&self) -> u32 {
        match self {
            Self::Row { row, .. } | Self::Cell { row, .. } => *row,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WritePlan {
    pub strategy: WriteStrategy,
    pub updates: Vec<WriteOp>,
    pub inserts: Vec<Vec<String>>,
    /// Row the first appended record is expected to land on.
    pub first_insert_row: u32,
}

impl WritePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.updates.len() + self.inserts.len()
    }
}

// ---------------------------------------------------------------------------
// Pass report
// ---------------------------------------------------------------------------

/// Driver states, in the only order a pass may visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Idle,
    SchemaResolved,
    Indexed,
    Classified,
    Planned,
    Committed,
}

impl std::fmt::Display for PassState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::SchemaResolved => write!(f, "schema_resolved"),
            Self::Indexed => write!(f, "indexed"),
            Self::Classified => write!(f, "classified"),
            Self::Planned => write!(f, "planned"),
            Self::Committed => write!(f, "committed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub snapshot_records: usize,
    pub stored_rows: usize,
    pub inserted: usize,
    pub updated: usize,
    pub marked_terminal: usize,
    pub unchanged: usize,
    pub skipped_blank: usize,
    pub shadowed_store_rows: usize,
    pub duplicate_snapshot_keys: usize,
    pub action_counts: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub meta: PassMeta,
    pub summary: PassSummary,
    pub changes: ChangeSet,
    pub plan: WritePlan,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub state: PassState,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_missing_reads_empty() {
        let rec: RawRecord = [("Codigo", "V-100")].into_iter().collect();
        assert_eq!(rec.get("Codigo"), "V-100");
        assert_eq!(rec.get("Estado"), "");
        assert!(!rec.contains("Estado"));
    }

    #[test]
    fn stored_record_pads_ragged_rows() {
        let rec = StoredRecord {
            row: 4,
            cells: vec!["a".into(), "b".into()],
        };
        assert_eq!(rec.cell(5), "");
        assert_eq!(rec.padded(4), vec!["a", "b", "", ""]);
    }

    #[test]
    fn pass_states_are_ordered() {
        assert!(PassState::Idle < PassState::SchemaResolved);
        assert!(PassState::Planned < PassState::Committed);
    }

    #[test]
    fn write_op_serializes_tagged() {
        let op = WriteOp::Cell {
            row: 7,
            column: 4,
            value: "entregado".into(),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["kind"], "cell");
        assert_eq!(json["row"], 7);
        assert_eq!(op.row(), 7);
    }
}
