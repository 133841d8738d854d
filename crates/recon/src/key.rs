use serde::Serialize;

use crate::model::{RawRecord, StoredRecord};
use crate::schema::ColumnLayout;

/// Composite identity of a record: identity field values joined in
/// declaration order. Compared as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BusinessKey(String);

impl BusinessKey {
    /// Wrap an already-joined key. Prefer [`KeyBuilder`] for records.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds keys for raw records (by column name) and stored rows (by position).
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    names: Vec<String>,
    positions: Vec<usize>,
    separator: String,
}

impl KeyBuilder {
    pub fn new(layout: &ColumnLayout, separator: &str) -> Self {
        Self {
            names: layout
                .identity()
                .iter()
                .map(|&p| layout.name(p).to_string())
                .collect(),
            positions: layout.identity().to_vec(),
            separator: separator.to_string(),
        }
    }

    /// `None` when every identity field is empty.
    pub fn for_raw(&self, record: &RawRecord) -> Option<BusinessKey> {
        self.join(self.names.iter().map(|n| record.get(n)))
    }

    /// `None` when every identity cell is empty (spacer rows).
    pub fn for_stored(&self, record: &StoredRecord) -> Option<BusinessKey> {
        self.join(self.positions.iter().map(|&p| record.cell(p)))
    }

    fn join<'a>(&self, parts: impl Iterator<Item = &'a str>) -> Option<BusinessKey> {
        let parts: Vec<&str> = parts.collect();
        if parts.iter().all(|p| p.is_empty()) {
            return None;
        }
        Some(BusinessKey(parts.join(&self.separator)))
    }
}
