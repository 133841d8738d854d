//! Match index over the store contents read at the start of a pass.

use std::collections::HashMap;

use crate::key::{BusinessKey, KeyBuilder};
use crate::model::StoredRecord;

#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    entries: HashMap<BusinessKey, StoredRecord>,
    stored_rows: usize,
    shadowed: usize,
    last_row: u32,
}

impl KeyIndex {
    /// Index `rows`, the first of which sits at 1-based `first_row`.
    ///
    /// A later row with the same key replaces the earlier one in the index;
    /// the shadowed row is counted but never matched. Rows with a blank key
    /// are not indexed but still count toward the last populated row, which
    /// is only as accurate as the columns `rows` was read with.
    pub fn build(rows: Vec<Vec<String>>, first_row: u32, keys: &KeyBuilder) -> Self {
        let stored_rows = rows.len();
        let populated = rows
            .iter()
            .rposition(|cells| cells.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1);
        let last_row = (first_row + populated as u32).saturating_sub(1);
        let mut entries: HashMap<BusinessKey, StoredRecord> = HashMap::with_capacity(stored_rows);
        let mut shadowed = 0;

        for (i, cells) in rows.into_iter().enumerate() {
            let record = StoredRecord {
                row: first_row + i as u32,
                cells,
            };
            let Some(key) = keys.for_stored(&record) else {
                continue;
            };
            if let Some(prev) = entries.insert(key.clone(), record) {
                shadowed += 1;
                tracing::warn!(%key, shadowed_row = prev.row, "duplicate key in store; later row wins");
            }
        }

        Self {
            entries,
            stored_rows,
            shadowed,
            last_row,
        }
    }

    pub fn get(&self, key: &BusinessKey) -> Option<&StoredRecord> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed records in ascending row order.
    pub fn by_row(&self) -> Vec<(&BusinessKey, &StoredRecord)> {
        let mut all: Vec<_> = self.entries.iter().collect();
        all.sort_by_key(|(_, rec)| rec.row);
        all
    }

    /// Rows read, including blank and shadowed ones.
    pub fn stored_rows(&self) -> usize {
        self.stored_rows
    }

    pub fn shadowed(&self) -> usize {
        self.shadowed
    }

    /// Last row with any non-empty cell, or the row above `first_row` when
    /// the store has no data.
    pub fn last_row(&self) -> u32 {
        self.last_row
    }
}
