//! Volatile-field comparison between a stored row and its incoming record.

use serde::Serialize;

use crate::model::{RawRecord, StoredRecord};
use crate::schema::ColumnLayout;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub column: usize,
    pub name: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Unchanged,
    Changed(Vec<FieldChange>),
}

impl Comparison {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

pub struct ChangeDetector<'a> {
    layout: &'a ColumnLayout,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(layout: &'a ColumnLayout) -> Self {
        Self { layout }
    }

    /// Exact string comparison over the volatile columns present in the
    /// layout. Everything else, the timestamp included, is ignored.
    pub fn compare(&self, existing: &StoredRecord, incoming: &RawRecord) -> Comparison {
        let changes: Vec<FieldChange> = self
            .layout
            .volatile()
            .iter()
            .filter_map(|&col| {
                let name = self.layout.name(col);
                let before = existing.cell(col);
                let after = incoming.get(name);
                (before != after).then(|| FieldChange {
                    column: col,
                    name: name.to_string(),
                    before: before.to_string(),
                    after: after.to_string(),
                })
            })
            .collect();

        if changes.is_empty() {
            Comparison::Unchanged
        } else {
            Comparison::Changed(changes)
        }
    }

    /// The full row to write for `incoming`: its value for every layout
    /// column, with the timestamp column set to `stamp`.
    pub fn output_row(&self, incoming: &RawRecord, stamp: &str) -> Vec<String> {
        let ts = self.layout.timestamp();
        self.layout
            .columns()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if Some(i) == ts {
                    stamp.to_string()
                } else {
                    incoming.get(name).to_string()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;

    fn layout() -> ColumnLayout {
        let config = ReconConfig::from_toml(
            r#"
name = "ventas"
identity = ["codigo"]
volatile = ["estado", "entrega", "transportista"]
status_field = "estado"
terminal_status = "delivered"
timestamp_field = "actualizado"
"#,
        )
        .unwrap();
        let header: Vec<String> = ["codigo", "cliente", "estado", "entrega", "actualizado"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        ColumnLayout::resolve(&header, &config).unwrap()
    }

    fn stored(cells: &[&str]) -> StoredRecord {
        StoredRecord {
            row: 2,
            cells: cells.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn volatile_change_detected() {
        let layout = layout();
        let det = ChangeDetector::new(&layout);
        let existing = stored(&["A1", "Ana", "pending", "no", "01/01"]);
        let incoming: RawRecord = [
            ("codigo", "A1"),
            ("cliente", "Ana"),
            ("estado", "shipped"),
            ("entrega", "no"),
        ]
        .into_iter()
        .collect();

        let Comparison::Changed(changes) = det.compare(&existing, &incoming) else {
            panic!("expected change");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].name, "estado");
        assert_eq!(changes[0].before, "pending");
        assert_eq!(changes[0].after, "shipped");
    }

    #[test]
    fn non_volatile_difference_ignored() {
        let layout = layout();
        let det = ChangeDetector::new(&layout);
        let existing = stored(&["A1", "Ana", "pending", "no", "01/01"]);
        let incoming: RawRecord = [
            ("codigo", "A1"),
            ("cliente", "Ana María"),
            ("estado", "pending"),
            ("entrega", "no"),
        ]
        .into_iter()
        .collect();
        assert_eq!(det.compare(&existing, &incoming), Comparison::Unchanged);
    }

    #[test]
    fn no_whitespace_normalization() {
        let layout = layout();
        let det = ChangeDetector::new(&layout);
        let existing = stored(&["A1", "Ana", "pending", "no"]);
        let incoming: RawRecord = [("estado", "pending "), ("entrega", "no")]
            .into_iter()
            .collect();
        assert!(det.compare(&existing, &incoming).is_changed());
    }

    #[test]
    fn missing_on_both_sides_is_equal() {
        let layout = layout();
        let det = ChangeDetector::new(&layout);
        // Ragged stored row, incoming lacks "entrega".
        let existing = stored(&["A1", "Ana", "pending"]);
        let incoming: RawRecord = [("estado", "pending")].into_iter().collect();
        assert_eq!(det.compare(&existing, &incoming), Comparison::Unchanged);
    }

    #[test]
    fn output_row_covers_every_column() {
        let layout = layout();
        let det = ChangeDetector::new(&layout);
        let incoming: RawRecord = [
            ("codigo", "A1"),
            ("estado", "shipped"),
            ("actualizado", "stale"),
            ("unknown", "dropped"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            det.output_row(&incoming, "2026-10-18 09:00:00"),
            vec!["A1", "", "shipped", "", "2026-10-18 09:00:00"]
        );
    }
}
