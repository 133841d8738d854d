//! Terminal transition for stored keys that left the snapshot.
//!
//! The source only lists records it still considers active, so absence is
//! the only completion signal. A capture that silently returns a partial
//! table will mark the missing records terminal; nothing here can tell the
//! two cases apart.

use std::collections::HashSet;

use crate::index::KeyIndex;
use crate::key::BusinessKey;
use crate::model::{Action, ChangeEntry};
use crate::schema::ColumnLayout;

/// One `MarkTerminal` entry per indexed key that is not in `seen` and whose
/// stored status is not already `terminal`, in ascending row order.
///
/// Only the status, timestamp and terminal-stamp cells are listed as
/// changed; `values` carries the stored row with those cells replaced.
pub fn mark_disappeared(
    index: &KeyIndex,
    seen: &HashSet<BusinessKey>,
    layout: &ColumnLayout,
    terminal: &str,
    stamp: &str,
) -> Vec<ChangeEntry> {
    let status = layout.status();
    let mut entries = Vec::new();

    for (key, record) in index.by_row() {
        if seen.contains(key) || record.cell(status) == terminal {
            continue;
        }

        let mut values = record.padded(layout.width());
        let mut changed = Vec::with_capacity(3);

        values[status] = terminal.to_string();
        changed.push(status);
        for col in [layout.timestamp(), layout.terminal_stamp()].into_iter().flatten() {
            values[col] = stamp.to_string();
            changed.push(col);
        }

        tracing::debug!(%key, row = record.row, previous = record.cell(status), "record left snapshot");
        entries.push(ChangeEntry {
            key: key.clone(),
            action: Action::MarkTerminal,
            target_row: Some(record.row),
            values,
            changed,
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use crate::key::KeyBuilder;
    use crate::model::StoredRecord;

    const STAMP: &str = "18/10/2026, 09:00:00";

    fn setup(extra: &str) -> (ColumnLayout, KeyBuilder) {
        let config = ReconConfig::from_toml(&format!(
            r#"
name = "proveedor"
identity = ["Codigo", "Producto"]
status_field = "Estado"
terminal_status = "entregado"
{extra}
"#
        ))
        .unwrap();
        let header: Vec<String> = [
            "Codigo",
            "Producto",
            "Estado",
            "Fecha recibido",
            "Ultima actualizacion",
            "Notas",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let layout = ColumnLayout::resolve(&header, &config).unwrap();
        let keys = KeyBuilder::new(&layout, &config.key_separator);
        (layout, keys)
    }

    fn rows() -> Vec<Vec<String>> {
        vec![
            vec!["P1".into(), "Silla".into(), "pedido".into(), "".into(), "".into(), "urgente".into()],
            vec!["P2".into(), "Mesa".into(), "entregado".into()],
            vec!["P3".into(), "Sofa".into(), "pedido".into()],
        ]
    }

    fn key(keys: &KeyBuilder, code: &str, product: &str) -> BusinessKey {
        keys.for_stored(&StoredRecord {
            row: 0,
            cells: vec![code.into(), product.into()],
        })
        .unwrap()
    }

    #[test]
    fn absent_active_keys_marked_terminal() {
        let (layout, keys) = setup(
            r#"timestamp_field = "Ultima actualizacion"
terminal_stamp_field = "Fecha recibido""#,
        );
        let index = KeyIndex::build(rows(), 2, &keys);
        let seen: HashSet<_> = [key(&keys, "P3", "Sofa")].into_iter().collect();

        let entries = mark_disappeared(&index, &seen, &layout, "entregado", STAMP);
        assert_eq!(entries.len(), 1, "P2 is already terminal, P3 still present");

        let e = &entries[0];
        assert_eq!(e.action, Action::MarkTerminal);
        assert_eq!(e.target_row, Some(2));
        assert_eq!(e.changed, vec![2, 4, 3]);
        assert_eq!(
            e.values,
            vec!["P1", "Silla", "entregado", STAMP, STAMP, "urgente"]
        );
    }

    #[test]
    fn only_status_without_stamp_columns() {
        let (layout, keys) = setup("");
        let index = KeyIndex::build(rows(), 2, &keys);
        let entries = mark_disappeared(&index, &HashSet::new(), &layout, "entregado", STAMP);

        let rows: Vec<u32> = entries.iter().filter_map(|e| e.target_row).collect();
        assert_eq!(rows, vec![2, 4]);
        assert!(entries.iter().all(|e| e.changed == vec![2]));
    }

    #[test]
    fn everything_seen_means_nothing_to_do() {
        let (layout, keys) = setup("");
        let index = KeyIndex::build(rows(), 2, &keys);
        let seen: HashSet<_> = [
            key(&keys, "P1", "Silla"),
            key(&keys, "P2", "Mesa"),
            key(&keys, "P3", "Sofa"),
        ]
        .into_iter()
        .collect();
        assert!(mark_disappeared(&index, &seen, &layout, "entregado", STAMP).is_empty());
    }
}
