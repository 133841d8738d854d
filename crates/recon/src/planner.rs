use crate::config::WriteStrategy;
use crate::model::{Action, ChangeSet, WriteOp, WritePlan};

/// Turn classified entries into store writes.
///
/// Updates keep the entry order (snapshot order, then terminal transitions
/// by row). Inserts keep snapshot order and land after `last_row`.
/// `MarkTerminal` is always cell-addressed so the rest of the row is never
/// touched.
pub fn plan(changes: &ChangeSet, strategy: WriteStrategy, last_row: u32) -> WritePlan {
    let mut updates = Vec::new();
    let mut inserts = Vec::new();

    for entry in changes.iter() {
        match (entry.action, entry.target_row) {
            (Action::Insert, _) => inserts.push(entry.values.clone()),
            (Action::Update, Some(row)) if strategy == WriteStrategy::WholeRow => {
                updates.push(WriteOp::Row {
                    row,
                    values: entry.values.clone(),
                });
            }
            (Action::Update | Action::MarkTerminal, Some(row)) => {
                updates.extend(entry.changed.iter().map(|&column| WriteOp::Cell {
                    row,
                    column,
                    value: entry.values.get(column).cloned().unwrap_or_default(),
                }));
            }
            (action, None) => {
                tracing::error!(key = %entry.key, %action, "entry without target row; skipped");
            }
        }
    }

    WritePlan {
        strategy,
        updates,
        inserts,
        first_insert_row: last_row + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::BusinessKey;
    use crate::model::ChangeEntry;

    fn entries() -> ChangeSet {
        ChangeSet {
            entries: vec![
                entry("N1", Action::Insert, None, &["N1", "new", "t"], &[]),
                entry("A1", Action::Update, Some(2), &["A1", "shipped", "t"], &[1, 2]),
                entry("N2", Action::Insert, None, &["N2", "new", "t"], &[]),
                entry("Z9", Action::MarkTerminal, Some(5), &["Z9", "delivered", "t"], &[1, 2]),
            ],
        }
    }

    fn entry(key: &str, action: Action, row: Option<u32>, values: &[&str], changed: &[usize]) -> ChangeEntry {
        ChangeEntry {
            key: BusinessKey::new(key),
            action,
            target_row: row,
            values: values.iter().map(|s| s.to_string()).collect(),
            changed: changed.to_vec(),
        }
    }

    #[test]
    fn whole_row_strategy() {
        let plan = plan(&entries(), WriteStrategy::WholeRow, 6);
        assert_eq!(plan.first_insert_row, 7);
        assert_eq!(plan.inserts.len(), 2);
        assert_eq!(plan.inserts[0][0], "N1");
        assert_eq!(plan.inserts[1][0], "N2");
        assert_eq!(
            plan.updates,
            vec![
                WriteOp::Row {
                    row: 2,
                    values: vec!["A1".into(), "shipped".into(), "t".into()]
                },
                WriteOp::Cell { row: 5, column: 1, value: "delivered".into() },
                WriteOp::Cell { row: 5, column: 2, value: "t".into() },
            ]
        );
    }

    #[test]
    fn cell_strategy() {
        let plan = plan(&entries(), WriteStrategy::Cell, 6);
        assert_eq!(
            plan.updates,
            vec![
                WriteOp::Cell { row: 2, column: 1, value: "shipped".into() },
                WriteOp::Cell { row: 2, column: 2, value: "t".into() },
                WriteOp::Cell { row: 5, column: 1, value: "delivered".into() },
                WriteOp::Cell { row: 5, column: 2, value: "t".into() },
            ]
        );
        assert_eq!(plan.write_count(), 6);
    }

    #[test]
    fn updates_never_contain_inserts() {
        let plan = plan(&entries(), WriteStrategy::WholeRow, 1);
        assert!(plan.updates.iter().all(|op| op.row() != 0 && op.row() <= 5));
        assert_eq!(plan.first_insert_row, 2);
    }

    #[test]
    fn empty_changes_empty_plan() {
        let plan = plan(&ChangeSet::default(), WriteStrategy::Cell, 10);
        assert!(plan.is_empty());
        assert_eq!(plan.first_insert_row, 11);
    }
}
