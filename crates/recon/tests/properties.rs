// Property-based tests for a reconciliation pass over the in-memory adapters.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, HashSet};

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use sheetsync_recon::memory::{MemorySource, MemoryStore};
use sheetsync_recon::model::Action;
use sheetsync_recon::{CommitMode, FixedClock, PassReport, RawRecord, ReconConfig, Reconciler};

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

const TERMINAL: &str = "delivered";

fn config() -> ReconConfig {
    ReconConfig::from_toml(
        r#"
name = "prop"
identity = ["key"]
volatile = ["status", "qty"]
status_field = "status"
terminal_status = "delivered"
timestamp_field = "updated"
"#,
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_status() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => Just("pending".to_string()),
        2 => Just("shipped".to_string()),
        1 => Just(TERMINAL.to_string()),
    ]
}

fn arb_qty() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"[0-9]{1,3}",
        1 => Just(String::new()),
    ]
}

/// Stored ledger: unique keys, one row each, in key order.
fn arb_ledger() -> impl Strategy<Value = BTreeMap<u8, (String, String)>> {
    proptest::collection::btree_map(0u8..12, (arb_status(), arb_qty()), 0..8)
}

/// Snapshot: keys drawn from the same pool, repeats allowed.
fn arb_snapshot() -> impl Strategy<Value = Vec<(u8, String, String)>> {
    proptest::collection::vec((0u8..12, arb_status(), arb_qty()), 0..10)
}

fn key(n: u8) -> String {
    format!("K{n}")
}

fn build_store(ledger: &BTreeMap<u8, (String, String)>) -> MemoryStore {
    let mut rows = vec![vec![
        "key".to_string(),
        "status".to_string(),
        "qty".to_string(),
        "updated".to_string(),
    ]];
    for (k, (status, qty)) in ledger {
        rows.push(vec![key(*k), status.clone(), qty.clone(), "earlier".to_string()]);
    }
    MemoryStore::from_rows(rows)
}

fn build_snapshot(items: &[(u8, String, String)]) -> Vec<RawRecord> {
    items
        .iter()
        .map(|(k, status, qty)| {
            [
                ("key", key(*k)),
                ("status", status.clone()),
                ("qty", qty.clone()),
            ]
            .into_iter()
            .collect()
        })
        .collect()
}

fn pass(store: &mut MemoryStore, snapshot: &[RawRecord], hour: u32) -> PassReport {
    let config = config();
    let clock = FixedClock(Utc.with_ymd_and_hms(2026, 10, 18, hour, 0, 0).unwrap());
    Reconciler::with_clock(&config, clock)
        .unwrap()
        .run_pass(&mut MemorySource::new(snapshot.to_vec()), store, CommitMode::Apply)
        .unwrap()
}

fn first_seen(items: &[(u8, String, String)]) -> Vec<u8> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|(k, _, _)| seen.insert(*k))
        .map(|(k, _, _)| *k)
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn one_action_per_snapshot_key(ledger in arb_ledger(), items in arb_snapshot()) {
        let mut store = build_store(&ledger);
        let report = pass(&mut store, &build_snapshot(&items), 10);

        let mut acted = HashSet::new();
        for entry in report.changes.iter() {
            prop_assert!(acted.insert(entry.key.to_string()),
                "key {} has more than one action", entry.key);
        }
        for entry in report.changes.iter().filter(|e| e.action == Action::MarkTerminal) {
            let k = entry.key.to_string();
            prop_assert!(items.iter().all(|(n, _, _)| key(*n) != k),
                "key {} is in the snapshot but was marked terminal", k);
        }
    }

    #[test]
    fn second_pass_has_nothing_to_do(ledger in arb_ledger(), items in arb_snapshot()) {
        let snapshot = build_snapshot(&items);
        let mut store = build_store(&ledger);

        pass(&mut store, &snapshot, 10);
        let report = pass(&mut store, &snapshot, 11);

        prop_assert_eq!(report.changes.count(Action::Insert), 0);
        prop_assert_eq!(report.changes.count(Action::Update), 0);
        prop_assert_eq!(report.changes.count(Action::MarkTerminal), 0);
        prop_assert!(report.plan.is_empty());
    }

    #[test]
    fn inserts_keep_snapshot_order(ledger in arb_ledger(), items in arb_snapshot()) {
        let mut store = build_store(&ledger);
        let report = pass(&mut store, &build_snapshot(&items), 10);

        let expected: Vec<String> = first_seen(&items)
            .into_iter()
            .filter(|k| !ledger.contains_key(k))
            .map(key)
            .collect();
        let planned: Vec<String> = report.plan.inserts.iter().map(|r| r[0].clone()).collect();
        prop_assert_eq!(&planned, &expected);

        let first = report.plan.first_insert_row as usize;
        let appended: Vec<String> = store.rows()[first - 1..]
            .iter()
            .map(|r| r[0].clone())
            .collect();
        prop_assert_eq!(&appended, &expected);
    }

    #[test]
    fn vanished_keys_marked_once(ledger in arb_ledger(), items in arb_snapshot()) {
        let mut store = build_store(&ledger);
        let report = pass(&mut store, &build_snapshot(&items), 10);

        let present: HashSet<u8> = items.iter().map(|(k, _, _)| *k).collect();
        let expected: Vec<String> = ledger
            .iter()
            .filter(|(k, (status, _))| !present.contains(*k) && status != TERMINAL)
            .map(|(k, _)| key(*k))
            .collect();
        let marked: Vec<String> = report
            .changes
            .iter()
            .filter(|e| e.action == Action::MarkTerminal)
            .map(|e| e.key.to_string())
            .collect();
        prop_assert_eq!(&marked, &expected);

        for (i, k) in ledger.keys().enumerate() {
            if !present.contains(k) {
                prop_assert_eq!(store.cell(i as u32 + 2, 1), TERMINAL);
            }
        }
    }
}
