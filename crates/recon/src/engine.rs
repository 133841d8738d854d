use std::collections::{HashMap, HashSet};

use crate::adapter::{LedgerStore, SnapshotSource};
use crate::clock::{Clock, StampFormat, SystemClock};
use crate::config::ReconConfig;
use crate::detect::{ChangeDetector, Comparison};
use crate::disappear::mark_disappeared;
use crate::error::{ConfigError, ReconError};
use crate::index::KeyIndex;
use crate::key::{BusinessKey, KeyBuilder};
use crate::model::{
    Action, ChangeEntry, ChangeSet, PassMeta, PassReport, PassState, PassSummary, RawRecord,
    RowSpan,
};
use crate::planner::plan;
use crate::schema::ColumnLayout;

/// Whether a pass writes its plan or stops once it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    #[default]
    Apply,
    DryRun,
}

/// Run one pass with the system clock and commit the result.
pub fn run(
    config: &ReconConfig,
    source: &mut dyn SnapshotSource,
    store: &mut dyn LedgerStore,
) -> Result<PassReport, ReconError> {
    Reconciler::new(config)?.run_pass(source, store, CommitMode::Apply)
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct Reconciler<'a, C: Clock = SystemClock> {
    config: &'a ReconConfig,
    clock: C,
    stamp: StampFormat,
}

impl<'a> Reconciler<'a, SystemClock> {
    pub fn new(config: &'a ReconConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<'a, C: Clock> Reconciler<'a, C> {
    pub fn with_clock(config: &'a ReconConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            stamp: StampFormat::from_config(&config.timestamp)?,
        })
    }

    /// Capture → resolve schema → index → classify → plan → commit.
    ///
    /// The store is read once, before any write of this pass. A failure at
    /// any step aborts; writes already issued by the store stay applied.
    pub fn run_pass(
        &self,
        source: &mut dyn SnapshotSource,
        store: &mut dyn LedgerStore,
        mode: CommitMode,
    ) -> Result<PassReport, ReconError> {
        let span = tracing::info_span!("pass", config = %self.config.name);
        let _guard = span.enter();

        let now = self.clock.now();
        let stamp = self.stamp.render(now);
        let mut state = StateTracker::default();

        tracing::debug!(source = %source.describe(), "capturing snapshot");
        let snapshot = source.capture()?;

        let header = store.read_header(RowSpan::single(self.config.header_row, self.config.max_columns))?;
        let layout = ColumnLayout::resolve(&header, self.config)?;
        state.advance(PassState::SchemaResolved);

        let keys = KeyBuilder::new(&layout, &self.config.key_separator);
        let first_row = self.config.first_data_row();
        // Full read width, so notes right of the named columns still count
        // toward the last populated row that appends land after.
        let rows = store.read_rows(RowSpan::from_row(first_row, self.config.max_columns))?;
        let index = KeyIndex::build(rows, first_row, &keys);
        state.advance(PassState::Indexed);

        let classified = classify(self.config, &layout, &index, &keys, &snapshot, &stamp);
        state.advance(PassState::Classified);

        let write_plan = plan(&classified.changes, self.config.strategy, index.last_row());
        state.advance(PassState::Planned);

        if mode == CommitMode::Apply && !write_plan.is_empty() {
            tracing::info!(
                updates = write_plan.updates.len(),
                inserts = write_plan.inserts.len(),
                store = %store.describe(),
                "applying plan"
            );
            store.apply(&write_plan)?;
            store.flush()?;
        }
        if mode == CommitMode::Apply {
            state.advance(PassState::Committed);
        }

        let summary = summarize(&classified, snapshot.len(), &index);
        tracing::info!(
            inserted = summary.inserted,
            updated = summary.updated,
            marked_terminal = summary.marked_terminal,
            unchanged = summary.unchanged,
            "pass finished"
        );

        Ok(PassReport {
            meta: PassMeta {
                config_name: self.config.name.clone(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: now.to_rfc3339(),
                state: state.current(),
                dry_run: mode == CommitMode::DryRun,
            },
            summary,
            changes: classified.changes,
            plan: write_plan,
        })
    }
}

/// Enforces the linear `Idle → … → Committed` order.
#[derive(Debug, Default)]
struct StateTracker {
    current: Option<PassState>,
}

impl StateTracker {
    fn current(&self) -> PassState {
        self.current.unwrap_or(PassState::Idle)
    }

    fn advance(&mut self, next: PassState) {
        let prev = self.current();
        debug_assert!(next > prev, "pass state cannot go from {prev} to {next}");
        tracing::debug!(from = %prev, to = %next, "pass state");
        self.current = Some(next);
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Classification {
    pub changes: ChangeSet,
    pub unchanged: usize,
    pub skipped_blank: usize,
    pub duplicate_keys: usize,
}

/// Decide Insert / Update / no-op for every snapshot record, then append the
/// terminal transitions for stored keys the snapshot no longer lists.
///
/// A key repeated in the snapshot is classified once: the later record's
/// values win, the first occurrence fixes its position.
pub fn classify(
    config: &ReconConfig,
    layout: &ColumnLayout,
    index: &KeyIndex,
    keys: &KeyBuilder,
    snapshot: &[RawRecord],
    stamp: &str,
) -> Classification {
    let mut out = Classification::default();

    let mut order: Vec<BusinessKey> = Vec::with_capacity(snapshot.len());
    let mut latest: HashMap<BusinessKey, &RawRecord> = HashMap::with_capacity(snapshot.len());
    for record in snapshot {
        let Some(key) = keys.for_raw(record) else {
            out.skipped_blank += 1;
            continue;
        };
        if latest.insert(key.clone(), record).is_some() {
            out.duplicate_keys += 1;
            tracing::warn!(%key, "duplicate key in snapshot; later record wins");
        } else {
            order.push(key);
        }
    }
    if out.skipped_blank > 0 {
        tracing::warn!(count = out.skipped_blank, "snapshot records with blank identity skipped");
    }

    let detector = ChangeDetector::new(layout);
    let mut next_row = index.last_row() + 1;

    for key in &order {
        let incoming = latest[key];
        match index.get(key) {
            None => {
                out.changes.entries.push(ChangeEntry {
                    key: key.clone(),
                    action: Action::Insert,
                    target_row: Some(next_row),
                    values: detector.output_row(incoming, stamp),
                    changed: Vec::new(),
                });
                next_row += 1;
            }
            Some(existing) => match detector.compare(existing, incoming) {
                Comparison::Unchanged => out.unchanged += 1,
                Comparison::Changed(fields) => {
                    let mut changed: Vec<usize> = fields.iter().map(|f| f.column).collect();
                    changed.extend(layout.timestamp());
                    tracing::debug!(%key, row = existing.row, fields = fields.len(), "record changed");
                    out.changes.entries.push(ChangeEntry {
                        key: key.clone(),
                        action: Action::Update,
                        target_row: Some(existing.row),
                        values: detector.output_row(incoming, stamp),
                        changed,
                    });
                }
            },
        }
    }

    let seen: HashSet<BusinessKey> = order.into_iter().collect();
    out.changes
        .entries
        .extend(mark_disappeared(index, &seen, layout, &config.terminal_status, stamp));

    out
}

fn summarize(classified: &Classification, snapshot_records: usize, index: &KeyIndex) -> PassSummary {
    let changes = &classified.changes;
    let mut action_counts = HashMap::new();
    for entry in changes.iter() {
        *action_counts.entry(entry.action.to_string()).or_insert(0) += 1;
    }

    PassSummary {
        snapshot_records,
        stored_rows: index.stored_rows(),
        inserted: changes.count(Action::Insert),
        updated: changes.count(Action::Update),
        marked_terminal: changes.count(Action::MarkTerminal),
        unchanged: classified.unchanged,
        skipped_blank: classified.skipped_blank,
        shadowed_store_rows: index.shadowed(),
        duplicate_snapshot_keys: classified.duplicate_keys,
        action_counts,
    }
}
