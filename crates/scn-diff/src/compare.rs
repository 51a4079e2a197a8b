//! Read-only comparison of two arbitrary scenarios.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use scn_store::ScenarioStore;
use scn_types::{ScenarioId, ScenarioSnapshot};

use crate::engine::diff_snapshots;
use crate::entry::{ClassCounts, DiffEntry, DiffSet, EntityClass};
use crate::error::{DiffError, DiffResult};

/// Aggregate impact of moving from scenario `a` to scenario `b`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    pub assignments: ClassCounts,
    pub project_overrides: ClassCounts,
    pub phase_timelines: ClassCounts,
    /// `Σ allocation(b) − Σ allocation(a)`, in percentage points.
    pub total_allocation_delta: f64,
    /// Assignments in `b` minus assignments in `a`.
    pub assignment_count_delta: i64,
    /// Distinct projects with at least one differing row.
    pub projects_touched: usize,
    /// Distinct people with at least one differing assignment.
    pub people_affected: usize,
    /// Phase timelines whose dates differ (links alone do not count).
    pub phases_rescheduled: usize,
}

/// Result of [`ComparisonService::compare`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub from: ScenarioId,
    pub to: ScenarioId,
    /// Two-way diff with `to` as source: "added" means present in `to` only.
    pub diff: DiffSet,
    pub metrics: ComparisonMetrics,
}

/// Compares scenarios without writing anything.
pub struct ComparisonService {
    store: Arc<dyn ScenarioStore>,
}

impl ComparisonService {
    pub fn new(store: Arc<dyn ScenarioStore>) -> Self {
        Self { store }
    }

    /// Compare scenario `a` with scenario `b`. Any two scenarios may be
    /// compared, related or not.
    pub fn compare(&self, a: &ScenarioId, b: &ScenarioId) -> DiffResult<ComparisonResult> {
        let snapshots = self.store.snapshot_many(&[*a, *b])?;
        let [from, to] = <[ScenarioSnapshot; 2]>::try_from(snapshots).map_err(|v| {
            DiffError::Consistency(format!("expected 2 snapshots, store returned {}", v.len()))
        })?;
        let catalog = self.store.catalog()?;
        let diff = diff_snapshots(&to, &from, None, &catalog);
        let metrics = metrics(&from, &to, &diff);
        debug!(from = %a, to = %b, entries = diff.len(), "compared scenarios");
        Ok(ComparisonResult {
            from: *a,
            to: *b,
            diff,
            metrics,
        })
    }
}

/// Metrics for a two-way diff whose source is `to` and target is `from`.
pub fn metrics(from: &ScenarioSnapshot, to: &ScenarioSnapshot, diff: &DiffSet) -> ComparisonMetrics {
    let mut projects = BTreeSet::new();
    let mut people = BTreeSet::new();
    let mut phases_rescheduled = 0;
    for entry in &diff.entries {
        match entry {
            DiffEntry::Assignment(c) => {
                projects.insert(c.key.project_id);
                people.insert(c.key.person_id);
            }
            DiffEntry::ProjectOverride(c) => {
                projects.insert(c.key.project_id);
            }
            DiffEntry::PhaseTimeline(c) => {
                projects.insert(c.key.project_id);
                let dates = |v: &scn_types::PhaseValue| (v.start_date, v.end_date);
                let rescheduled = match (&c.source, &c.target) {
                    (Some(s), Some(t)) => dates(s) != dates(t),
                    _ => true,
                };
                if rescheduled {
                    phases_rescheduled += 1;
                }
            }
        }
    }

    ComparisonMetrics {
        assignments: diff.counts(EntityClass::Assignment),
        project_overrides: diff.counts(EntityClass::ProjectOverride),
        phase_timelines: diff.counts(EntityClass::PhaseTimeline),
        total_allocation_delta: to.total_allocation() - from.total_allocation(),
        assignment_count_delta: to.assignments.len() as i64 - from.assignments.len() as i64,
        projects_touched: projects.len(),
        people_affected: people.len(),
        phases_rescheduled,
    }
}
