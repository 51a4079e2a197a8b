//! The merge workflow.
//!
//! A merge validates its source, takes the target's lock, reads source,
//! target and branch point in one consistent view, resolves conflicts, and
//! commits everything (target rows, source status, audit record) as one
//! change set. Any failure before or during the commit leaves both scenarios
//! untouched.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use scn_diff::{DiffEngine, DiffEntry, DiffSet};
use scn_store::{ChangeSet, ScenarioStore, WriteOp};
use scn_types::{
    AssignmentDraft, MergeRecord, MergeRecordId, MergeStrategy, OverrideDraft, PhaseDraft,
    Scenario, ScenarioId, ScenarioStatus,
};

use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::lock::MergeLockRegistry;
use crate::resolver::{resolve, ConflictResolutions, Resolution};

/// Request options for [`MergeCoordinator::merge`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    #[serde(rename = "merge_strategy")]
    pub strategy: MergeStrategy,
    /// Overrides `strategy` for conflicts when present.
    #[serde(default)]
    pub resolve_conflicts_as: Option<MergeStrategy>,
    #[serde(default)]
    pub resolutions: ConflictResolutions,
    #[serde(default)]
    pub merged_by: Option<String>,
}

impl MergeOptions {
    pub fn new(strategy: MergeStrategy) -> Self {
        Self {
            strategy,
            resolve_conflicts_as: None,
            resolutions: ConflictResolutions::new(),
            merged_by: None,
        }
    }

    pub fn resolve_as(mut self, strategy: MergeStrategy) -> Self {
        self.resolve_conflicts_as = Some(strategy);
        self
    }

    pub fn with_resolutions(mut self, resolutions: ConflictResolutions) -> Self {
        self.resolutions = resolutions;
        self
    }

    pub fn merged_by(mut self, who: impl Into<String>) -> Self {
        self.merged_by = Some(who.into());
        self
    }

    /// The strategy applied to conflicts and recorded in the audit log.
    pub fn effective_strategy(&self) -> MergeStrategy {
        self.resolve_conflicts_as.unwrap_or(self.strategy)
    }
}

/// What a merge would do, computed without writing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergePreview {
    pub source_id: ScenarioId,
    pub target_id: ScenarioId,
    pub merge_strategy: MergeStrategy,
    pub diff: DiffSet,
    pub resolution: Resolution,
}

/// A committed merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub record: MergeRecord,
    pub applied: Vec<DiffEntry>,
    pub superseded: Vec<DiffEntry>,
    /// Target revision after the commit.
    pub target_revision: u64,
}

/// Merges scenarios into their parents.
pub struct MergeCoordinator {
    store: Arc<dyn ScenarioStore>,
    diff: DiffEngine,
    locks: Arc<MergeLockRegistry>,
    config: MergeConfig,
}

impl MergeCoordinator {
    /// Create a coordinator with its own lock registry.
    pub fn new(store: Arc<dyn ScenarioStore>, config: MergeConfig) -> Self {
        Self::with_locks(store, config, Arc::new(MergeLockRegistry::new()))
    }

    /// Create a coordinator sharing `locks` with other coordinators over the
    /// same store.
    pub fn with_locks(
        store: Arc<dyn ScenarioStore>,
        config: MergeConfig,
        locks: Arc<MergeLockRegistry>,
    ) -> Self {
        Self {
            diff: DiffEngine::new(store.clone()),
            store,
            locks,
            config,
        }
    }

    pub fn locks(&self) -> &Arc<MergeLockRegistry> {
        &self.locks
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merge `source_id` into its parent.
    pub fn merge(&self, source_id: &ScenarioId, options: MergeOptions) -> MergeResult<MergeOutcome> {
        let strategy = options.effective_strategy();
        let (_, target_id) = self.check_source(source_id)?;

        let _guard = self.locks.acquire(target_id, self.config.lock_timeout())?;
        let (source, _) = self.check_source(source_id)?;
        let plan = self.plan(&source, &target_id, strategy, &options.resolutions)?;

        if !plan.resolution.is_complete() {
            warn!(
                source = %source_id,
                target = %target_id,
                pending = plan.resolution.conflicts.len(),
                "merge aborted: conflicts need resolution"
            );
            return Err(MergeError::ConflictsPending {
                conflicts: plan.resolution.conflicts,
            });
        }

        let Resolution {
            applied,
            superseded,
            conflicts_detected,
            conflicts_resolved,
            ..
        } = plan.resolution;
        let record = MergeRecord {
            id: MergeRecordId::new(),
            scenario_id: *source_id,
            target_scenario_id: target_id,
            merge_strategy: strategy,
            conflicts_detected,
            conflicts_resolved,
            changes_applied: applied.len(),
            superseded: superseded
                .iter()
                .map(|e| e.description().to_string())
                .collect(),
            merged_at: Utc::now(),
            merged_by: options.merged_by.unwrap_or_else(|| "system".into()),
        };

        let mut changes = ChangeSet::new()
            .expect_revision(*source_id, plan.diff.source_revision)
            .expect_revision(target_id, plan.diff.target_revision);
        for entry in &applied {
            changes.push(write_op(target_id, entry));
        }
        changes
            .push(WriteOp::SetScenarioStatus {
                scenario_id: *source_id,
                status: ScenarioStatus::Merged,
            })
            .push(WriteOp::AppendMergeRecord(record.clone()));

        let receipt = self.store.apply(changes).map_err(|e| {
            let e = MergeError::from(e);
            log_failure(source_id, &target_id, &e);
            e
        })?;
        let target_revision = receipt.revision_of(&target_id).unwrap_or(plan.diff.target_revision);

        info!(
            source = %source_id,
            target = %target_id,
            strategy = %strategy,
            applied = record.changes_applied,
            conflicts = record.conflicts_detected,
            superseded = record.superseded.len(),
            "merge committed"
        );
        Ok(MergeOutcome {
            record,
            applied,
            superseded,
            target_revision,
        })
    }

    /// Compute what merging `source_id` would do. Takes no lock and writes
    /// nothing; pending manual conflicts are reported, not raised.
    pub fn preview(
        &self,
        source_id: &ScenarioId,
        strategy: MergeStrategy,
        resolutions: &ConflictResolutions,
    ) -> MergeResult<MergePreview> {
        let (source, target_id) = self.check_source(source_id)?;
        self.plan(&source, &target_id, strategy, resolutions)
    }

    /// The source scenario and its parent, if the source may be merged.
    fn check_source(&self, source_id: &ScenarioId) -> MergeResult<(Scenario, ScenarioId)> {
        let source = self
            .store
            .scenario(source_id)?
            .ok_or(MergeError::NotFound(*source_id))?;
        let invalid = |reason: String| MergeError::InvalidMergeSource {
            scenario: source.id,
            status: source.status,
            reason,
        };

        if source.is_baseline() {
            return Err(invalid("the baseline has no parent to merge into".into()));
        }
        match source.status {
            ScenarioStatus::Active => {}
            ScenarioStatus::Merged => return Err(invalid("it has already been merged".into())),
            ScenarioStatus::Archived => return Err(invalid("it is archived".into())),
        }
        let Some(target_id) = source.parent_scenario_id else {
            return Err(invalid("it has no parent scenario".into()));
        };
        let target = self.store.scenario(&target_id)?.ok_or_else(|| {
            MergeError::Consistency(format!(
                "parent {target_id} of scenario {source_id} does not exist"
            ))
        })?;
        if !target.is_writable() {
            return Err(invalid(format!(
                "its parent '{}' is {}",
                target.name, target.status
            )));
        }
        Ok((source, target_id))
    }

    fn plan(
        &self,
        source: &Scenario,
        target_id: &ScenarioId,
        strategy: MergeStrategy,
        resolutions: &ConflictResolutions,
    ) -> MergeResult<MergePreview> {
        let diff = self.diff.diff(&source.id, target_id).map_err(|e| {
            let e = MergeError::from(e);
            log_failure(&source.id, target_id, &e);
            e
        })?;
        let resolution = resolve(&diff, strategy, resolutions);
        Ok(MergePreview {
            source_id: source.id,
            target_id: *target_id,
            merge_strategy: strategy,
            diff,
            resolution,
        })
    }
}

/// The target-side write that adopts an entry's source value.
fn write_op(target_id: ScenarioId, entry: &DiffEntry) -> WriteOp {
    let scenario_id = target_id;
    match entry {
        DiffEntry::Assignment(c) => match &c.source {
            Some(value) => WriteOp::UpsertAssignment {
                scenario_id,
                draft: AssignmentDraft {
                    key: c.key,
                    value: value.clone(),
                },
            },
            None => WriteOp::DeleteAssignment {
                scenario_id,
                key: c.key,
            },
        },
        DiffEntry::ProjectOverride(c) => match &c.source {
            Some(value) => WriteOp::UpsertOverride {
                scenario_id,
                draft: OverrideDraft {
                    key: c.key,
                    value: value.clone(),
                },
            },
            None => WriteOp::DeleteOverride {
                scenario_id,
                key: c.key,
            },
        },
        DiffEntry::PhaseTimeline(c) => match &c.source {
            Some(value) => WriteOp::UpsertPhaseTimeline {
                scenario_id,
                draft: PhaseDraft {
                    key: c.key,
                    value: value.clone(),
                },
            },
            None => WriteOp::DeletePhaseTimeline {
                scenario_id,
                key: c.key,
            },
        },
    }
}

fn log_failure(source: &ScenarioId, target: &ScenarioId, e: &MergeError) {
    match e {
        MergeError::Consistency(_) | MergeError::Store(_) => {
            error!(source = %source, target = %target, error = %e, "merge failed")
        }
        _ => warn!(source = %source, target = %target, error = %e, "merge aborted"),
    }
}
