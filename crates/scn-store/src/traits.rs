use scn_dag::{ScenarioForest, ScenarioTreeBuilder};
use scn_types::{
    AssignmentDraft, AssignmentId, Catalog, CatalogEntry, CatalogSeed, MergeRecord, NewScenario,
    OverrideDraft, PhaseDraft, Scenario, ScenarioAssignment, ScenarioId, ScenarioPhaseTimeline,
    ScenarioProjectOverride, ScenarioSnapshot, ScenarioStatus,
};

use crate::changes::{ChangeSet, CommitReceipt, WriteOp};
use crate::error::{StoreError, StoreResult};

/// Storage for scenarios, their scoped rows, branch snapshots, and the merge
/// audit log.
///
/// All implementations must satisfy these invariants:
/// - [`apply`](Self::apply) is atomic: either every operation of a change set
///   is visible afterwards or none is, and readers never observe a partial
///   change set.
/// - Natural keys are unique per scenario and every row references existing
///   catalog entries.
/// - Computed assignment dates are consistent with the scenario's timelines
///   and overrides after every commit.
/// - Merge records are append-only.
/// - Branch snapshots are immutable once written.
pub trait ScenarioStore: Send + Sync {
    /// A copy of the shared catalog.
    fn catalog(&self) -> StoreResult<Catalog>;

    /// Add a catalog row. Fails with [`StoreError::Validation`] if the id is
    /// already registered.
    fn register(&self, entry: CatalogEntry) -> StoreResult<()>;

    /// Create a scenario. Branches and sandboxes copy their parent's rows and
    /// record the parent's state as the branch snapshot.
    fn create_scenario(&self, request: NewScenario) -> StoreResult<Scenario>;

    /// Returns `Ok(None)` if the scenario does not exist.
    fn scenario(&self, id: &ScenarioId) -> StoreResult<Option<Scenario>>;

    /// All scenarios, newest first.
    fn list_scenarios(&self) -> StoreResult<Vec<Scenario>>;

    /// Delete a scenario with its scoped rows and branch snapshot.
    fn delete_scenario(&self, id: &ScenarioId) -> StoreResult<Scenario>;

    /// Consistent copy of a scenario and its rows.
    fn snapshot(&self, id: &ScenarioId) -> StoreResult<ScenarioSnapshot>;

    /// Snapshots of several scenarios.
    ///
    /// Default implementation calls `snapshot()` for each id. Backends should
    /// override it to read all of them at one point in time.
    fn snapshot_many(&self, ids: &[ScenarioId]) -> StoreResult<Vec<ScenarioSnapshot>> {
        ids.iter().map(|id| self.snapshot(id)).collect()
    }

    /// The parent's state at the moment `id` was branched. `Ok(None)` for the
    /// baseline.
    fn branch_snapshot(&self, id: &ScenarioId) -> StoreResult<Option<ScenarioSnapshot>>;

    /// Apply a change set atomically.
    fn apply(&self, changes: ChangeSet) -> StoreResult<CommitReceipt>;

    /// Merge records where `id` is the source or the target, oldest first.
    fn merge_records(&self, id: &ScenarioId) -> StoreResult<Vec<MergeRecord>>;

    // ------------------------------------------------------------------
    // Provided operations
    // ------------------------------------------------------------------

    /// Register every row of a seed.
    fn register_seed(&self, seed: CatalogSeed) -> StoreResult<()> {
        seed.projects
            .into_iter()
            .map(CatalogEntry::Project)
            .chain(seed.people.into_iter().map(CatalogEntry::Person))
            .chain(seed.roles.into_iter().map(CatalogEntry::Role))
            .chain(seed.phases.into_iter().map(CatalogEntry::Phase))
            .try_for_each(|entry| self.register(entry))
    }

    /// Like [`scenario`](Self::scenario) but fails when it does not exist.
    fn require_scenario(&self, id: &ScenarioId) -> StoreResult<Scenario> {
        self.scenario(id)?.ok_or(StoreError::ScenarioNotFound(*id))
    }

    fn baseline(&self) -> StoreResult<Option<Scenario>> {
        Ok(self
            .list_scenarios()?
            .into_iter()
            .find(Scenario::is_baseline))
    }

    /// The hierarchy as a forest, children in creation order.
    fn tree(&self) -> StoreResult<ScenarioForest> {
        let mut records = self.list_scenarios()?;
        records.reverse();
        Ok(ScenarioTreeBuilder::build(&records)?)
    }

    /// Mark a scenario archived. Allowed for any scenario except the baseline.
    fn archive_scenario(&self, id: &ScenarioId) -> StoreResult<Scenario> {
        self.apply(ChangeSet::new().with(WriteOp::SetScenarioStatus {
            scenario_id: *id,
            status: ScenarioStatus::Archived,
        }))?;
        self.require_scenario(id)
    }

    fn upsert_assignment(
        &self,
        scenario_id: &ScenarioId,
        draft: AssignmentDraft,
    ) -> StoreResult<ScenarioAssignment> {
        let key = draft.key;
        self.apply(ChangeSet::new().with(WriteOp::UpsertAssignment {
            scenario_id: *scenario_id,
            draft,
        }))?;
        self.snapshot(scenario_id)?
            .assignment(&key)
            .cloned()
            .ok_or_else(|| StoreError::Consistency(format!("assignment {key:?} vanished after upsert")))
    }

    /// Delete an assignment by row id.
    fn delete_assignment(
        &self,
        scenario_id: &ScenarioId,
        assignment_id: &AssignmentId,
    ) -> StoreResult<()> {
        let snapshot = self.snapshot(scenario_id)?;
        let key = snapshot
            .assignments
            .iter()
            .find(|a| a.id == *assignment_id)
            .map(ScenarioAssignment::key)
            .ok_or_else(|| StoreError::RowNotFound {
                scenario: *scenario_id,
                row: format!("assignment {assignment_id}"),
            })?;
        self.apply(
            ChangeSet::new()
                .with(WriteOp::DeleteAssignment {
                    scenario_id: *scenario_id,
                    key,
                })
                .expect_revision(*scenario_id, snapshot.revision),
        )?;
        Ok(())
    }

    fn upsert_override(
        &self,
        scenario_id: &ScenarioId,
        draft: OverrideDraft,
    ) -> StoreResult<ScenarioProjectOverride> {
        let key = draft.key;
        self.apply(ChangeSet::new().with(WriteOp::UpsertOverride {
            scenario_id: *scenario_id,
            draft,
        }))?;
        self.snapshot(scenario_id)?
            .overrides
            .into_iter()
            .find(|o| o.key() == key)
            .ok_or_else(|| StoreError::Consistency(format!("override {key:?} vanished after upsert")))
    }

    fn upsert_phase_timeline(
        &self,
        scenario_id: &ScenarioId,
        draft: PhaseDraft,
    ) -> StoreResult<ScenarioPhaseTimeline> {
        let key = draft.key;
        self.apply(ChangeSet::new().with(WriteOp::UpsertPhaseTimeline {
            scenario_id: *scenario_id,
            draft,
        }))?;
        self.snapshot(scenario_id)?
            .phase_timelines
            .into_iter()
            .find(|t| t.key() == key)
            .ok_or_else(|| StoreError::Consistency(format!("timeline {key:?} vanished after upsert")))
    }
}
