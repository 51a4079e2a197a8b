use std::sync::Arc;

use scn_diff::EntryKey;
use scn_merge::{
    Choice, ConflictResolutions, MergeConfig, MergeCoordinator, MergeError, MergeOptions,
};
use scn_store::fixture::{date, Fixture};
use scn_store::{
    ChangeSet, CommitReceipt, InMemoryScenarioStore, ScenarioStore, StoreResult, WriteOp,
};
use scn_types::{
    AssignmentDraft, AssignmentValue, Catalog, CatalogEntry, DateMode, MergeRecord,
    MergeStrategy, NewScenario, PersonId, PhaseValue, Scenario, ScenarioId, ScenarioSnapshot,
    ScenarioStatus,
};

fn coordinator(fx: &Fixture) -> MergeCoordinator {
    MergeCoordinator::new(fx.store.clone(), MergeConfig::default())
}

/// Comparable content of a scenario, ignoring row ids and read time.
fn content(store: &InMemoryScenarioStore, id: ScenarioId) -> String {
    let snap = store.snapshot(&id).unwrap();
    format!(
        "{:?}|{:?}|{:?}",
        snap.assignment_map(),
        snap.override_map(),
        snap.phase_map()
    )
}

// ------------------------------------------------------------------
// Conflict strategy correctness
// ------------------------------------------------------------------

/// Baseline 75%, source 50%, target edited to 60% after branching.
fn conflicting_edit(fx: &Fixture) -> Scenario {
    let key = fx.alice_on_apollo();
    fx.assign(fx.baseline.id, key, 75.0).unwrap();
    let a = fx.branch("A", fx.baseline.id);
    fx.assign(a.id, key, 50.0).unwrap();
    fx.assign(fx.baseline.id, key, 60.0).unwrap();
    a
}

#[test]
fn favor_source_takes_source_value() {
    let fx = Fixture::new();
    let a = conflicting_edit(&fx);

    let outcome = coordinator(&fx)
        .merge(&a.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap();

    assert_eq!(fx.allocation(fx.baseline.id, &fx.alice_on_apollo()), Some(50.0));
    assert_eq!(outcome.record.conflicts_detected, 1);
    assert_eq!(outcome.record.conflicts_resolved, 1);
    assert_eq!(outcome.record.changes_applied, 1);
    assert!(outcome.record.superseded.is_empty());
}

#[test]
fn favor_target_keeps_target_value_and_records_superseded() {
    let fx = Fixture::new();
    let a = conflicting_edit(&fx);

    let outcome = coordinator(&fx)
        .merge(&a.id, MergeOptions::new(MergeStrategy::FavorTarget))
        .unwrap();

    assert_eq!(fx.allocation(fx.baseline.id, &fx.alice_on_apollo()), Some(60.0));
    assert_eq!(outcome.record.changes_applied, 0);
    assert_eq!(
        outcome.record.superseded,
        vec!["Alice → Apollo: 60% → 50%".to_string()]
    );
    assert_eq!(
        fx.store.scenario(&a.id).unwrap().unwrap().status,
        ScenarioStatus::Merged
    );
}

#[test]
fn manual_without_choices_fails_and_writes_nothing() {
    let fx = Fixture::new();
    let a = conflicting_edit(&fx);
    let before = content(&fx.store, fx.baseline.id);

    let err = coordinator(&fx)
        .merge(&a.id, MergeOptions::new(MergeStrategy::Manual))
        .unwrap_err();

    match &err {
        MergeError::ConflictsPending { conflicts } => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].key(), EntryKey::Assignment(fx.alice_on_apollo()));
        }
        other => panic!("expected ConflictsPending, got {other:?}"),
    }
    assert_eq!(err.kind(), "conflicts_pending");
    assert!(!err.is_retryable());
    assert_eq!(content(&fx.store, fx.baseline.id), before);
    assert_eq!(
        fx.store.scenario(&a.id).unwrap().unwrap().status,
        ScenarioStatus::Active
    );
    assert!(fx.store.merge_records(&a.id).unwrap().is_empty());
}

#[test]
fn manual_choices_are_applied() {
    for (choice, expected) in [(Choice::Source, 50.0), (Choice::Target, 60.0)] {
        let fx = Fixture::new();
        let a = conflicting_edit(&fx);
        let resolutions = ConflictResolutions::new()
            .with(EntryKey::Assignment(fx.alice_on_apollo()), choice);

        let outcome = coordinator(&fx)
            .merge(
                &a.id,
                MergeOptions::new(MergeStrategy::Manual).with_resolutions(resolutions),
            )
            .unwrap();

        assert_eq!(fx.allocation(fx.baseline.id, &fx.alice_on_apollo()), Some(expected));
        assert_eq!(outcome.record.merge_strategy, MergeStrategy::Manual);
        assert_eq!(outcome.record.conflicts_resolved, 1);
    }
}

#[test]
fn resolve_conflicts_as_overrides_strategy() {
    let fx = Fixture::new();
    let a = conflicting_edit(&fx);

    let outcome = coordinator(&fx)
        .merge(
            &a.id,
            MergeOptions::new(MergeStrategy::Manual)
                .resolve_as(MergeStrategy::FavorTarget)
                .merged_by("planner@example.com"),
        )
        .unwrap();

    assert_eq!(outcome.record.merge_strategy, MergeStrategy::FavorTarget);
    assert_eq!(outcome.record.merged_by, "planner@example.com");
    assert_eq!(fx.allocation(fx.baseline.id, &fx.alice_on_apollo()), Some(60.0));
}

// ------------------------------------------------------------------
// Three-way semantics
// ------------------------------------------------------------------

#[test]
fn source_only_edits_are_clean_under_every_strategy() {
    for strategy in [
        MergeStrategy::FavorSource,
        MergeStrategy::FavorTarget,
        MergeStrategy::Manual,
    ] {
        let fx = Fixture::new();
        let key = fx.alice_on_apollo();
        fx.assign(fx.baseline.id, key, 75.0).unwrap();
        let a = fx.branch("A", fx.baseline.id);
        fx.assign(a.id, key, 50.0).unwrap();

        let outcome = coordinator(&fx).merge(&a.id, MergeOptions::new(strategy)).unwrap();
        assert_eq!(fx.allocation(fx.baseline.id, &key), Some(50.0), "{strategy}");
        assert_eq!(outcome.record.conflicts_detected, 0);
    }
}

#[test]
fn target_only_edits_survive_the_merge() {
    let fx = Fixture::new();
    let alice = fx.alice_on_apollo();
    let bob = fx.bob_on_zeus();
    fx.assign(fx.baseline.id, alice, 75.0).unwrap();
    let a = fx.branch("A", fx.baseline.id);
    fx.assign(fx.baseline.id, alice, 40.0).unwrap();
    fx.assign(a.id, bob, 20.0).unwrap();

    let outcome = coordinator(&fx)
        .merge(&a.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap();

    assert_eq!(fx.allocation(fx.baseline.id, &alice), Some(40.0));
    assert_eq!(fx.allocation(fx.baseline.id, &bob), Some(20.0));
    assert_eq!(outcome.record.conflicts_detected, 0);
    assert_eq!(outcome.record.changes_applied, 1);
}

#[test]
fn source_deletion_removes_target_row() {
    let fx = Fixture::new();
    let key = fx.alice_on_apollo();
    fx.assign(fx.baseline.id, key, 75.0).unwrap();
    let a = fx.branch("A", fx.baseline.id);
    let row = fx.store.snapshot(&a.id).unwrap().assignment(&key).unwrap().id;
    fx.store.delete_assignment(&a.id, &row).unwrap();

    coordinator(&fx)
        .merge(&a.id, MergeOptions::new(MergeStrategy::FavorTarget))
        .unwrap();
    assert_eq!(fx.allocation(fx.baseline.id, &key), None);
}

#[test]
fn sequential_sibling_merges_conflict_on_same_key() {
    let fx = Fixture::new();
    let key = fx.alice_on_apollo();
    let a = fx.branch("A", fx.baseline.id);
    let b = fx.branch("B", fx.baseline.id);
    fx.assign(a.id, key, 50.0).unwrap();
    fx.assign(b.id, key, 75.0).unwrap();
    let merger = coordinator(&fx);

    let first = merger
        .merge(&a.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap();
    assert_eq!(first.record.conflicts_detected, 0);

    let preview = merger
        .preview(&b.id, MergeStrategy::FavorTarget, &ConflictResolutions::new())
        .unwrap();
    assert_eq!(preview.diff.conflict_count(), 1);
    assert_eq!(preview.resolution.superseded.len(), 1);

    let second = merger
        .merge(&b.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap();
    assert_eq!(second.record.conflicts_detected, 1);
    assert_eq!(fx.allocation(fx.baseline.id, &key), Some(75.0));
}

// ------------------------------------------------------------------
// Merged-state invariants
// ------------------------------------------------------------------

#[test]
fn merging_twice_is_rejected_and_state_is_unchanged() {
    let fx = Fixture::new();
    let a = conflicting_edit(&fx);
    let merger = coordinator(&fx);
    merger
        .merge(&a.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap();
    let after_first = content(&fx.store, fx.baseline.id);

    let err = merger
        .merge(&a.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap_err();
    assert!(matches!(err, MergeError::InvalidMergeSource { .. }));
    assert_eq!(content(&fx.store, fx.baseline.id), after_first);
    assert_eq!(fx.store.merge_records(&fx.baseline.id).unwrap().len(), 1);
}

#[test]
fn natural_keys_stay_unique_across_merges() {
    let fx = Fixture::new();
    let merger = coordinator(&fx);
    for (i, pct) in [30.0, 45.0, 60.0].into_iter().enumerate() {
        let child = fx.branch(&format!("child {i}"), fx.baseline.id);
        fx.assign(child.id, fx.alice_on_apollo(), pct).unwrap();
        fx.assign(child.id, fx.bob_on_zeus(), pct).unwrap();
        merger
            .merge(&child.id, MergeOptions::new(MergeStrategy::FavorSource))
            .unwrap();
    }

    let snap = fx.store.snapshot(&fx.baseline.id).unwrap();
    assert_eq!(snap.assignments.len(), 2);
    assert_eq!(snap.assignment_map().len(), snap.assignments.len());
    assert_eq!(fx.allocation(fx.baseline.id, &fx.alice_on_apollo()), Some(60.0));
}

#[test]
fn merged_rows_reference_catalog_and_have_derived_dates() {
    let fx = Fixture::new();
    let a = fx.branch("A", fx.baseline.id);
    fx.timeline(a.id, fx.build, PhaseValue::new(date(2025, 2, 1), date(2025, 4, 30)))
        .unwrap();
    for (key, value) in [
        (fx.alice_on_apollo(), AssignmentValue::phase(60.0, fx.build)),
        (fx.bob_on_zeus(), AssignmentValue::project(40.0)),
    ] {
        fx.store
            .upsert_assignment(&a.id, AssignmentDraft { key, value })
            .unwrap();
    }

    coordinator(&fx)
        .merge(&a.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap();

    let catalog: Catalog = fx.store.catalog().unwrap();
    let snap: ScenarioSnapshot = fx.store.snapshot(&fx.baseline.id).unwrap();
    assert_eq!(snap.assignments.len(), 2);
    for row in &snap.assignments {
        assert_eq!(row.scenario_id, fx.baseline.id);
        assert!(catalog.projects.contains_key(&row.project_id));
        assert!(catalog.people.contains_key(&row.person_id));
        assert!(catalog.roles.contains_key(&row.role_id));
        if row.assignment_date_mode != DateMode::Fixed {
            assert!(row.computed_start_date < row.computed_end_date);
        }
    }
    let alice = snap.assignment(&fx.alice_on_apollo()).unwrap();
    assert_eq!(alice.computed_start_date, date(2025, 2, 1));
    assert_eq!(alice.computed_end_date, date(2025, 4, 30));
    assert!(snap
        .phase_timelines
        .iter()
        .all(|t| t.scenario_id == fx.baseline.id));
}

// ------------------------------------------------------------------
// Source validation
// ------------------------------------------------------------------

#[test]
fn invalid_sources_rejected_before_locking() {
    let fx = Fixture::new();
    let merger = coordinator(&fx);

    let err = merger
        .merge(&fx.baseline.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_merge_source");

    let archived = fx.branch("old", fx.baseline.id);
    fx.store.archive_scenario(&archived.id).unwrap();
    assert!(matches!(
        merger.merge(&archived.id, MergeOptions::new(MergeStrategy::FavorSource)),
        Err(MergeError::InvalidMergeSource { status: ScenarioStatus::Archived, .. })
    ));

    let missing = ScenarioId::new();
    assert_eq!(
        merger.merge(&missing, MergeOptions::new(MergeStrategy::FavorSource)),
        Err(MergeError::NotFound(missing))
    );
}

#[test]
fn nested_branch_merges_into_its_own_parent() {
    let fx = Fixture::new();
    let a = fx.branch("A", fx.baseline.id);
    let b = fx
        .store
        .create_scenario(NewScenario::sandbox("B", a.id))
        .unwrap();
    fx.assign(b.id, fx.alice_on_apollo(), 25.0).unwrap();

    let outcome = coordinator(&fx)
        .merge(&b.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap();
    assert_eq!(outcome.record.target_scenario_id, a.id);
    assert_eq!(fx.allocation(a.id, &fx.alice_on_apollo()), Some(25.0));
    assert_eq!(fx.allocation(fx.baseline.id, &fx.alice_on_apollo()), None);
}

// ------------------------------------------------------------------
// Rollback
// ------------------------------------------------------------------

/// Delegates to an in-memory store but appends a write that violates
/// referential integrity to every change set aimed at `victim`.
struct FaultyStore {
    inner: Arc<InMemoryScenarioStore>,
    victim: ScenarioId,
    template: AssignmentDraft,
}

impl ScenarioStore for FaultyStore {
    fn catalog(&self) -> StoreResult<Catalog> {
        self.inner.catalog()
    }

    fn register(&self, entry: CatalogEntry) -> StoreResult<()> {
        self.inner.register(entry)
    }

    fn create_scenario(&self, request: NewScenario) -> StoreResult<Scenario> {
        self.inner.create_scenario(request)
    }

    fn scenario(&self, id: &ScenarioId) -> StoreResult<Option<Scenario>> {
        self.inner.scenario(id)
    }

    fn list_scenarios(&self) -> StoreResult<Vec<Scenario>> {
        self.inner.list_scenarios()
    }

    fn delete_scenario(&self, id: &ScenarioId) -> StoreResult<Scenario> {
        self.inner.delete_scenario(id)
    }

    fn snapshot(&self, id: &ScenarioId) -> StoreResult<ScenarioSnapshot> {
        self.inner.snapshot(id)
    }

    fn snapshot_many(&self, ids: &[ScenarioId]) -> StoreResult<Vec<ScenarioSnapshot>> {
        self.inner.snapshot_many(ids)
    }

    fn branch_snapshot(&self, id: &ScenarioId) -> StoreResult<Option<ScenarioSnapshot>> {
        self.inner.branch_snapshot(id)
    }

    fn apply(&self, mut changes: ChangeSet) -> StoreResult<CommitReceipt> {
        if changes.ops.iter().any(|op| op.scenario_id() == self.victim) {
            let mut draft = self.template.clone();
            draft.key.person_id = PersonId::new();
            changes.push(WriteOp::UpsertAssignment {
                scenario_id: self.victim,
                draft,
            });
        }
        self.inner.apply(changes)
    }

    fn merge_records(&self, id: &ScenarioId) -> StoreResult<Vec<MergeRecord>> {
        self.inner.merge_records(id)
    }
}

#[test]
fn failed_commit_rolls_back_everything() {
    let fx = Fixture::new();
    let a = conflicting_edit(&fx);
    fx.assign(a.id, fx.bob_on_zeus(), 35.0).unwrap();
    let before = content(&fx.store, fx.baseline.id);
    let before_revision = fx.store.snapshot(&fx.baseline.id).unwrap().revision;

    let faulty = Arc::new(FaultyStore {
        inner: fx.store.clone(),
        victim: fx.baseline.id,
        template: AssignmentDraft {
            key: fx.alice_on_apollo(),
            value: AssignmentValue::fixed(10.0, date(2025, 1, 1), date(2025, 1, 2)),
        },
    });
    let faulty_merger = MergeCoordinator::new(faulty, MergeConfig::default());

    let err = faulty_merger
        .merge(&a.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap_err();
    assert!(matches!(err, MergeError::Validation(_)), "{err:?}");

    assert_eq!(content(&fx.store, fx.baseline.id), before);
    assert_eq!(
        fx.store.snapshot(&fx.baseline.id).unwrap().revision,
        before_revision
    );
    assert_eq!(
        fx.store.scenario(&a.id).unwrap().unwrap().status,
        ScenarioStatus::Active
    );
    assert!(fx.store.merge_records(&a.id).unwrap().is_empty());
    assert!(!faulty_merger.locks().is_locked(&fx.baseline.id));

    // The same merge through a healthy store still goes through.
    coordinator(&fx)
        .merge(&a.id, MergeOptions::new(MergeStrategy::FavorSource))
        .unwrap();
    assert_eq!(fx.allocation(fx.baseline.id, &fx.alice_on_apollo()), Some(50.0));
}
