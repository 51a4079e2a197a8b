//! Scenario diffs.
//!
//! The core is [`classify`], a pure per-key decision over the source value,
//! the target value, and (in three-way mode) the value at the branch point.
//! [`diff_snapshots`] applies it to every row class; [`DiffEngine`] loads the
//! snapshots from a store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use scn_store::ScenarioStore;
use scn_types::{Catalog, ScenarioId, ScenarioSnapshot};

use crate::describe;
use crate::entry::{Change, ChangeKind, DiffEntry, DiffSet};
use crate::error::{DiffError, DiffResult};

/// Decide what a key's values amount to.
///
/// `base` is `None` for a two-way comparison and `Some(value_at_branch_point)`
/// for a three-way merge diff. Returns the change kind and whether it is a
/// conflict, or `None` when the source has nothing to contribute.
///
/// Three-way rules:
/// - an edit made only on the target side is not a change;
/// - an edit made only on the source side is a clean change;
/// - when both sides changed the key to different outcomes (including one
///   side deleting what the other edited, or both adding it with different
///   values) the change is a conflict;
/// - equal final values never produce a change.
pub fn classify<V: PartialEq>(
    source: Option<&V>,
    target: Option<&V>,
    base: Option<Option<&V>>,
) -> Option<(ChangeKind, bool)> {
    let Some(base) = base else {
        return match (source, target) {
            (Some(_), None) => Some((ChangeKind::Added, false)),
            (None, Some(_)) => Some((ChangeKind::Removed, false)),
            (Some(s), Some(t)) if s != t => Some((ChangeKind::Modified, false)),
            _ => None,
        };
    };

    match (source, base, target) {
        (Some(_), None, None) => Some((ChangeKind::Added, false)),
        (Some(s), None, Some(t)) => (s != t).then_some((ChangeKind::Modified, true)),
        (Some(s), Some(b), None) => (s != b).then_some((ChangeKind::Modified, true)),
        (Some(s), Some(b), Some(t)) => {
            if s == t || s == b {
                None
            } else {
                Some((ChangeKind::Modified, t != b))
            }
        }
        (None, Some(b), Some(t)) => Some((ChangeKind::Removed, t != b)),
        (None, _, _) => None,
    }
}

/// Diff two keyed maps. Entries come out in key order, without descriptions.
pub(crate) fn diff_maps<K, V>(
    source: &BTreeMap<K, V>,
    target: &BTreeMap<K, V>,
    base: Option<&BTreeMap<K, V>>,
) -> Vec<Change<K, V>>
where
    K: Ord + Copy,
    V: PartialEq + Clone,
{
    let keys: BTreeSet<&K> = source.keys().chain(target.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let s = source.get(key);
            let t = target.get(key);
            let b = base.map(|m| m.get(key));
            let (kind, conflict) = classify(s, t, b)?;
            Some(Change {
                key: *key,
                kind,
                source: s.cloned(),
                target: t.cloned(),
                base: b.flatten().cloned(),
                conflict,
                description: String::new(),
            })
        })
        .collect()
}

/// Diff `source` against `target`, three-way when `base` is given.
pub fn diff_snapshots(
    source: &ScenarioSnapshot,
    target: &ScenarioSnapshot,
    base: Option<&ScenarioSnapshot>,
    catalog: &Catalog,
) -> DiffSet {
    let mut entries = Vec::new();

    let base_assignments = base.map(ScenarioSnapshot::assignment_map);
    entries.extend(
        diff_maps(
            &source.assignment_map(),
            &target.assignment_map(),
            base_assignments.as_ref(),
        )
        .into_iter()
        .map(|mut c| {
            c.description = describe::assignment(&c, catalog);
            DiffEntry::Assignment(c)
        }),
    );

    let base_overrides = base.map(ScenarioSnapshot::override_map);
    entries.extend(
        diff_maps(
            &source.override_map(),
            &target.override_map(),
            base_overrides.as_ref(),
        )
        .into_iter()
        .map(|mut c| {
            c.description = describe::project_override(&c, catalog);
            DiffEntry::ProjectOverride(c)
        }),
    );

    let base_phases = base.map(ScenarioSnapshot::phase_map);
    entries.extend(
        diff_maps(&source.phase_map(), &target.phase_map(), base_phases.as_ref())
            .into_iter()
            .map(|mut c| {
                c.description = describe::phase_timeline(&c, catalog);
                DiffEntry::PhaseTimeline(c)
            }),
    );

    DiffSet {
        source_id: source.scenario.id,
        target_id: target.scenario.id,
        source_revision: source.revision,
        target_revision: target.revision,
        three_way: base.is_some(),
        entries,
    }
}

/// Computes merge diffs from stored scenarios.
pub struct DiffEngine {
    store: Arc<dyn ScenarioStore>,
}

impl DiffEngine {
    pub fn new(store: Arc<dyn ScenarioStore>) -> Self {
        Self { store }
    }

    /// Three-way diff of `source_id` against its parent `target_id`, using
    /// the source's branch snapshot as common ancestor.
    pub fn diff(&self, source_id: &ScenarioId, target_id: &ScenarioId) -> DiffResult<DiffSet> {
        let snapshots = self.store.snapshot_many(&[*source_id, *target_id])?;
        let [source, target] = <[ScenarioSnapshot; 2]>::try_from(snapshots).map_err(|v| {
            DiffError::Consistency(format!("expected 2 snapshots, store returned {}", v.len()))
        })?;
        let base = self.branch_point(&source, target_id)?;
        let catalog = self.store.catalog()?;
        let diff = diff_snapshots(&source, &target, Some(&base), &catalog);
        debug!(
            source = %source_id,
            target = %target_id,
            entries = diff.len(),
            conflicts = diff.conflict_count(),
            "computed merge diff"
        );
        Ok(diff)
    }

    /// The branch snapshot of `source`, checked to belong to `target_id`.
    pub fn branch_point(
        &self,
        source: &ScenarioSnapshot,
        target_id: &ScenarioId,
    ) -> DiffResult<ScenarioSnapshot> {
        if source.scenario.parent_scenario_id != Some(*target_id) {
            return Err(DiffError::NotParent {
                child: source.scenario.id,
                target: *target_id,
            });
        }
        let base = self
            .store
            .branch_snapshot(&source.scenario.id)?
            .ok_or_else(|| {
                DiffError::Consistency(format!(
                    "scenario {} has no branch snapshot",
                    source.scenario.id
                ))
            })?;
        if base.scenario.id != *target_id {
            return Err(DiffError::Consistency(format!(
                "branch snapshot of {} was taken from {}, not its parent {}",
                source.scenario.id, base.scenario.id, target_id
            )));
        }
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntityClass, EntryKey};
    use proptest::prelude::*;
    use scn_store::fixture::{date, Fixture};
    use scn_store::{ChangeSet, WriteOp};
    use scn_types::{DependencyType, PhaseLink, PhaseValue};

    // ----------------------------------------------------------------
    // classify
    // ----------------------------------------------------------------

    fn three(s: Option<i32>, b: Option<i32>, t: Option<i32>) -> Option<(ChangeKind, bool)> {
        classify(s.as_ref(), t.as_ref(), Some(b.as_ref()))
    }

    #[test]
    fn three_way_table() {
        use ChangeKind::*;
        assert_eq!(three(Some(1), None, None), Some((Added, false)));
        assert_eq!(three(Some(1), None, Some(1)), None);
        assert_eq!(three(Some(1), None, Some(2)), Some((Modified, true)));
        assert_eq!(three(Some(1), Some(1), None), None);
        assert_eq!(three(Some(2), Some(1), None), Some((Modified, true)));
        assert_eq!(three(Some(2), Some(1), Some(2)), None);
        assert_eq!(three(Some(1), Some(1), Some(2)), None);
        assert_eq!(three(Some(2), Some(1), Some(1)), Some((Modified, false)));
        assert_eq!(three(Some(2), Some(1), Some(3)), Some((Modified, true)));
        assert_eq!(three(None, Some(1), Some(1)), Some((Removed, false)));
        assert_eq!(three(None, Some(1), Some(2)), Some((Removed, true)));
        assert_eq!(three(None, Some(1), None), None);
        assert_eq!(three(None, None, Some(1)), None);
    }

    #[test]
    fn two_way_table() {
        use ChangeKind::*;
        let two = |s: Option<i32>, t: Option<i32>| classify(s.as_ref(), t.as_ref(), None);
        assert_eq!(two(Some(1), None), Some((Added, false)));
        assert_eq!(two(None, Some(1)), Some((Removed, false)));
        assert_eq!(two(Some(1), Some(2)), Some((Modified, false)));
        assert_eq!(two(Some(1), Some(1)), None);
        assert_eq!(two(None, None), None);
    }

    proptest! {
        #[test]
        fn diff_with_itself_is_empty(map in prop::collection::btree_map(0u8..20, 0u8..5, 0..15)) {
            prop_assert!(diff_maps(&map, &map, None).is_empty());
            prop_assert!(diff_maps(&map, &map, Some(&map)).is_empty());
        }

        /// When the target has not moved since the branch point, every change
        /// is clean and replaying them on the target reproduces the source.
        #[test]
        fn untouched_target_replays_to_source(
            base in prop::collection::btree_map(0u8..20, 0u8..5, 0..15),
            source in prop::collection::btree_map(0u8..20, 0u8..5, 0..15),
        ) {
            let changes = diff_maps(&source, &base, Some(&base));
            prop_assert!(changes.iter().all(|c| !c.conflict));

            let mut replayed = base.clone();
            for c in changes {
                match c.kind {
                    ChangeKind::Added | ChangeKind::Modified => {
                        replayed.insert(c.key, c.source.unwrap());
                    }
                    ChangeKind::Removed => {
                        replayed.remove(&c.key);
                    }
                }
            }
            prop_assert_eq!(replayed, source);
        }

        /// A source that never moved from the branch point contributes nothing.
        #[test]
        fn untouched_source_contributes_nothing(
            base in prop::collection::btree_map(0u8..20, 0u8..5, 0..15),
            target in prop::collection::btree_map(0u8..20, 0u8..5, 0..15),
        ) {
            prop_assert!(diff_maps(&base, &target, Some(&base)).is_empty());
        }
    }

    // ----------------------------------------------------------------
    // DiffEngine over a store
    // ----------------------------------------------------------------

    fn engine(fx: &Fixture) -> DiffEngine {
        DiffEngine::new(fx.store.clone())
    }

    #[test]
    fn source_only_edit_is_clean_with_description() {
        let fx = Fixture::new();
        let key = fx.alice_on_apollo();
        fx.assign(fx.baseline.id, key, 75.0).unwrap();
        let a = fx.branch("A", fx.baseline.id);
        fx.assign(a.id, key, 50.0).unwrap();

        let diff = engine(&fx).diff(&a.id, &fx.baseline.id).unwrap();
        assert!(diff.three_way);
        assert_eq!(diff.len(), 1);
        let entry = &diff.entries[0];
        assert_eq!(entry.kind(), ChangeKind::Modified);
        assert!(!entry.is_conflict());
        assert_eq!(entry.description(), "Alice → Apollo: 75% → 50%");
        assert_eq!(entry.key(), EntryKey::Assignment(key));
    }

    #[test]
    fn target_only_edit_is_not_a_change() {
        let fx = Fixture::new();
        let key = fx.alice_on_apollo();
        fx.assign(fx.baseline.id, key, 75.0).unwrap();
        let a = fx.branch("A", fx.baseline.id);
        fx.assign(fx.baseline.id, key, 60.0).unwrap();

        let diff = engine(&fx).diff(&a.id, &fx.baseline.id).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn both_sides_edited_is_a_conflict() {
        let fx = Fixture::new();
        let key = fx.alice_on_apollo();
        fx.assign(fx.baseline.id, key, 75.0).unwrap();
        let a = fx.branch("A", fx.baseline.id);
        fx.assign(a.id, key, 50.0).unwrap();
        fx.assign(fx.baseline.id, key, 60.0).unwrap();

        let diff = engine(&fx).diff(&a.id, &fx.baseline.id).unwrap();
        assert_eq!(diff.conflict_count(), 1);
        match &diff.entries[0] {
            DiffEntry::Assignment(c) => {
                assert_eq!(c.base.as_ref().unwrap().allocation_percentage, 75.0);
                assert_eq!(c.target.as_ref().unwrap().allocation_percentage, 60.0);
                assert_eq!(c.source.as_ref().unwrap().allocation_percentage, 50.0);
                assert_eq!(c.description, "Alice → Apollo: 60% → 50%");
            }
            other => panic!("expected assignment entry, got {other:?}"),
        }
    }

    #[test]
    fn additions_and_removals() {
        let fx = Fixture::new();
        let alice = fx.alice_on_apollo();
        let bob = fx.bob_on_zeus();
        fx.assign(fx.baseline.id, alice, 75.0).unwrap();
        let a = fx.branch("A", fx.baseline.id);
        fx.assign(a.id, bob, 40.0).unwrap();
        let row = fx.store.snapshot(&a.id).unwrap().assignment(&alice).unwrap().id;
        fx.store.delete_assignment(&a.id, &row).unwrap();

        let diff = engine(&fx).diff(&a.id, &fx.baseline.id).unwrap();
        let counts = diff.counts(EntityClass::Assignment);
        assert_eq!((counts.added, counts.modified, counts.removed), (1, 0, 1));
        assert_eq!(diff.conflict_count(), 0);
        let descriptions: Vec<_> = diff.entries.iter().map(|e| e.description().to_string()).collect();
        assert!(descriptions.contains(&"Bob → Zeus: added (40%)".to_string()));
        assert!(descriptions.contains(&"Alice → Apollo: removed (was 75%)".to_string()));
    }

    #[test]
    fn modify_delete_is_a_conflict_without_target_value() {
        let fx = Fixture::new();
        let key = fx.alice_on_apollo();
        let row = fx.assign(fx.baseline.id, key, 75.0).unwrap();
        let a = fx.branch("A", fx.baseline.id);
        fx.assign(a.id, key, 50.0).unwrap();
        fx.store.delete_assignment(&fx.baseline.id, &row.id).unwrap();

        let diff = engine(&fx).diff(&a.id, &fx.baseline.id).unwrap();
        match &diff.entries[..] {
            [DiffEntry::Assignment(c)] => {
                assert_eq!(c.kind, ChangeKind::Modified);
                assert!(c.conflict);
                assert!(c.target.is_none());
            }
            other => panic!("unexpected entries {other:?}"),
        }
    }

    #[test]
    fn dependency_edit_shows_as_phase_change() {
        let fx = Fixture::new();
        let span = |a, b| PhaseValue::new(a, b);
        fx.timeline(fx.baseline.id, fx.discovery, span(date(2025, 1, 1), date(2025, 1, 31)))
            .unwrap();
        fx.timeline(fx.baseline.id, fx.build, span(date(2025, 2, 1), date(2025, 4, 30)))
            .unwrap();
        let a = fx.branch("A", fx.baseline.id);
        fx.timeline(
            a.id,
            fx.build,
            span(date(2025, 2, 1), date(2025, 4, 30)).with_predecessor(PhaseLink {
                predecessor_phase_id: fx.discovery,
                dependency_type: DependencyType::FS,
                lag_days: 2,
            }),
        )
        .unwrap();

        let diff = engine(&fx).diff(&a.id, &fx.baseline.id).unwrap();
        assert_eq!(diff.counts(EntityClass::PhaseTimeline).modified, 1);
        assert_eq!(
            diff.entries[0].description(),
            "Apollo / Build: depends on none → Discovery FS+2d"
        );
    }

    #[test]
    fn entries_ordered_by_class() {
        let fx = Fixture::new();
        let a = fx.branch("A", fx.baseline.id);
        fx.timeline(a.id, fx.build, PhaseValue::new(date(2025, 2, 1), date(2025, 4, 30)))
            .unwrap();
        fx.store
            .apply(ChangeSet::new().with(WriteOp::UpsertOverride {
                scenario_id: a.id,
                draft: scn_types::OverrideDraft {
                    key: scn_types::OverrideKey {
                        project_id: fx.zeus,
                    },
                    value: scn_types::OverrideValue {
                        priority: Some(9),
                        ..Default::default()
                    },
                },
            }))
            .unwrap();
        fx.assign(a.id, fx.bob_on_zeus(), 30.0).unwrap();

        let diff = engine(&fx).diff(&a.id, &fx.baseline.id).unwrap();
        let classes: Vec<_> = diff.entries.iter().map(DiffEntry::class).collect();
        assert_eq!(
            classes,
            vec![
                EntityClass::Assignment,
                EntityClass::ProjectOverride,
                EntityClass::PhaseTimeline
            ]
        );
    }

    #[test]
    fn diff_requires_parent_target() {
        let fx = Fixture::new();
        let a = fx.branch("A", fx.baseline.id);
        let b = fx.branch("B", a.id);

        assert!(matches!(
            engine(&fx).diff(&b.id, &fx.baseline.id),
            Err(DiffError::NotParent { .. })
        ));
        assert!(matches!(
            engine(&fx).diff(&fx.baseline.id, &a.id),
            Err(DiffError::NotParent { .. })
        ));
    }

    #[test]
    fn entries_serialize_with_entity_tag() {
        let fx = Fixture::new();
        let a = fx.branch("A", fx.baseline.id);
        fx.assign(a.id, fx.alice_on_apollo(), 50.0).unwrap();
        let diff = engine(&fx).diff(&a.id, &fx.baseline.id).unwrap();

        let json = serde_json::to_value(&diff.entries[0]).unwrap();
        assert_eq!(json["entity"], "assignment");
        assert_eq!(json["kind"], "added");
        assert_eq!(json["source"]["allocation_percentage"], 50.0);
    }
}
