//! Backend-independent store state and its transactional rules.
//!
//! [`StoreState`] is a plain value: backends hold it behind a lock, stage a
//! change set on a clone, and swap the clone in only when every check passed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{NaiveDate, Utc};
use tracing::debug;

use scn_dag::{check_acyclic, lineage};
use scn_types::{
    derive_dates, AssignmentId, AssignmentKey, Catalog, CatalogEntry, DateRange, DependencyId,
    MergeRecord, NewScenario, OverrideKey, PhaseDependency, PhaseKey, PhaseLink,
    PhaseTimelineId, Scenario, ScenarioAssignment, ScenarioId, ScenarioPhaseTimeline,
    ScenarioProjectOverride, ScenarioSnapshot, ScenarioStatus, ScenarioType,
};

use crate::changes::{ChangeSet, CommitReceipt, WriteOp};
use crate::error::{StoreError, StoreResult};

/// One scenario and its scoped rows, indexed by natural key.
#[derive(Clone, Debug)]
pub struct ScopedRows {
    pub scenario: Scenario,
    pub revision: u64,
    pub assignments: BTreeMap<AssignmentKey, ScenarioAssignment>,
    pub overrides: BTreeMap<OverrideKey, ScenarioProjectOverride>,
    pub timelines: BTreeMap<PhaseKey, ScenarioPhaseTimeline>,
    pub dependencies: Vec<PhaseDependency>,
}

impl ScopedRows {
    fn empty(scenario: Scenario) -> Self {
        Self {
            scenario,
            revision: 1,
            assignments: BTreeMap::new(),
            overrides: BTreeMap::new(),
            timelines: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> ScenarioSnapshot {
        ScenarioSnapshot {
            scenario: self.scenario.clone(),
            revision: self.revision,
            taken_at: Utc::now(),
            assignments: self.assignments.values().cloned().collect(),
            overrides: self.overrides.values().cloned().collect(),
            phase_timelines: self.timelines.values().cloned().collect(),
            dependencies: self.dependencies.clone(),
        }
    }

    /// Copy every row into a new scenario with fresh row ids.
    fn copy_into(&self, child: Scenario) -> Self {
        let id = child.id;
        let mut timeline_ids: HashMap<PhaseTimelineId, PhaseTimelineId> = HashMap::new();
        let timelines = self
            .timelines
            .iter()
            .map(|(key, t)| {
                let copy = ScenarioPhaseTimeline::new(id, *key, t.start_date, t.end_date);
                timeline_ids.insert(t.id, copy.id);
                (*key, copy)
            })
            .collect();
        let dependencies = self
            .dependencies
            .iter()
            .filter_map(|d| {
                Some(PhaseDependency {
                    id: DependencyId::new(),
                    scenario_id: id,
                    predecessor_phase_timeline_id: *timeline_ids.get(&d.predecessor_phase_timeline_id)?,
                    successor_phase_timeline_id: *timeline_ids.get(&d.successor_phase_timeline_id)?,
                    dependency_type: d.dependency_type,
                    lag_days: d.lag_days,
                })
            })
            .collect();
        let assignments = self
            .assignments
            .iter()
            .map(|(key, a)| {
                let mut copy = a.clone();
                copy.id = AssignmentId::new();
                copy.scenario_id = id;
                (*key, copy)
            })
            .collect();
        let overrides = self
            .overrides
            .iter()
            .map(|(key, o)| (*key, ScenarioProjectOverride::new(id, *key, o.value())))
            .collect();

        Self {
            scenario: child,
            revision: 1,
            assignments,
            overrides,
            timelines,
            dependencies,
        }
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.scenario.is_writable() {
            Ok(())
        } else {
            Err(StoreError::NotWritable {
                id: self.scenario.id,
                status: self.scenario.status,
            })
        }
    }

    fn row_not_found(&self, row: String) -> StoreError {
        StoreError::RowNotFound {
            scenario: self.scenario.id,
            row,
        }
    }

    /// Replace the incoming dependencies of the timeline at `key`.
    fn relink(&mut self, key: &PhaseKey, links: &[PhaseLink], catalog: &Catalog) -> StoreResult<()> {
        let Some(successor) = self.timelines.get(key).map(|t| t.id) else {
            return Ok(());
        };
        self.dependencies
            .retain(|d| d.successor_phase_timeline_id != successor);
        for link in links {
            let pred_key = PhaseKey {
                project_id: key.project_id,
                phase_id: link.predecessor_phase_id,
            };
            let predecessor = self.timelines.get(&pred_key).ok_or_else(|| {
                StoreError::Validation(format!(
                    "{} has no {} timeline to depend on",
                    catalog.project_name(&key.project_id),
                    catalog.phase_name(&link.predecessor_phase_id)
                ))
            })?;
            self.dependencies.push(PhaseDependency {
                id: DependencyId::new(),
                scenario_id: self.scenario.id,
                predecessor_phase_timeline_id: predecessor.id,
                successor_phase_timeline_id: successor,
                dependency_type: link.dependency_type,
                lag_days: link.lag_days,
            });
        }
        Ok(())
    }

    /// Check the dependency graph and re-derive every computed date.
    fn revalidate(&mut self, catalog: &Catalog) -> StoreResult<()> {
        let nodes: Vec<PhaseTimelineId> = self.timelines.values().map(|t| t.id).collect();
        let edges: Vec<_> = self
            .dependencies
            .iter()
            .map(|d| (d.predecessor_phase_timeline_id, d.successor_phase_timeline_id))
            .collect();
        check_acyclic(&nodes, &edges)?;

        for (key, assignment) in self.assignments.iter_mut() {
            let project = catalog.project(&key.project_id).ok_or_else(|| {
                StoreError::Validation(format!("unknown project {}", key.project_id))
            })?;
            let project_override = self
                .overrides
                .get(&OverrideKey {
                    project_id: key.project_id,
                })
                .map(ScenarioProjectOverride::value);
            let phase_range = assignment.phase_id.and_then(|phase_id| {
                self.timelines
                    .get(&PhaseKey {
                        project_id: key.project_id,
                        phase_id,
                    })
                    .map(|t| DateRange::new(t.start_date, t.end_date))
            });
            let range = derive_dates(
                &assignment.value(),
                project,
                project_override.as_ref(),
                phase_range,
            )
            .map_err(|e| {
                StoreError::Validation(format!(
                    "{} on {}: {e}",
                    catalog.person_name(&key.person_id),
                    project.name
                ))
            })?;
            assignment.computed_start_date = range.start;
            assignment.computed_end_date = range.end;
        }
        Ok(())
    }
}

/// Everything a scenario store holds.
#[derive(Clone, Debug, Default)]
pub struct StoreState {
    catalog: Catalog,
    scenarios: HashMap<ScenarioId, ScopedRows>,
    /// Creation order, oldest first.
    order: Vec<ScenarioId>,
    branch_snapshots: HashMap<ScenarioId, ScenarioSnapshot>,
    merge_records: Vec<MergeRecord>,
}

impl StoreState {
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Add a catalog row. The catalog is append-only: stored rows derive
    /// their dates from it, so an existing id is never replaced.
    pub fn register(&mut self, entry: CatalogEntry) -> StoreResult<()> {
        if self.catalog.contains(&entry) {
            return Err(StoreError::Validation(format!(
                "{} is already registered",
                entry.label()
            )));
        }
        self.catalog.insert(entry);
        Ok(())
    }

    pub fn rows(&self, id: &ScenarioId) -> StoreResult<&ScopedRows> {
        self.scenarios
            .get(id)
            .ok_or(StoreError::ScenarioNotFound(*id))
    }

    fn rows_mut(&mut self, id: &ScenarioId) -> StoreResult<&mut ScopedRows> {
        self.scenarios
            .get_mut(id)
            .ok_or(StoreError::ScenarioNotFound(*id))
    }

    pub fn scenario(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.get(id).map(|r| &r.scenario)
    }

    /// Newest first; scenarios created in the same instant keep reverse
    /// creation order.
    pub fn list(&self) -> Vec<Scenario> {
        let mut list: Vec<Scenario> = self
            .order
            .iter()
            .rev()
            .filter_map(|id| self.scenario(id).cloned())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    pub fn branch_snapshot(&self, id: &ScenarioId) -> StoreResult<Option<ScenarioSnapshot>> {
        self.rows(id)?;
        Ok(self.branch_snapshots.get(id).cloned())
    }

    pub fn merge_records(&self, id: &ScenarioId) -> Vec<MergeRecord> {
        self.merge_records
            .iter()
            .filter(|r| r.scenario_id == *id || r.target_scenario_id == *id)
            .cloned()
            .collect()
    }

    fn baseline_id(&self) -> Option<ScenarioId> {
        self.scenarios
            .values()
            .find(|r| r.scenario.is_baseline())
            .map(|r| r.scenario.id)
    }

    fn parent_of(&self, id: &ScenarioId) -> Option<Option<ScenarioId>> {
        self.scenario(id).map(|s| s.parent_scenario_id)
    }

    /// Create a scenario. Non-baseline scenarios copy their parent's rows and
    /// capture its state as the branch snapshot.
    pub fn create(&mut self, request: NewScenario) -> StoreResult<Scenario> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("scenario name must not be empty".into()));
        }
        let now = Utc::now();
        let mut scenario = Scenario {
            id: ScenarioId::new(),
            name: name.to_string(),
            description: request.description,
            scenario_type: request.scenario_type,
            status: ScenarioStatus::Active,
            parent_scenario_id: None,
            branch_point: None,
            created_by: request.created_by,
            created_at: now,
        };

        if request.scenario_type == ScenarioType::Baseline {
            if request.parent_scenario_id.is_some() {
                return Err(StoreError::Validation("a baseline cannot have a parent".into()));
            }
            if self.baseline_id().is_some() {
                return Err(StoreError::Validation("a baseline scenario already exists".into()));
            }
            debug!(scenario = %scenario.id, name = %scenario.name, "created baseline");
            self.order.push(scenario.id);
            self.scenarios
                .insert(scenario.id, ScopedRows::empty(scenario.clone()));
            return Ok(scenario);
        }

        let parent_id = request
            .parent_scenario_id
            .or_else(|| self.baseline_id())
            .ok_or_else(|| StoreError::Validation("no baseline scenario exists".into()))?;
        let parent = self.scenarios.get(&parent_id).ok_or_else(|| {
            StoreError::Validation(format!("parent scenario {parent_id} does not exist"))
        })?;
        if !parent.scenario.is_writable() {
            return Err(StoreError::Validation(format!(
                "parent scenario '{}' is {}",
                parent.scenario.name, parent.scenario.status
            )));
        }

        let chain = lineage(parent_id, |id| self.parent_of(id))?;
        let root_is_baseline = chain
            .last()
            .and_then(|root| self.scenario(root))
            .is_some_and(Scenario::is_baseline);
        if !root_is_baseline {
            return Err(StoreError::Consistency(format!(
                "scenario {parent_id} is not descended from the baseline"
            )));
        }

        scenario.parent_scenario_id = Some(parent_id);
        scenario.branch_point = Some(now);
        let mut base = parent.snapshot();
        base.taken_at = now;
        let rows = parent.copy_into(scenario.clone());

        debug!(
            scenario = %scenario.id,
            parent = %parent_id,
            assignments = rows.assignments.len(),
            timelines = rows.timelines.len(),
            "branched scenario"
        );
        self.order.push(scenario.id);
        self.branch_snapshots.insert(scenario.id, base);
        self.scenarios.insert(scenario.id, rows);
        Ok(scenario)
    }

    /// Delete a non-baseline, non-merged scenario that has no children.
    pub fn delete(&mut self, id: &ScenarioId) -> StoreResult<Scenario> {
        let scenario = self.rows(id)?.scenario.clone();
        let refuse = |reason: String| StoreError::CannotRemove { id: *id, reason };
        if scenario.is_baseline() {
            return Err(refuse("the baseline cannot be deleted".into()));
        }
        if scenario.status == ScenarioStatus::Merged {
            return Err(refuse("merged scenarios are kept for audit".into()));
        }
        let children = self
            .scenarios
            .values()
            .filter(|r| r.scenario.parent_scenario_id == Some(*id))
            .count();
        if children > 0 {
            return Err(refuse(format!("it has {children} child scenario(s)")));
        }

        self.scenarios.remove(id);
        self.branch_snapshots.remove(id);
        self.order.retain(|s| s != id);
        debug!(scenario = %id, "deleted scenario");
        Ok(scenario)
    }

    /// Apply a change set in place. Callers stage on a clone: on error the
    /// state is left partially modified and must be discarded.
    pub fn apply(&mut self, changes: ChangeSet) -> StoreResult<CommitReceipt> {
        for (id, expected) in &changes.expected_revisions {
            let actual = self.rows(id)?.revision;
            if actual != *expected {
                return Err(StoreError::StaleSnapshot {
                    scenario: *id,
                    expected: *expected,
                    actual,
                });
            }
        }

        let ops_applied = changes.ops.len();
        let mut touched: BTreeSet<ScenarioId> = BTreeSet::new();
        let mut relinks: Vec<(ScenarioId, PhaseKey, Vec<PhaseLink>)> = Vec::new();

        for op in changes.ops {
            let scenario_id = op.scenario_id();
            match op {
                WriteOp::AppendMergeRecord(record) => {
                    self.rows(&record.scenario_id)?;
                    self.rows(&record.target_scenario_id)?;
                    self.merge_records.push(record);
                    continue;
                }
                WriteOp::SetScenarioStatus { status, .. } => {
                    let rows = self.rows_mut(&scenario_id)?;
                    transition(&rows.scenario, status)?;
                    rows.scenario.status = status;
                }
                op => {
                    let catalog = &self.catalog;
                    let rows = self
                        .scenarios
                        .get_mut(&scenario_id)
                        .ok_or(StoreError::ScenarioNotFound(scenario_id))?;
                    rows.ensure_writable()?;
                    if let Some(relink) = write_row(rows, catalog, op)? {
                        relinks.retain(|(s, k, _)| !(*s == scenario_id && *k == relink.0));
                        relinks.push((scenario_id, relink.0, relink.1));
                    }
                }
            }
            touched.insert(scenario_id);
        }

        for (scenario_id, key, links) in &relinks {
            let catalog = &self.catalog;
            let rows = self
                .scenarios
                .get_mut(scenario_id)
                .ok_or(StoreError::ScenarioNotFound(*scenario_id))?;
            rows.relink(key, links, catalog)?;
        }

        let mut revisions = Vec::with_capacity(touched.len());
        for scenario_id in &touched {
            let catalog = &self.catalog;
            let rows = self
                .scenarios
                .get_mut(scenario_id)
                .ok_or(StoreError::ScenarioNotFound(*scenario_id))?;
            rows.revalidate(catalog)?;
            rows.revision += 1;
            revisions.push((*scenario_id, rows.revision));
        }

        debug!(ops = ops_applied, scenarios = touched.len(), "applied change set");
        Ok(CommitReceipt {
            ops_applied,
            revisions,
        })
    }
}

fn transition(scenario: &Scenario, to: ScenarioStatus) -> StoreResult<()> {
    if scenario.is_baseline() {
        return Err(StoreError::CannotRemove {
            id: scenario.id,
            reason: format!("the baseline cannot become {to}"),
        });
    }
    match (scenario.status, to) {
        (ScenarioStatus::Active, ScenarioStatus::Merged)
        | (ScenarioStatus::Active, ScenarioStatus::Archived)
        | (ScenarioStatus::Merged, ScenarioStatus::Archived) => Ok(()),
        (from, to) => Err(StoreError::Validation(format!(
            "scenario '{}' cannot go from {from} to {to}",
            scenario.name
        ))),
    }
}

/// Apply one row operation. Returns the timeline whose incoming links must be
/// rebuilt once every operation has run.
fn write_row(
    rows: &mut ScopedRows,
    catalog: &Catalog,
    op: WriteOp,
) -> StoreResult<Option<(PhaseKey, Vec<PhaseLink>)>> {
    let scenario_id = rows.scenario.id;
    match op {
        WriteOp::UpsertAssignment { draft, .. } => {
            draft.value.validate()?;
            let key = draft.key;
            require(catalog.projects.contains_key(&key.project_id), || {
                format!("unknown project {}", key.project_id)
            })?;
            require(catalog.people.contains_key(&key.person_id), || {
                format!("unknown person {}", key.person_id)
            })?;
            require(catalog.roles.contains_key(&key.role_id), || {
                format!("unknown role {}", key.role_id)
            })?;
            if let Some(phase_id) = draft.value.phase_id {
                require(catalog.phases.contains_key(&phase_id), || {
                    format!("unknown phase {phase_id}")
                })?;
            }
            match rows.assignments.get_mut(&key) {
                Some(existing) => existing.apply_value(draft.value),
                None => {
                    // Computed dates are derived when the change set is validated.
                    let row = ScenarioAssignment::from_parts(
                        AssignmentId::new(),
                        scenario_id,
                        key,
                        draft.value,
                        (NaiveDate::MIN, NaiveDate::MIN),
                    );
                    rows.assignments.insert(key, row);
                }
            }
            Ok(None)
        }
        WriteOp::DeleteAssignment { key, .. } => {
            rows.assignments
                .remove(&key)
                .ok_or_else(|| rows.row_not_found(format!("assignment {key:?}")))?;
            Ok(None)
        }
        WriteOp::UpsertOverride { draft, .. } => {
            draft.value.validate()?;
            let key = draft.key;
            require(catalog.projects.contains_key(&key.project_id), || {
                format!("unknown project {}", key.project_id)
            })?;
            match rows.overrides.get_mut(&key) {
                Some(existing) => existing.apply_value(draft.value),
                None => {
                    rows.overrides
                        .insert(key, ScenarioProjectOverride::new(scenario_id, key, draft.value));
                }
            }
            Ok(None)
        }
        WriteOp::DeleteOverride { key, .. } => {
            rows.overrides
                .remove(&key)
                .ok_or_else(|| rows.row_not_found(format!("override {key:?}")))?;
            Ok(None)
        }
        WriteOp::UpsertPhaseTimeline { draft, .. } => {
            let mut value = draft.value;
            value.normalize();
            value.validate()?;
            let key = draft.key;
            require(catalog.projects.contains_key(&key.project_id), || {
                format!("unknown project {}", key.project_id)
            })?;
            for phase_id in std::iter::once(key.phase_id)
                .chain(value.predecessors.iter().map(|l| l.predecessor_phase_id))
            {
                require(catalog.phases.contains_key(&phase_id), || {
                    format!("unknown phase {phase_id}")
                })?;
            }
            match rows.timelines.get_mut(&key) {
                Some(existing) => {
                    existing.start_date = value.start_date;
                    existing.end_date = value.end_date;
                }
                None => {
                    rows.timelines.insert(
                        key,
                        ScenarioPhaseTimeline::new(scenario_id, key, value.start_date, value.end_date),
                    );
                }
            }
            Ok(Some((key, value.predecessors)))
        }
        WriteOp::DeletePhaseTimeline { key, .. } => {
            let removed = rows
                .timelines
                .remove(&key)
                .ok_or_else(|| rows.row_not_found(format!("phase timeline {key:?}")))?;
            rows.dependencies.retain(|d| {
                d.predecessor_phase_timeline_id != removed.id
                    && d.successor_phase_timeline_id != removed.id
            });
            Ok(None)
        }
        WriteOp::SetScenarioStatus { .. } | WriteOp::AppendMergeRecord(_) => Err(
            StoreError::Consistency("scenario-level operation routed as a row write".into()),
        ),
    }
}

fn require(ok: bool, message: impl FnOnce() -> String) -> StoreResult<()> {
    if ok {
        Ok(())
    } else {
        Err(StoreError::Validation(message()))
    }
}
