//! Point-in-time view of one scenario's scoped rows.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assignment::{AssignmentKey, AssignmentValue, ScenarioAssignment};
use crate::ids::PhaseTimelineId;
use crate::phase::{PhaseDependency, PhaseKey, PhaseLink, PhaseValue, ScenarioPhaseTimeline};
use crate::project_override::{OverrideKey, OverrideValue, ScenarioProjectOverride};
use crate::scenario::Scenario;

/// A consistent copy of a scenario and all of its scoped rows.
///
/// Snapshots are read under a single store lock, so a snapshot never mixes
/// rows from before and after a committed change set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSnapshot {
    pub scenario: Scenario,
    /// Store revision of the scenario when the snapshot was taken.
    pub revision: u64,
    pub taken_at: DateTime<Utc>,
    pub assignments: Vec<ScenarioAssignment>,
    pub overrides: Vec<ScenarioProjectOverride>,
    pub phase_timelines: Vec<ScenarioPhaseTimeline>,
    pub dependencies: Vec<PhaseDependency>,
}

impl ScenarioSnapshot {
    /// Assignments keyed by natural key.
    pub fn assignment_map(&self) -> BTreeMap<AssignmentKey, AssignmentValue> {
        self.assignments.iter().map(|a| (a.key(), a.value())).collect()
    }

    pub fn override_map(&self) -> BTreeMap<OverrideKey, OverrideValue> {
        self.overrides.iter().map(|o| (o.key(), o.value())).collect()
    }

    /// Phase timelines keyed by natural key, each carrying its incoming
    /// dependency links translated to predecessor phase ids.
    pub fn phase_map(&self) -> BTreeMap<PhaseKey, PhaseValue> {
        let by_id: HashMap<PhaseTimelineId, &ScenarioPhaseTimeline> =
            self.phase_timelines.iter().map(|t| (t.id, t)).collect();

        let mut map: BTreeMap<PhaseKey, PhaseValue> = self
            .phase_timelines
            .iter()
            .map(|t| (t.key(), PhaseValue::new(t.start_date, t.end_date)))
            .collect();

        for dep in &self.dependencies {
            let (Some(pred), Some(succ)) = (
                by_id.get(&dep.predecessor_phase_timeline_id),
                by_id.get(&dep.successor_phase_timeline_id),
            ) else {
                continue;
            };
            if let Some(value) = map.get_mut(&succ.key()) {
                value.predecessors.push(PhaseLink {
                    predecessor_phase_id: pred.phase_id,
                    dependency_type: dep.dependency_type,
                    lag_days: dep.lag_days,
                });
            }
        }
        for value in map.values_mut() {
            value.normalize();
        }
        map
    }

    pub fn assignment(&self, key: &AssignmentKey) -> Option<&ScenarioAssignment> {
        self.assignments.iter().find(|a| a.key() == *key)
    }

    /// Sum of allocation percentages across all assignments.
    pub fn total_allocation(&self) -> f64 {
        self.assignments.iter().map(|a| a.allocation_percentage).sum()
    }
}
