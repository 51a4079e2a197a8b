//! Per-scenario phase timelines and the dependency edges between them.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{DependencyId, PhaseId, PhaseTimelineId, ProjectId, ScenarioId};

/// Scheduling relation between two phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyType {
    /// Finish-to-start.
    FS,
    /// Start-to-start.
    SS,
    /// Finish-to-finish.
    FF,
    /// Start-to-finish.
    SF,
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FS => "FS",
            Self::SS => "SS",
            Self::FF => "FF",
            Self::SF => "SF",
        };
        f.write_str(s)
    }
}

/// Natural key of a phase timeline: one timeline per project phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhaseKey {
    pub project_id: ProjectId,
    pub phase_id: PhaseId,
}

/// An incoming dependency expressed by the predecessor's phase, so it can be
/// compared and replayed across scenarios whose row ids differ.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhaseLink {
    pub predecessor_phase_id: PhaseId,
    pub dependency_type: DependencyType,
    pub lag_days: i32,
}

/// Comparable state of a phase timeline: its dates and incoming links.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseValue {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Sorted, deduplicated.
    #[serde(default)]
    pub predecessors: Vec<PhaseLink>,
}

impl PhaseValue {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            predecessors: Vec::new(),
        }
    }

    pub fn with_predecessor(mut self, link: PhaseLink) -> Self {
        self.predecessors.push(link);
        self.normalize();
        self
    }

    /// Sort and deduplicate the predecessor list so equality is structural.
    pub fn normalize(&mut self) {
        self.predecessors.sort();
        self.predecessors.dedup();
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        if self.start_date >= self.end_date {
            return Err(TypeError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
                reason: "phase start must precede end".into(),
            });
        }
        if let Some(link) = self.predecessors.iter().find(|l| l.lag_days < 0) {
            return Err(TypeError::NegativeLag(link.lag_days));
        }
        Ok(())
    }
}

/// Input for creating or replacing a phase timeline and its incoming links.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDraft {
    #[serde(flatten)]
    pub key: PhaseKey,
    #[serde(flatten)]
    pub value: PhaseValue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioPhaseTimeline {
    pub id: PhaseTimelineId,
    pub scenario_id: ScenarioId,
    pub project_id: ProjectId,
    pub phase_id: PhaseId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ScenarioPhaseTimeline {
    pub fn new(
        scenario_id: ScenarioId,
        key: PhaseKey,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: PhaseTimelineId::new(),
            scenario_id,
            project_id: key.project_id,
            phase_id: key.phase_id,
            start_date,
            end_date,
        }
    }

    pub fn key(&self) -> PhaseKey {
        PhaseKey {
            project_id: self.project_id,
            phase_id: self.phase_id,
        }
    }
}

/// A directed edge between two timelines of the same scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDependency {
    pub id: DependencyId,
    pub scenario_id: ScenarioId,
    pub predecessor_phase_timeline_id: PhaseTimelineId,
    pub successor_phase_timeline_id: PhaseTimelineId,
    pub dependency_type: DependencyType,
    pub lag_days: i32,
}
