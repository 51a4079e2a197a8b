use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{AssignmentId, PersonId, PhaseId, ProjectId, RoleId, ScenarioId};

/// Where an assignment's effective dates come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateMode {
    /// The assignment's own `start_date` / `end_date`.
    Fixed,
    /// The scenario's timeline for the assignment's phase.
    Phase,
    /// The project's aspiration dates (scenario override first).
    Project,
}

impl fmt::Display for DateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Phase => write!(f, "phase"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// Business identity of an assignment across scenarios.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub project_id: ProjectId,
    pub person_id: PersonId,
    pub role_id: RoleId,
}

/// The user-editable fields of an assignment, compared during diffs.
///
/// Computed dates are excluded: they are re-derived in every scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignmentValue {
    #[serde(default)]
    pub phase_id: Option<PhaseId>,
    pub allocation_percentage: f64,
    pub assignment_date_mode: DateMode,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl AssignmentValue {
    /// A fixed-date assignment.
    pub fn fixed(allocation_percentage: f64, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            phase_id: None,
            allocation_percentage,
            assignment_date_mode: DateMode::Fixed,
            start_date: Some(start),
            end_date: Some(end),
        }
    }

    /// An assignment following a phase's timeline.
    pub fn phase(allocation_percentage: f64, phase_id: PhaseId) -> Self {
        Self {
            phase_id: Some(phase_id),
            allocation_percentage,
            assignment_date_mode: DateMode::Phase,
            start_date: None,
            end_date: None,
        }
    }

    /// An assignment following the project's aspiration dates.
    pub fn project(allocation_percentage: f64) -> Self {
        Self {
            phase_id: None,
            allocation_percentage,
            assignment_date_mode: DateMode::Project,
            start_date: None,
            end_date: None,
        }
    }

    /// Field-level checks that need no other rows.
    pub fn validate(&self) -> Result<(), TypeError> {
        let pct = self.allocation_percentage;
        if !(pct > 0.0 && pct <= 100.0) {
            return Err(TypeError::AllocationOutOfRange(pct.to_string()));
        }
        match self.assignment_date_mode {
            DateMode::Fixed => {
                let (Some(start), Some(end)) = (self.start_date, self.end_date) else {
                    return Err(TypeError::MissingDate(
                        "fixed assignments need start_date and end_date".into(),
                    ));
                };
                if start > end {
                    return Err(TypeError::InvalidDateRange {
                        start,
                        end,
                        reason: "start after end".into(),
                    });
                }
            }
            DateMode::Phase => {
                if self.phase_id.is_none() {
                    return Err(TypeError::MissingDate(
                        "phase assignments need a phase_id".into(),
                    ));
                }
            }
            DateMode::Project => {}
        }
        Ok(())
    }
}

/// Input for creating or replacing an assignment, addressed by natural key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignmentDraft {
    #[serde(flatten)]
    pub key: AssignmentKey,
    #[serde(flatten)]
    pub value: AssignmentValue,
}

/// A stored assignment row, scoped to one scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAssignment {
    pub id: AssignmentId,
    pub scenario_id: ScenarioId,
    pub project_id: ProjectId,
    pub person_id: PersonId,
    pub role_id: RoleId,
    pub phase_id: Option<PhaseId>,
    pub allocation_percentage: f64,
    pub assignment_date_mode: DateMode,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub computed_start_date: NaiveDate,
    pub computed_end_date: NaiveDate,
}

impl ScenarioAssignment {
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey {
            project_id: self.project_id,
            person_id: self.person_id,
            role_id: self.role_id,
        }
    }

    pub fn value(&self) -> AssignmentValue {
        AssignmentValue {
            phase_id: self.phase_id,
            allocation_percentage: self.allocation_percentage,
            assignment_date_mode: self.assignment_date_mode,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    /// Build a row from its parts. Computed dates are provisional until the
    /// store derives them on commit.
    pub fn from_parts(
        id: AssignmentId,
        scenario_id: ScenarioId,
        key: AssignmentKey,
        value: AssignmentValue,
        computed: (NaiveDate, NaiveDate),
    ) -> Self {
        Self {
            id,
            scenario_id,
            project_id: key.project_id,
            person_id: key.person_id,
            role_id: key.role_id,
            phase_id: value.phase_id,
            allocation_percentage: value.allocation_percentage,
            assignment_date_mode: value.assignment_date_mode,
            start_date: value.start_date,
            end_date: value.end_date,
            computed_start_date: computed.0,
            computed_end_date: computed.1,
        }
    }

    /// Replace the editable fields, keeping id, scope, and key.
    pub fn apply_value(&mut self, value: AssignmentValue) {
        self.phase_id = value.phase_id;
        self.allocation_percentage = value.allocation_percentage;
        self.assignment_date_mode = value.assignment_date_mode;
        self.start_date = value.start_date;
        self.end_date = value.end_date;
    }
}
