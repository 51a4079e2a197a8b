use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ScenarioId;

/// What role a scenario plays in the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    /// The single plan of record. Has no parent.
    Baseline,
    /// A long-lived alternative plan.
    Branch,
    /// A throwaway exploration.
    Sandbox,
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Branch => write!(f, "branch"),
            Self::Sandbox => write!(f, "sandbox"),
        }
    }
}

/// Lifecycle state of a scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Active,
    /// Merged into its parent; immutable except for archival.
    Merged,
    Archived,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Merged => write!(f, "merged"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// A planning scenario: a named, versioned view over assignments, project
/// overrides, and phase timelines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    pub description: Option<String>,
    pub scenario_type: ScenarioType,
    pub status: ScenarioStatus,
    /// `None` only for the baseline.
    pub parent_scenario_id: Option<ScenarioId>,
    /// When the scenario diverged from its parent.
    pub branch_point: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Scenario {
    /// Returns `true` if this is the baseline scenario.
    pub fn is_baseline(&self) -> bool {
        self.scenario_type == ScenarioType::Baseline
    }

    /// Returns `true` if scoped rows of this scenario may still be written.
    pub fn is_writable(&self) -> bool {
        self.status == ScenarioStatus::Active
    }
}

/// Request to create a scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scenario_type: ScenarioType,
    /// Defaults to the baseline for branch and sandbox scenarios.
    #[serde(default)]
    pub parent_scenario_id: Option<ScenarioId>,
    #[serde(default = "default_creator")]
    pub created_by: String,
}

fn default_creator() -> String {
    "system".into()
}

impl NewScenario {
    /// A baseline creation request.
    pub fn baseline(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            scenario_type: ScenarioType::Baseline,
            parent_scenario_id: None,
            created_by: default_creator(),
        }
    }

    /// A branch off `parent`.
    pub fn branch(name: impl Into<String>, parent: ScenarioId) -> Self {
        Self {
            name: name.into(),
            description: None,
            scenario_type: ScenarioType::Branch,
            parent_scenario_id: Some(parent),
            created_by: default_creator(),
        }
    }

    /// A sandbox off `parent`.
    pub fn sandbox(name: impl Into<String>, parent: ScenarioId) -> Self {
        Self {
            scenario_type: ScenarioType::Sandbox,
            ..Self::branch(name, parent)
        }
    }

    pub fn created_by(mut self, who: impl Into<String>) -> Self {
        self.created_by = who.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ScenarioType::Sandbox).unwrap(),
            "\"sandbox\""
        );
        assert_eq!(
            serde_json::to_string(&ScenarioStatus::Merged).unwrap(),
            "\"merged\""
        );
    }

    #[test]
    fn new_scenario_defaults_creator() {
        let req: NewScenario =
            serde_json::from_str(r#"{"name":"what-if","scenario_type":"branch"}"#).unwrap();
        assert_eq!(req.created_by, "system");
        assert!(req.parent_scenario_id.is_none());
    }

    #[test]
    fn sandbox_builder_keeps_parent() {
        let parent = ScenarioId::new();
        let req = NewScenario::sandbox("try", parent).created_by("alice");
        assert_eq!(req.scenario_type, ScenarioType::Sandbox);
        assert_eq!(req.parent_scenario_id, Some(parent));
        assert_eq!(req.created_by, "alice");
    }
}
