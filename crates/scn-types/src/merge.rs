use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{MergeRecordId, ScenarioId};

/// Policy for resolving entries where source and target disagree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    FavorSource,
    FavorTarget,
    Manual,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FavorSource => write!(f, "favor_source"),
            Self::FavorTarget => write!(f, "favor_target"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for MergeStrategy {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "favor_source" => Ok(Self::FavorSource),
            "favor_target" => Ok(Self::FavorTarget),
            "manual" => Ok(Self::Manual),
            other => Err(TypeError::UnknownVariant(other.to_string())),
        }
    }
}

/// Audit entry written once per committed merge. Never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub id: MergeRecordId,
    /// The merged (source) scenario.
    pub scenario_id: ScenarioId,
    pub target_scenario_id: ScenarioId,
    pub merge_strategy: MergeStrategy,
    pub conflicts_detected: usize,
    pub conflicts_resolved: usize,
    pub changes_applied: usize,
    /// Descriptions of source changes the target kept its own value over.
    pub superseded: Vec<String>,
    pub merged_at: DateTime<Utc>,
    pub merged_by: String,
}
