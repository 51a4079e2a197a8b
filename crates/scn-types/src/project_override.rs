use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{OverrideId, ProjectId, ScenarioId};

/// Natural key of a project override: one override per project per scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverrideKey {
    pub project_id: ProjectId,
}

/// Scenario-local replacements for a project's attributes. `None` keeps the
/// catalog value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideValue {
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub aspiration_start: Option<NaiveDate>,
    #[serde(default)]
    pub aspiration_finish: Option<NaiveDate>,
}

impl OverrideValue {
    pub fn validate(&self) -> Result<(), TypeError> {
        if let (Some(start), Some(end)) = (self.aspiration_start, self.aspiration_finish) {
            if start >= end {
                return Err(TypeError::InvalidDateRange {
                    start,
                    end,
                    reason: "aspiration start must precede finish".into(),
                });
            }
        }
        Ok(())
    }
}

/// Input for creating or replacing a project override.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideDraft {
    #[serde(flatten)]
    pub key: OverrideKey,
    #[serde(flatten)]
    pub value: OverrideValue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioProjectOverride {
    pub id: OverrideId,
    pub scenario_id: ScenarioId,
    pub project_id: ProjectId,
    pub priority: Option<i32>,
    pub aspiration_start: Option<NaiveDate>,
    pub aspiration_finish: Option<NaiveDate>,
}

impl ScenarioProjectOverride {
    pub fn new(scenario_id: ScenarioId, key: OverrideKey, value: OverrideValue) -> Self {
        Self {
            id: OverrideId::new(),
            scenario_id,
            project_id: key.project_id,
            priority: value.priority,
            aspiration_start: value.aspiration_start,
            aspiration_finish: value.aspiration_finish,
        }
    }

    pub fn key(&self) -> OverrideKey {
        OverrideKey {
            project_id: self.project_id,
        }
    }

    pub fn value(&self) -> OverrideValue {
        OverrideValue {
            priority: self.priority,
            aspiration_start: self.aspiration_start,
            aspiration_finish: self.aspiration_finish,
        }
    }

    pub fn apply_value(&mut self, value: OverrideValue) {
        self.priority = value.priority;
        self.aspiration_start = value.aspiration_start;
        self.aspiration_finish = value.aspiration_finish;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspiration_dates_must_be_ordered() {
        let value = OverrideValue {
            priority: None,
            aspiration_start: NaiveDate::from_ymd_opt(2025, 5, 1),
            aspiration_finish: NaiveDate::from_ymd_opt(2025, 5, 1),
        };
        assert!(value.validate().is_err());
    }

    #[test]
    fn partial_override_is_valid() {
        let value = OverrideValue {
            priority: Some(1),
            ..Default::default()
        };
        assert!(value.validate().is_ok());
    }
}
