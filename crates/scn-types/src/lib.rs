//! Foundation types for the scenario planner.
//!
//! Scenarios are branches of planning data. This crate holds the records that
//! every other crate passes around: identifiers, scenarios, the shared
//! catalog, and the scenario-scoped rows together with their natural keys.
//!
//! # Key Types
//!
//! - [`Scenario`] / [`NewScenario`] -- hierarchy node and creation request
//! - [`ScenarioAssignment`], [`ScenarioProjectOverride`], [`ScenarioPhaseTimeline`],
//!   [`PhaseDependency`] -- scenario-scoped rows
//! - [`AssignmentKey`], [`OverrideKey`], [`PhaseKey`] -- natural keys that
//!   identify "the same" row across scenarios
//! - [`AssignmentValue`], [`OverrideValue`], [`PhaseValue`] -- the comparable
//!   part of each row
//! - [`ScenarioSnapshot`] -- consistent point-in-time copy of a scenario
//! - [`MergeRecord`] / [`MergeStrategy`] -- audit trail of merges

pub mod assignment;
pub mod catalog;
pub mod dates;
pub mod error;
pub mod ids;
pub mod merge;
pub mod phase;
pub mod project_override;
pub mod scenario;
pub mod snapshot;

pub use assignment::{AssignmentDraft, AssignmentKey, AssignmentValue, DateMode, ScenarioAssignment};
pub use catalog::{Catalog, CatalogEntry, CatalogSeed, Person, Phase, Project, Role};
pub use dates::{derive_dates, DateRange};
pub use error::TypeError;
pub use ids::{
    AssignmentId, DependencyId, MergeRecordId, OverrideId, PersonId, PhaseId, PhaseTimelineId,
    ProjectId, RoleId, ScenarioId,
};
pub use merge::{MergeRecord, MergeStrategy};
pub use phase::{
    DependencyType, PhaseDependency, PhaseDraft, PhaseKey, PhaseLink, PhaseValue,
    ScenarioPhaseTimeline,
};
pub use project_override::{OverrideDraft, OverrideKey, OverrideValue, ScenarioProjectOverride};
pub use scenario::{NewScenario, Scenario, ScenarioStatus, ScenarioType};
pub use snapshot::ScenarioSnapshot;
