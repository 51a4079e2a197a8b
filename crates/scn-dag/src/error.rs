//! Error types for scenario hierarchy and phase dependency graphs.

use scn_types::{PhaseTimelineId, ScenarioId};

/// Errors that can occur while building or checking a graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DagError {
    /// A scenario is its own ancestor.
    #[error("cycle detected in scenario hierarchy at {0}")]
    CycleDetected(ScenarioId),

    /// A parent reference points to a scenario that does not exist.
    #[error("dangling parent reference: scenario {node} references missing parent {parent}")]
    DanglingParent {
        /// The scenario containing the bad reference.
        node: ScenarioId,
        /// The missing parent.
        parent: ScenarioId,
    },

    /// Two records share an id.
    #[error("duplicate scenario: {0}")]
    DuplicateNode(ScenarioId),

    /// The phase dependency graph contains a cycle through these timelines.
    #[error("dependency cycle through {} phase timeline(s)", .0.len())]
    DependencyCycle(Vec<PhaseTimelineId>),

    /// A timeline depends on itself.
    #[error("phase timeline {0} depends on itself")]
    SelfDependency(PhaseTimelineId),

    /// An edge references a timeline that is not part of the graph.
    #[error("dependency references unknown phase timeline {0}")]
    UnknownTimeline(PhaseTimelineId),
}

/// Convenience alias for graph results.
pub type DagResult<T> = Result<T, DagError>;
