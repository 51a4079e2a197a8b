use scn_dag::DagError;
use scn_types::{ScenarioId, ScenarioStatus, TypeError};

/// Errors from scenario store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The scenario does not exist.
    #[error("scenario not found: {0}")]
    ScenarioNotFound(ScenarioId),

    /// A scoped row addressed by key or id does not exist.
    #[error("row not found in scenario {scenario}: {row}")]
    RowNotFound { scenario: ScenarioId, row: String },

    /// Input rejected before anything was written: bad field values,
    /// missing references, dependency cycles.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The scenario is merged or archived and its rows can no longer change.
    #[error("scenario {id} is {status} and cannot be modified")]
    NotWritable { id: ScenarioId, status: ScenarioStatus },

    /// The scenario cannot be deleted or archived.
    #[error("cannot remove scenario {id}: {reason}")]
    CannotRemove { id: ScenarioId, reason: String },

    /// A scenario changed since the snapshot a change set was built from.
    #[error("scenario {scenario} moved from revision {expected} to {actual}")]
    StaleSnapshot {
        scenario: ScenarioId,
        expected: u64,
        actual: u64,
    },

    /// Stored data violates a structural invariant. Indicates a bug in an
    /// earlier write path.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// The backend's lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Returns `true` for errors caused by the caller's input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotWritable { .. } | Self::CannotRemove { .. }
        )
    }
}

impl From<TypeError> for StoreError {
    fn from(e: TypeError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<DagError> for StoreError {
    fn from(e: DagError) -> Self {
        match e {
            DagError::DependencyCycle(_)
            | DagError::SelfDependency(_)
            | DagError::UnknownTimeline(_) => Self::Validation(e.to_string()),
            DagError::CycleDetected(_)
            | DagError::DanglingParent { .. }
            | DagError::DuplicateNode(_) => Self::Consistency(e.to_string()),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
