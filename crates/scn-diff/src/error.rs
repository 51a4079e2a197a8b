//! Error types for the diff crate.

use scn_types::ScenarioId;

/// Errors that can occur during diff operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiffError {
    /// A merge diff was requested against a scenario that is not the
    /// source's parent.
    #[error("scenario {child} is not a child of {target}")]
    NotParent {
        child: ScenarioId,
        target: ScenarioId,
    },

    /// Stored data is missing something every branch must have.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] scn_store::StoreError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
