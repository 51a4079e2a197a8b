//! Error types for merges.

use scn_diff::{DiffEntry, DiffError};
use scn_store::StoreError;
use scn_types::{ScenarioId, ScenarioStatus};

/// Errors that can occur while merging a scenario into its parent.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    #[error("scenario not found: {0}")]
    NotFound(ScenarioId),

    /// The scenario cannot be merged at all.
    #[error("scenario {scenario} cannot be merged: {reason}")]
    InvalidMergeSource {
        scenario: ScenarioId,
        status: ScenarioStatus,
        reason: String,
    },

    /// A manual merge left conflicts without a resolution. Nothing was written.
    #[error("{} conflict(s) need a resolution", .conflicts.len())]
    ConflictsPending { conflicts: Vec<DiffEntry> },

    /// Another merge into the same target held the lock past the wait budget.
    #[error("a merge into {target} is already in progress")]
    MergeInProgress { target: ScenarioId },

    /// The request or the merged result is invalid. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Source or target changed between reading and committing.
    #[error("scenario {scenario} changed during the merge; retry")]
    StaleSnapshot { scenario: ScenarioId },

    /// Stored data violates an invariant.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// Unexpected storage failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl MergeError {
    /// Stable machine-readable reason, used as the `error` field of API
    /// responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidMergeSource { .. } => "invalid_merge_source",
            Self::ConflictsPending { .. } => "conflicts_pending",
            Self::MergeInProgress { .. } => "merge_in_progress",
            Self::Validation(_) => "validation",
            Self::StaleSnapshot { .. } => "stale_snapshot",
            Self::Consistency(_) => "consistency",
            Self::Store(_) => "store",
        }
    }

    /// Returns `true` if the same request may succeed when retried as is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::MergeInProgress { .. } | Self::StaleSnapshot { .. })
    }
}

impl From<StoreError> for MergeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ScenarioNotFound(id) => Self::NotFound(id),
            StoreError::StaleSnapshot { scenario, .. } => Self::StaleSnapshot { scenario },
            StoreError::Consistency(msg) => Self::Consistency(msg),
            StoreError::LockPoisoned(_) => Self::Store(e),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<DiffError> for MergeError {
    fn from(e: DiffError) -> Self {
        match e {
            DiffError::Store(e) => e.into(),
            DiffError::Consistency(msg) => Self::Consistency(msg),
            DiffError::NotParent { .. } => Self::Consistency(e.to_string()),
        }
    }
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
