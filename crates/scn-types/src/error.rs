use thiserror::Error;

/// Errors produced by type-level validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("allocation must be in (0, 100], got {0}")]
    AllocationOutOfRange(String),

    #[error("missing date: {0}")]
    MissingDate(String),

    #[error("invalid date range: {start} .. {end} ({reason})")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
        reason: String,
    },

    #[error("negative lag: {0} days")]
    NegativeLag(i32),

    #[error("unknown variant: {0}")]
    UnknownVariant(String),
}
