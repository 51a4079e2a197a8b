//! Merge coordination for the scenario planner.
//!
//! Merging folds a child scenario's changes back into its parent. The diff is
//! three-way against the child's branch snapshot, so only edits made on both
//! sides since branching can conflict. Conflicts are settled by a
//! [`MergeStrategy`](scn_types::MergeStrategy): favor the source, favor the
//! target, or manual per-entry choices.
//!
//! # Key Types
//!
//! - [`MergeCoordinator`] -- validates, locks, diffs, resolves, and commits
//! - [`MergeOptions`] / [`MergeOutcome`] / [`MergePreview`]
//! - [`resolve`] / [`ConflictResolutions`] / [`Resolution`] -- pure conflict resolution
//! - [`MergeLockRegistry`] -- per-target locks with bounded waits

pub mod config;
pub mod coordinator;
pub mod error;
pub mod lock;
pub mod resolver;

pub use config::MergeConfig;
pub use coordinator::{MergeCoordinator, MergeOptions, MergeOutcome, MergePreview};
pub use error::{MergeError, MergeResult};
pub use lock::{MergeLockGuard, MergeLockRegistry};
pub use resolver::{resolve, Choice, ConflictResolutions, Resolution, ResolutionChoice};
