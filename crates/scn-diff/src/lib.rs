//! Diff engine for the scenario planner.
//!
//! Computes row-level differences between scenarios, keyed by natural key
//! so rows are matched across scenarios even though their ids differ.
//!
//! # Key Types
//!
//! - [`DiffSet`] / [`DiffEntry`] / [`Change`] -- ordered, tagged per-class differences
//! - [`DiffEngine`] -- three-way diff of a child against its parent, using the
//!   branch snapshot as common ancestor
//! - [`ComparisonService`] / [`ComparisonResult`] -- two-way comparison of any
//!   two scenarios with impact metrics

pub mod compare;
mod describe;
pub mod engine;
pub mod entry;
pub mod error;

pub use compare::{ComparisonMetrics, ComparisonResult, ComparisonService};
pub use engine::{classify, diff_snapshots, DiffEngine};
pub use entry::{Change, ChangeKind, ClassCounts, DiffEntry, DiffSet, EntityClass, EntryKey};
pub use error::{DiffError, DiffResult};
