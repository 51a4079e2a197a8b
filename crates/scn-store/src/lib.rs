//! Storage layer for the scenario planner.
//!
//! A [`ScenarioStore`] owns scenarios, their scoped rows, the immutable
//! branch snapshots used as common ancestors in merges, and the append-only
//! merge audit log. All row writes go through [`ChangeSet`]s, which commit
//! atomically and can carry optimistic revision checks.
//!
//! # Backends
//!
//! - [`InMemoryScenarioStore`] -- `RwLock`-guarded [`StoreState`] with
//!   stage-validate-swap writes.

pub mod changes;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fixture;
pub mod memory;
pub mod state;
pub mod traits;

pub use changes::{ChangeSet, CommitReceipt, WriteOp};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryScenarioStore;
pub use state::{ScopedRows, StoreState};
pub use traits::ScenarioStore;
