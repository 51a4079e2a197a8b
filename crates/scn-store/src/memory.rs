//! In-memory scenario store for tests and single-process deployments.
//!
//! [`InMemoryScenarioStore`] keeps a [`StoreState`] behind a `RwLock`. Reads
//! clone what they need under the read lock. Writes stage on a copy of the
//! state under the write lock and swap it in only after validation, so a
//! failed change set leaves no trace.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use scn_types::{
    Catalog, CatalogEntry, MergeRecord, NewScenario, Scenario, ScenarioId, ScenarioSnapshot,
};

use crate::changes::{ChangeSet, CommitReceipt};
use crate::error::{StoreError, StoreResult};
use crate::state::StoreState;
use crate::traits::ScenarioStore;

/// An in-memory implementation of [`ScenarioStore`].
#[derive(Debug, Default)]
pub struct InMemoryScenarioStore {
    state: RwLock<StoreState>,
}

impl InMemoryScenarioStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a pre-populated catalog.
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            state: RwLock::new(StoreState::with_catalog(catalog)),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl ScenarioStore for InMemoryScenarioStore {
    fn catalog(&self) -> StoreResult<Catalog> {
        Ok(self.read()?.catalog().clone())
    }

    fn register(&self, entry: CatalogEntry) -> StoreResult<()> {
        self.write()?.register(entry)
    }

    fn create_scenario(&self, request: NewScenario) -> StoreResult<Scenario> {
        self.write()?.create(request)
    }

    fn scenario(&self, id: &ScenarioId) -> StoreResult<Option<Scenario>> {
        Ok(self.read()?.scenario(id).cloned())
    }

    fn list_scenarios(&self) -> StoreResult<Vec<Scenario>> {
        Ok(self.read()?.list())
    }

    fn delete_scenario(&self, id: &ScenarioId) -> StoreResult<Scenario> {
        self.write()?.delete(id)
    }

    fn snapshot(&self, id: &ScenarioId) -> StoreResult<ScenarioSnapshot> {
        Ok(self.read()?.rows(id)?.snapshot())
    }

    fn snapshot_many(&self, ids: &[ScenarioId]) -> StoreResult<Vec<ScenarioSnapshot>> {
        let state = self.read()?;
        ids.iter()
            .map(|id| state.rows(id).map(|rows| rows.snapshot()))
            .collect()
    }

    fn branch_snapshot(&self, id: &ScenarioId) -> StoreResult<Option<ScenarioSnapshot>> {
        self.read()?.branch_snapshot(id)
    }

    fn apply(&self, changes: ChangeSet) -> StoreResult<CommitReceipt> {
        let mut state = self.write()?;
        let mut staged = state.clone();
        match staged.apply(changes) {
            Ok(receipt) => {
                *state = staged;
                Ok(receipt)
            }
            Err(e) => {
                debug!(error = %e, "change set rejected; nothing written");
                Err(e)
            }
        }
    }

    fn merge_records(&self, id: &ScenarioId) -> StoreResult<Vec<MergeRecord>> {
        Ok(self.read()?.merge_records(id))
    }
}
