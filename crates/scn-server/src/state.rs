use std::sync::Arc;

use tracing::info;

use scn_diff::ComparisonService;
use scn_merge::{MergeConfig, MergeCoordinator};
use scn_store::{InMemoryScenarioStore, ScenarioStore};
use scn_types::{Catalog, NewScenario};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Shared handler state. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ScenarioStore>,
    pub merges: Arc<MergeCoordinator>,
    pub comparisons: Arc<ComparisonService>,
}

impl AppState {
    pub fn new(store: Arc<dyn ScenarioStore>, merge: MergeConfig) -> Self {
        Self {
            merges: Arc::new(MergeCoordinator::new(store.clone(), merge)),
            comparisons: Arc::new(ComparisonService::new(store.clone())),
            store,
        }
    }

    /// In-memory store seeded from the configured catalog, with a baseline.
    pub fn bootstrap(config: &ServerConfig) -> ServerResult<Self> {
        let catalog = Catalog::from_seed(config.load_catalog()?);
        info!(
            projects = catalog.projects.len(),
            people = catalog.people.len(),
            "catalog loaded"
        );
        let store = Arc::new(InMemoryScenarioStore::with_catalog(catalog));
        let baseline = store.create_scenario(NewScenario::baseline(config.baseline_name.clone()))?;
        info!(baseline = %baseline.id, name = %baseline.name, "baseline created");
        Ok(Self::new(store, config.merge.clone()))
    }
}

/// Run a synchronous store call off the async executor.
pub async fn blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("blocking task failed: {e}")))?
}
