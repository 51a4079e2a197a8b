use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// The scenario planner's HTTP server.
pub struct ScenarioServer {
    config: ServerConfig,
    state: AppState,
}

impl ScenarioServer {
    /// Bootstrap the store described by `config`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = AppState::bootstrap(&config)?;
        Ok(Self { config, state })
    }

    /// Serve an existing state.
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.cors_permissive)
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("scenario server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = ScenarioServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert!(server.state().store.baseline().unwrap().is_some());
    }

    #[test]
    fn router_builds() {
        let server = ScenarioServer::new(ServerConfig {
            cors_permissive: true,
            ..ServerConfig::default()
        })
        .unwrap();
        let _router = server.router();
    }
}
