//! HTTP server for the scenario planner.
//!
//! Exposes scenarios, their scoped planning rows, merges into parents, and
//! read-only comparisons as a JSON REST API over an in-memory store.

pub mod config;
pub mod error;
pub mod extract;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use extract::{ApiJson, ApiQuery};
pub use router::build_router;
pub use server::ScenarioServer;
pub use state::AppState;
