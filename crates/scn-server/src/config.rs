use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use scn_merge::MergeConfig;
use scn_types::CatalogSeed;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// TOML file with `[[projects]]`, `[[people]]`, `[[roles]]`, `[[phases]]`.
    pub catalog_path: Option<PathBuf>,
    /// Name of the baseline scenario created at startup.
    pub baseline_name: String,
    /// Answer CORS preflights from any origin.
    pub cors_permissive: bool,
    pub merge: MergeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            catalog_path: None,
            baseline_name: "Baseline".into(),
            cors_permissive: false,
            merge: MergeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    /// The catalog seed named by `catalog_path`, or an empty seed.
    pub fn load_catalog(&self) -> ServerResult<CatalogSeed> {
        let Some(path) = &self.catalog_path else {
            return Ok(CatalogSeed::default());
        };
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }
}
