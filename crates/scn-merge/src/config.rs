use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Merge coordinator settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// How long a merge waits for another merge into the same target before
    /// giving up with `MergeInProgress`.
    pub lock_timeout_ms: u64,
}

impl MergeConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2_000,
        }
    }
}
