//! Runtime settings, independent of the plant configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

pub const DEFAULT_SNAPSHOT_INTERVAL: u64 = 10;
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
pub const DEFAULT_STORE_FLUSH_EVERY: usize = 10;

/// How the runner persists and publishes state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Cycles between snapshot checkpoints; `0` disables periodic
    /// checkpoints (the final one on stop is still written).
    pub snapshot_interval: u64,
    /// Length of the published recent-history list.
    pub history_capacity: usize,
    /// Directory holding `config.yaml` and `snapshot.json`.
    pub local_dir: Option<PathBuf>,
    /// JSON-lines file receiving every cycle's storable parameters.
    pub store_path: Option<PathBuf>,
    pub store_flush_every: usize,
    /// Pace cycles to wall-clock time. Off runs cycles back to back.
    pub realtime: bool,
    /// Stop after this many cycles.
    pub max_cycles: Option<u64>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            local_dir: None,
            store_path: None,
            store_flush_every: DEFAULT_STORE_FLUSH_EVERY,
            realtime: true,
            max_cycles: None,
        }
    }
}

impl RuntimeSettings {
    pub fn load(path: &Path) -> RuntimeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RuntimeError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| RuntimeError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}
