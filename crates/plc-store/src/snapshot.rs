//! Point-in-time parameter snapshots for restart recovery.
//!
//! A snapshot is a checkpoint, not a journal: every save replaces the
//! previous file. A missing or unreadable file means "no snapshot".

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use plc_core::{ParamAddr, ParamMap, ParamValue};
use plc_project::PlcConfig;
use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

/// Default snapshot file name inside a local directory.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Snapshot file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub params: ParamMap,
}

#[derive(Debug, Clone)]
pub struct SnapshotManager {
    path: PathBuf,
}

impl SnapshotManager {
    /// Manager for `path`. JSON unless the extension is `.yaml`/`.yml`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Manager for `<dir>/snapshot.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SNAPSHOT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_yaml(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        )
    }

    /// Replace the snapshot with `params`, stamped with the current time.
    ///
    /// The file is written next to its final location and renamed into
    /// place, so a crash mid-write leaves the previous snapshot intact.
    pub fn save(&self, params: &ParamMap) -> StoreResult<()> {
        let snapshot = Snapshot {
            timestamp: Utc::now(),
            params: params.clone(),
        };
        let content = if self.is_yaml() {
            serde_yaml::to_string(&snapshot)?
        } else {
            serde_json::to_string_pretty(&snapshot)?
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| StoreError::InvalidPath {
                message: format!("snapshot path {} has no file name", self.path.display()),
            })?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), params = params.len(), "snapshot saved");
        Ok(())
    }

    /// Read the full snapshot. Absent or malformed files yield `None`.
    pub fn load_snapshot(&self) -> Option<Snapshot> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no snapshot file");
                return None;
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "snapshot unreadable");
                return None;
            }
        };
        let parsed: Result<Snapshot, String> = if self.is_yaml() {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };
        match parsed {
            Ok(snapshot) => {
                tracing::info!(
                    path = %self.path.display(),
                    timestamp = %snapshot.timestamp,
                    params = snapshot.params.len(),
                    "snapshot loaded"
                );
                Some(snapshot)
            }
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "malformed snapshot ignored");
                None
            }
        }
    }

    /// Parameters of the stored snapshot, if any.
    pub fn load(&self) -> Option<ParamMap> {
        self.load_snapshot().map(|s| s.params)
    }

    /// Delete the snapshot. Clearing an absent snapshot is not an error.
    pub fn clear(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "snapshot cleared");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Overwrite initial parameter values in `config` with snapshot values.
///
/// Only entries addressing an instance that exists in `config` are applied;
/// the rest are ignored. Returns the number of values applied.
pub fn apply_snapshot_to_config(config: &mut PlcConfig, snapshot: &ParamMap) -> usize {
    let mut applied = 0;
    for (key, &value) in snapshot {
        let Ok(addr) = ParamAddr::parse(key) else {
            tracing::debug!(key = %key, "snapshot key is not an address");
            continue;
        };
        match config.instances.get_mut(&addr.instance) {
            Some(def) => {
                def.params.insert(addr.param, ParamValue::Number(value));
                applied += 1;
            }
            None => tracing::debug!(key = %key, "snapshot entry for unknown instance ignored"),
        }
    }
    tracing::info!(applied, total = snapshot.len(), "applied snapshot to configuration");
    applied
}
