//! plc-store: crash-recovery snapshots, live state publication and cycle
//! history storage.

pub mod history;
pub mod publish;
pub mod snapshot;

pub use history::{
    CycleRecord, CycleStore, HistoryPoint, HistoryQuery, JsonlCycleStore, MemoryCycleStore,
};
pub use publish::{MemoryPublisher, Publisher, StateFrame};
pub use snapshot::{SNAPSHOT_FILE, Snapshot, SnapshotManager, apply_snapshot_to_config};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },
}
