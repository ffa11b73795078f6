//! Error types for the runtime layer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the engine, the runner and message parsing.
///
/// Only configuration and startup problems reach the caller; per-cycle
/// failures are logged and swallowed by the engine.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Project(#[from] plc_project::ProjectError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] plc_project::ValidationError),

    #[error("Execution order error: {0}")]
    Graph(#[from] plc_graph::GraphError),

    #[error("Storage error: {0}")]
    Store(#[from] plc_store::StoreError),

    #[error(transparent)]
    Core(#[from] plc_core::CoreError),

    #[error("Unknown instance: {name}")]
    UnknownInstance { name: String },

    #[error("Malformed message: {message}")]
    InvalidMessage { message: String },

    #[error("Failed to read settings file: {}", .path.display())]
    SettingsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings file {}: {source}", .path.display())]
    SettingsParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Runner thread failed: {what}")]
    Thread { what: &'static str },

    #[error("Could not install interrupt handler: {message}")]
    Interrupt { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl From<serde_json::Error> for RuntimeError {
    fn from(e: serde_json::Error) -> Self {
        RuntimeError::InvalidMessage {
            message: e.to_string(),
        }
    }
}
