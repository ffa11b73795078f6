//! plc-project: plant configuration format, validation and editing.

pub mod diff;
pub mod edit;
pub mod migrate;
pub mod schema;
pub mod topology;
pub mod validate;

use std::path::{Path, PathBuf};

pub use diff::{ConfigDiff, DiffSummary, InstancePatch, ModifiedInstance};
pub use edit::PLACEHOLDER_TYPE;
pub use schema::*;
pub use validate::{ValidationError, validate_config};

/// File name of the persisted configuration inside a local directory.
pub const LOCAL_CONFIG_FILE: &str = "config.yaml";

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution order error: {0}")]
    Graph(#[from] plc_graph::GraphError),

    #[error("Unsupported configuration format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ProjectResult<PlcConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: PlcConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_yaml(path: &Path, config: &PlcConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<PlcConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: PlcConfig = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_json(path: &Path, config: &PlcConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

enum Format {
    Yaml,
    Json,
}

fn format_of(path: &Path) -> ProjectResult<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => Ok(Format::Yaml),
        Some("json") => Ok(Format::Json),
        _ => Err(ProjectError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Load YAML or JSON, chosen by file extension.
pub fn load(path: &Path) -> ProjectResult<PlcConfig> {
    match format_of(path)? {
        Format::Yaml => load_yaml(path),
        Format::Json => load_json(path),
    }
}

/// Save YAML or JSON, chosen by file extension.
pub fn save(path: &Path, config: &PlcConfig) -> ProjectResult<()> {
    match format_of(path)? {
        Format::Yaml => save_yaml(path, config),
        Format::Json => save_json(path, config),
    }
}

/// Persist `config` as `<dir>/config.yaml`, creating `dir` if needed.
pub fn save_to_local(dir: &Path, config: &PlcConfig) -> ProjectResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(LOCAL_CONFIG_FILE);
    save_yaml(&path, config)?;
    tracing::info!(path = %path.display(), "configuration saved to local directory");
    Ok(path)
}

/// Load `<dir>/config.yaml`. A missing file is `Ok(None)`.
pub fn load_from_local(dir: &Path) -> ProjectResult<Option<PlcConfig>> {
    let path = dir.join(LOCAL_CONFIG_FILE);
    if !path.exists() {
        tracing::warn!(path = %path.display(), "local configuration not found");
        return Ok(None);
    }
    let config = load_yaml(&path)?;
    tracing::info!(path = %path.display(), "configuration loaded from local directory");
    Ok(Some(config))
}
