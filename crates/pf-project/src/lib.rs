//! pf-project: project description format, validation and engine configuration.
//!
//! File I/O happens only in the `load_*` / `save_*` helpers here; the engine
//! itself works on in-memory values.

pub mod config;
pub mod schema;
pub mod validate;

pub use config::{EngineConfig, RejectedOverride};
pub use schema::*;
pub use validate::{ValidationError, validate_project};

use std::path::Path;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_yaml(content: &str) -> ProjectResult<Project> {
    let project: Project = serde_yaml::from_str(content)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn parse_json(content: &str) -> ProjectResult<Project> {
    let project: Project = serde_json::from_str(content)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn load_yaml(path: &Path) -> ProjectResult<Project> {
    parse_yaml(&std::fs::read_to_string(path)?)
}

pub fn load_json(path: &Path) -> ProjectResult<Project> {
    parse_json(&std::fs::read_to_string(path)?)
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &Path) -> ProjectResult<Project> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}

pub fn save_yaml(path: &Path, project: &Project) -> ProjectResult<()> {
    validate_project(project)?;
    std::fs::write(path, serde_yaml::to_string(project)?)?;
    Ok(())
}

pub fn save_json(path: &Path, project: &Project) -> ProjectResult<()> {
    validate_project(project)?;
    std::fs::write(path, serde_json::to_string_pretty(project)?)?;
    Ok(())
}

/// Load a calibration file replacing the built-in engine configuration.
pub fn load_config_yaml(path: &Path) -> ProjectResult<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}
