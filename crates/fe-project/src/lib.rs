//! fe-project: project file format, validation and engine overrides.

pub mod migrate;
pub mod schema;
pub mod validate;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_project};

use std::path::Path;

/// Environment variable that overrides `engine.executable`.
pub const ENGINE_EXE_ENV: &str = "FE_ENGINE_EXE";

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ProjectResult<Project> {
    let content = std::fs::read_to_string(path)?;
    let project: Project = serde_yaml::from_str(&content)?;
    finish_load(project)
}

pub fn save_yaml(path: &Path, project: &Project) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_yaml::to_string(project)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<Project> {
    let content = std::fs::read_to_string(path)?;
    let project: Project = serde_json::from_str(&content)?;
    finish_load(project)
}

pub fn save_json(path: &Path, project: &Project) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_json::to_string_pretty(project)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Loads by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &Path) -> ProjectResult<Project> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        _ => load_yaml(path),
    }
}

fn finish_load(project: Project) -> ProjectResult<Project> {
    let mut project = migrate_to_latest(project)?;
    apply_env_overrides(&mut project, |key| std::env::var(key).ok());
    validate_project(&project)?;
    Ok(project)
}

/// Applies environment overrides through `lookup` so callers can supply a
/// fixed environment.
pub fn apply_env_overrides(project: &mut Project, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(exe) = lookup(ENGINE_EXE_ENV)
        && !exe.trim().is_empty()
    {
        tracing::debug!(executable = %exe, "engine executable overridden from environment");
        project.engine.executable = exe.into();
    }
}
