//! Schema migration framework.

use crate::ProjectError;
use crate::schema::Project;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut project: Project) -> Result<Project, ProjectError> {
    while project.version < LATEST_VERSION {
        project = migrate_one_version(project)?;
    }
    Ok(project)
}

fn migrate_one_version(project: Project) -> Result<Project, ProjectError> {
    match project.version {
        0 => migrate_v0_to_v1(project),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 files listed every classification of a family even when the
/// backend could not produce it; unsupported entries are dropped.
fn migrate_v0_to_v1(mut project: Project) -> Result<Project, ProjectError> {
    let backend = project.engine.backend;
    let before = project.results.len();
    project
        .results
        .retain(|def| backend.supports(def.classification()));
    let dropped = before - project.results.len();
    if dropped > 0 {
        tracing::warn!(dropped, backend = backend.as_str(), "dropped unsupported result selections");
    }
    project.version = 1;
    Ok(project)
}
