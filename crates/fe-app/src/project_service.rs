//! Project loading, saving, validation, and introspection.

use std::path::Path;

use fe_project::Project;
use fe_results::{AnalysisShape, ResultClassification, SolverBackend, supported_catalog};

use crate::error::{AppError, AppResult};
use crate::selection::Selection;

/// Analyses one shape contributes to the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub shape: AnalysisShape,
    pub static_analysis: bool,
    pub eigenvalue_buckling: bool,
    pub requested: usize,
}

/// One catalog row for listing.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub classification: ResultClassification,
    pub output_stem: String,
    pub screenshot_stem: String,
    pub default_selected: bool,
}

/// Load a project file (YAML, or JSON by extension), apply environment
/// overrides and validate it.
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(fe_project::load(path)?)
}

/// Save project to a YAML file.
pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    fe_project::save_yaml(path, project)?;
    Ok(())
}

pub fn validate_project(project: &Project) -> AppResult<()> {
    fe_project::validate_project(project)?;
    Ok(())
}

/// Store `selection` as the project's result list.
pub fn apply_selection(project: &mut Project, selection: &Selection) -> AppResult<()> {
    if selection.backend() != project.engine.backend {
        return Err(AppError::InvalidInput(format!(
            "selection was made for {} but the project uses {}",
            selection.backend().as_str(),
            project.engine.backend.as_str()
        )));
    }
    project.results = selection.to_defs();
    Ok(())
}

/// Per-shape view of the current requirements.
pub fn analysis_stages(selection: &Selection) -> Vec<StageSummary> {
    let requirements = selection.requirements();
    AnalysisShape::ALL
        .into_iter()
        .map(|shape| StageSummary {
            shape,
            static_analysis: requirements.static_required(shape),
            eigenvalue_buckling: requirements.eigenvalue_buckling_required(shape),
            requested: selection.requested(shape).len(),
        })
        .collect()
}

pub fn catalog_entries(backend: SolverBackend) -> Vec<CatalogEntry> {
    supported_catalog(backend)
        .into_iter()
        .map(|classification| CatalogEntry {
            classification,
            output_stem: classification.output_stem(),
            screenshot_stem: classification.screenshot_stem(),
            default_selected: classification.is_default_selected(),
        })
        .collect()
}
