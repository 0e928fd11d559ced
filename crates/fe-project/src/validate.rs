//! Project validation logic.

use crate::migrate::LATEST_VERSION;
use crate::schema::{AnalysisOptions, EngineConfig, Project};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate entry: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    validate_engine(&project.engine)?;
    validate_analysis(&project.analysis)?;

    let mut seen = HashSet::new();
    for def in &project.results {
        let classification = def.classification();
        if !seen.insert(classification) {
            return Err(ValidationError::DuplicateId {
                id: classification.to_string(),
                context: "results".to_string(),
            });
        }
        if !project.engine.backend.supports(classification) {
            return Err(ValidationError::Unsupported {
                feature: classification.to_string(),
                reason: format!(
                    "not produced by the {} backend",
                    project.engine.backend.as_str()
                ),
            });
        }
    }

    let mut directions = HashSet::new();
    for dir in &project.screenshots.directions {
        if !directions.insert(dir) {
            return Err(ValidationError::DuplicateId {
                id: dir.as_str().to_string(),
                context: "screenshots.directions".to_string(),
            });
        }
    }

    Ok(())
}

fn validate_engine(engine: &EngineConfig) -> Result<(), ValidationError> {
    if engine.executable.as_os_str().is_empty() {
        return Err(invalid("engine.executable", "", "must not be empty"));
    }
    if engine.work_dir.as_os_str().is_empty() {
        return Err(invalid("engine.work_dir", "", "must not be empty"));
    }
    if engine.job_name.trim().is_empty() || engine.job_name.contains(char::is_whitespace) {
        return Err(invalid(
            "engine.job_name",
            &engine.job_name,
            "must be a single non-empty word",
        ));
    }
    if engine.poll_interval_ms == 0 {
        return Err(invalid("engine.poll_interval_ms", "0", "must be positive"));
    }
    if engine.cleanup_attempts == 0 {
        return Err(invalid("engine.cleanup_attempts", "0", "must be positive"));
    }
    if engine.finish_delete_attempts == 0 {
        return Err(invalid(
            "engine.finish_delete_attempts",
            "0",
            "must be positive",
        ));
    }
    if engine.reset_budget_ms == 0 {
        return Err(invalid("engine.reset_budget_ms", "0", "must be positive"));
    }
    Ok(())
}

fn validate_analysis(analysis: &AnalysisOptions) -> Result<(), ValidationError> {
    if analysis.eigenvalue_buckling_modes == 0 {
        return Err(invalid(
            "analysis.eigenvalue_buckling_modes",
            "0",
            "at least one mode must be extracted",
        ));
    }
    if analysis.imperfect_mode == 0 || analysis.imperfect_mode > analysis.eigenvalue_buckling_modes
    {
        return Err(invalid(
            "analysis.imperfect_mode",
            &analysis.imperfect_mode.to_string(),
            &format!(
                "must be within 1..={}",
                analysis.eigenvalue_buckling_modes
            ),
        ));
    }
    if !analysis.imperfect_multiplier.is_finite() {
        return Err(invalid(
            "analysis.imperfect_multiplier",
            &analysis.imperfect_multiplier.to_string(),
            "must be finite",
        ));
    }
    if analysis.elements_per_frame == 0 {
        return Err(invalid(
            "analysis.elements_per_frame",
            "0",
            "must be positive",
        ));
    }
    Ok(())
}

fn invalid(field: &str, value: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
