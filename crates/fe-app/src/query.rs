//! Query helpers for extracting data from result stores.

use fe_results::{
    AnalysisShape, EigenvalueBucklingSummary, MessageLevel, ResultLocation, ResultStore,
    ResultType, ResultValue, RunManifest,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Counts of a run's mesh and results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub item_count: usize,
    pub screenshot_count: usize,
    pub node_count: usize,
    pub element_count: usize,
    pub section_node_count: usize,
    pub warning_count: usize,
}

pub fn get_run_summary(manifest: &RunManifest, store: &ResultStore) -> RunSummary {
    RunSummary {
        run_id: manifest.run_id.clone(),
        item_count: store.len(),
        screenshot_count: store.screenshots().len(),
        node_count: store.mesh.node_count(),
        element_count: store.mesh.element_count(),
        section_node_count: store.mesh.section_node_count(),
        warning_count: manifest
            .messages
            .iter()
            .filter(|m| m.level == MessageLevel::Warning)
            .count(),
    }
}

/// Values of one result quantity; fails when the run has none.
pub fn extract_values(
    store: &ResultStore,
    result_type: ResultType,
    shape: AnalysisShape,
) -> AppResult<Vec<(ResultLocation, f64)>> {
    let values = store.values_of(result_type, shape);
    if values.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "No {result_type} values for {shape} in this run"
        )));
    }
    Ok(values)
}

/// Location and value with the largest magnitude.
pub fn extreme_value(
    store: &ResultStore,
    result_type: ResultType,
    shape: AnalysisShape,
) -> AppResult<(ResultLocation, f64)> {
    extract_values(store, result_type, shape)?
        .into_iter()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .ok_or_else(|| AppError::InvalidInput(format!("No {result_type} values for {shape}")))
}

/// The eigenvalue-buckling summary computed for `shape`, if any.
pub fn buckling_summary(store: &ResultStore, shape: AnalysisShape) -> Option<&EigenvalueBucklingSummary> {
    store.items().iter().find_map(|item| match &item.value {
        ResultValue::EigenvalueBucklingSummary(summary) if item.classification.shape == shape => {
            Some(summary)
        }
        _ => None,
    })
}
