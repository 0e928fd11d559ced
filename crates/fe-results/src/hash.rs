//! Content-based hashing for run IDs.

use sha2::{Digest, Sha256};

use crate::taxonomy::{ResultClassification, SolverBackend};

/// Hash of everything that determines an iteration's output.
///
/// The selection is sorted first so toggle order does not change the id.
pub fn compute_run_id(
    script: &str,
    selection: &[ResultClassification],
    backend: SolverBackend,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(script.as_bytes());

    let mut sorted = selection.to_vec();
    sorted.sort();
    sorted.dedup();
    let selection_json = serde_json::to_string(&sorted).unwrap_or_default();
    hasher.update(selection_json.as_bytes());

    hasher.update(backend.as_str().as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
