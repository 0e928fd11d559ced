//! fe-results: result taxonomy, analysis requirements, mesh and run storage.

pub mod hash;
pub mod mesh;
pub mod requirements;
pub mod run_store;
pub mod store;
pub mod taxonomy;
pub mod types;
pub mod values;

pub use hash::compute_run_id;
pub use mesh::{ElementEnd, Mesh, MeshBeamElement, MeshNode, SectionNode};
pub use requirements::{AnalysisRequirements, recompute};
pub use run_store::RunStore;
pub use store::{ResultItem, ResultLocation, ResultStore, ScreenShot};
pub use taxonomy::*;
pub use types::*;
pub use values::*;

use fe_core::{ElementId, MeshNodeId};

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },

    #[error("Mesh node {id} was not listed by the engine")]
    MissingMeshNode { id: MeshNodeId },

    #[error("Beam element {id} was not listed by the engine")]
    MissingElement { id: ElementId },

    #[error("Node {node} does not belong to element {element}")]
    NodeNotOnElement {
        element: ElementId,
        node: MeshNodeId,
    },
}
