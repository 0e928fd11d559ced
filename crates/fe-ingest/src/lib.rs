//! fe-ingest: expected engine artifacts and their ingestion into a result store.
//!
//! The writer side ([`StrategyRegistry::artifacts`]) decides which files a
//! script will make the engine emit; the parser side turns those files into
//! [`fe_results::ResultItem`]s once they appear in the working directory.

pub mod artifacts;
pub mod error;
pub mod lock;
pub mod parse;
pub mod pipeline;
pub mod registry;

pub use artifacts::{
    ArtifactKind, ExpectedOutputSet, MESH_ELEMENTS_ARTIFACT, MESH_NODES_ARTIFACT, MeshRequirement,
    ResultArtifact, representative, result_artifacts,
};
pub use error::{IngestError, IngestResult};
pub use pipeline::{PassSummary, ResultIngestionPipeline};
pub use registry::{FamilyStrategy, StrategyRegistry};
