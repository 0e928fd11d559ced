//! Shared application service layer for femflow.
//!
//! Drives analysis iterations against an engine backend, keeps the result
//! selection and its analysis requirements in step, and exposes project and
//! run queries to the CLI.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod protocol;
pub mod query;
pub mod run_service;
pub mod selection;

pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, ScriptProgress};
pub use project_service::{
    CatalogEntry, StageSummary, analysis_stages, apply_selection, catalog_entries, load_project,
    save_project, validate_project,
};
pub use protocol::{
    IterationInput, IterationOutcome, IterationProtocol, ProgressSink, RunTimingSummary,
};
pub use query::{RunSummary, buckling_summary, extract_values, extreme_value, get_run_summary};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, list_runs, load_run, open_backend, run_iteration,
    run_iteration_with_progress,
};
pub use selection::Selection;
