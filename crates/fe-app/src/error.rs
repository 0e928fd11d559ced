//! Error types for the fe-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// provides one error interface for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Project validation failed: {0}")]
    Validation(String),

    #[error("Unsupported result: {message}")]
    Unsupported { message: String },

    /// Setup, engine and protocol faults of an iteration.
    #[error("Engine error: {0}")]
    Engine(#[from] fe_engine::EngineError),

    #[error("Ingestion error: {0}")]
    Ingest(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fe-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Engine fault whose log says the solution diverged.
    pub fn is_not_converged(&self) -> bool {
        matches!(self, AppError::Engine(err) if err.is_not_converged())
    }
}

impl From<fe_project::ProjectError> for AppError {
    fn from(err: fe_project::ProjectError) -> Self {
        match err {
            fe_project::ProjectError::Validation(err) => AppError::Validation(err.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<fe_project::ValidationError> for AppError {
    fn from(err: fe_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<fe_ingest::IngestError> for AppError {
    fn from(err: fe_ingest::IngestError) -> Self {
        AppError::Ingest(err.to_string())
    }
}

impl From<fe_results::ResultsError> for AppError {
    fn from(err: fe_results::ResultsError) -> Self {
        match err {
            fe_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
