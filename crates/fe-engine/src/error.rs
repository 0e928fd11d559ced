use fe_core::FeError;
use fe_ingest::IngestError;
use std::path::PathBuf;
use std::time::Duration;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Could not clean up the engine work directory {path} after {attempts} attempts: {source}")]
    CleanupExhausted {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not reset the engine work directory {path}; retried for {waited:?}: {source}")]
    ResetExhausted {
        path: PathBuf,
        waited: Duration,
        #[source]
        source: std::io::Error,
    },

    #[error("The engine work directory {path} does not exist")]
    WorkDirMissing { path: PathBuf },

    #[error("The engine did not signal readiness in {path} within {waited:?}")]
    ReadinessTimeout { path: PathBuf, waited: Duration },

    #[error("Engine fault: {message}")]
    EngineFault { message: String, not_converged: bool },

    #[error("Could not launch the engine ({command}): {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not send signal {path}: {source}")]
    Signal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Process table error: {message}")]
    Process { message: String },

    #[error("The engine is not running")]
    NotRunning,

    #[error("Script generation failed: {0}")]
    Script(#[from] std::fmt::Error),

    #[error("Invalid log pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Core(#[from] FeError),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for engine faults whose log reports a diverged solution.
    pub fn is_not_converged(&self) -> bool {
        matches!(
            self,
            EngineError::EngineFault {
                not_converged: true,
                ..
            }
        )
    }
}
