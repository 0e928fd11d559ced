//! Parsers for the listings the engine writes.
//!
//! Every parser works on an [`Artifact`]: the file's name, path and text.
//! Failures carry the file name, path and offending line.

pub mod delimited;
pub mod eigen;
pub mod fixed_width;
pub mod mesh;
pub mod section;

use crate::error::IngestError;
use fe_core::EngineId;
use fe_results::ResultsError;
use std::path::Path;

/// One listing read from the working directory.
#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    pub name: &'a str,
    pub path: &'a Path,
    pub text: &'a str,
}

impl<'a> Artifact<'a> {
    pub fn new(name: &'a str, path: &'a Path, text: &'a str) -> Self {
        Self { name, path, text }
    }

    /// Lines with 1-based numbers.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        self.text.lines().enumerate().map(|(idx, line)| (idx + 1, line))
    }

    pub fn error(&self, line: usize, context: impl Into<String>) -> IngestError {
        IngestError::Parse {
            file: self.name.to_string(),
            path: self.path.to_path_buf(),
            line,
            context: context.into(),
        }
    }

    pub fn mesh_error(&self, err: ResultsError) -> IngestError {
        IngestError::from_mesh(self.name, err)
    }

    pub fn number(&self, line: usize, raw: &str, what: &str) -> Result<f64, IngestError> {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| self.error(line, format!("{what}: {:?} is not a number", raw.trim())))
    }

    pub fn id(&self, line: usize, raw: &str, what: &str) -> Result<EngineId, IngestError> {
        raw.parse::<EngineId>()
            .map_err(|e| self.error(line, format!("{what}: {e}")))
    }
}
