//! Persisted run data types.

use serde::{Deserialize, Serialize};

use crate::requirements::AnalysisRequirements;
use crate::taxonomy::{ResultClassification, SolverBackend};

pub type RunId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageLevel {
    Warning,
    Error,
}

/// Message reported by the engine log, kept verbatim (whitespace-normalized).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl EngineMessage {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub project_name: String,
    pub timestamp: String,
    pub backend: SolverBackend,
    pub selection: Vec<ResultClassification>,
    pub requirements: AnalysisRequirements,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<EngineMessage>,
    pub item_count: usize,
    pub screenshot_count: usize,
}
