use fe_results::AnalysisShape;

/// Protocol stage of one iteration, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    EnsureEngine,
    Reset,
    BuildScript,
    WriteScript,
    SignalStart,
    AwaitCompletion,
    Ingest,
    Saving,
    Completed,
}

impl RunStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStage::EnsureEngine => "ensure-engine",
            RunStage::Reset => "reset",
            RunStage::BuildScript => "build-script",
            RunStage::WriteScript => "write-script",
            RunStage::SignalStart => "signal-start",
            RunStage::AwaitCompletion => "await-completion",
            RunStage::Ingest => "ingest",
            RunStage::Saving => "saving",
            RunStage::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptProgress {
    pub expected_artifacts: usize,
    pub script_bytes: usize,
    pub shapes: Vec<AnalysisShape>,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub script: Option<ScriptProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            script: None,
        }
    }
}
