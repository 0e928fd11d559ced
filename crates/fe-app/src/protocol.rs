//! One analysis iteration against an engine backend.
//!
//! `EnsureEngine -> Reset -> BuildScript -> WriteScript -> SignalStart ->
//! AwaitCompletion -> Ingest`. Any failure aborts the iteration and no
//! partial store is handed back.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use fe_core::{Clock, PollPolicy, SystemClock};
use serde::{Deserialize, Serialize};
use fe_engine::{EngineBackend, EngineError, ScriptBuilder, ScriptTemplater, SkeletonTemplater};
use fe_ingest::{ResultIngestionPipeline, StrategyRegistry};
use fe_project::AnalysisOptions;
use fe_results::{
    AnalysisRequirements, AnalysisShape, EngineMessage, ResultClassification, ResultStore,
    ViewDirection,
};

use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage, ScriptProgress};
use crate::selection::Selection;

/// Wall-clock seconds spent in each stage of one iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunTimingSummary {
    pub engine_start_s: f64,
    pub reset_s: f64,
    pub build_s: f64,
    pub write_s: f64,
    pub solve_s: f64,
    pub ingest_s: f64,
    pub save_s: f64,
    pub total_s: f64,
}

/// Inputs of one iteration.
pub struct IterationInput<'a> {
    pub selection: &'a Selection,
    pub analysis: &'a AnalysisOptions,
    pub directions: &'a [ViewDirection],
}

/// What a successful iteration produced.
#[derive(Debug)]
pub struct IterationOutcome {
    pub script: String,
    pub selection: Vec<ResultClassification>,
    pub requirements: AnalysisRequirements,
    pub store: ResultStore,
    /// Artifact names in the order they were ingested.
    pub consumed: Vec<String>,
    pub messages: Vec<EngineMessage>,
    pub timing: RunTimingSummary,
}

/// Optional progress callback.
pub type ProgressSink<'a> = Option<&'a mut dyn FnMut(RunProgressEvent)>;

pub(crate) fn emit_progress(
    progress_cb: &mut ProgressSink<'_>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    script: Option<ScriptProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            script,
        });
    }
}

pub struct IterationProtocol {
    registry: StrategyRegistry,
    templater: Box<dyn ScriptTemplater>,
    clock: Rc<dyn Clock>,
    poll: PollPolicy,
}

impl Default for IterationProtocol {
    fn default() -> Self {
        Self::new(Box::new(SkeletonTemplater::default()))
    }
}

impl IterationProtocol {
    pub fn new(templater: Box<dyn ScriptTemplater>) -> Self {
        Self {
            registry: StrategyRegistry::ansys(),
            templater,
            clock: Rc::new(SystemClock),
            poll: PollPolicy::default(),
        }
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Polling used while waiting for artifacts.
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn run(
        &self,
        backend: &mut dyn EngineBackend,
        input: &IterationInput<'_>,
    ) -> AppResult<IterationOutcome> {
        self.run_with_progress(backend, input, None)
    }

    pub fn run_with_progress(
        &self,
        backend: &mut dyn EngineBackend,
        input: &IterationInput<'_>,
        mut progress_cb: ProgressSink<'_>,
    ) -> AppResult<IterationOutcome> {
        self.run_reporting(backend, input, &mut progress_cb)
    }

    pub(crate) fn run_reporting(
        &self,
        backend: &mut dyn EngineBackend,
        input: &IterationInput<'_>,
        progress_cb: &mut ProgressSink<'_>,
    ) -> AppResult<IterationOutcome> {
        let started = Instant::now();
        let outcome = self.execute(backend, input, progress_cb, started);
        if outcome.is_err() {
            let dropped = backend.take_warnings();
            if !dropped.is_empty() {
                tracing::debug!(warnings = dropped.len(), "warnings of the failed iteration discarded");
            }
        }
        outcome
    }

    fn execute(
        &self,
        backend: &mut dyn EngineBackend,
        input: &IterationInput<'_>,
        progress_cb: &mut ProgressSink<'_>,
        started: Instant,
    ) -> AppResult<IterationOutcome> {
        let mut timing = RunTimingSummary::default();
        let selection = input.selection.classifications();
        let requirements = *input.selection.requirements();

        if let Some(unsupported) = selection
            .iter()
            .find(|c| !backend.backend().supports(**c))
        {
            return Err(AppError::Unsupported {
                message: format!(
                    "{unsupported} is not produced by the {} backend",
                    backend.backend().as_str()
                ),
            });
        }

        emit_progress(progress_cb, RunStage::EnsureEngine, started, Some("Starting engine".to_string()), None);
        let stage = Instant::now();
        backend.ensure_started()?;
        timing.engine_start_s = stage.elapsed().as_secs_f64();

        emit_progress(progress_cb, RunStage::Reset, started, None, None);
        let stage = Instant::now();
        backend.reset()?;
        timing.reset_s = stage.elapsed().as_secs_f64();

        emit_progress(progress_cb, RunStage::BuildScript, started, None, None);
        let stage = Instant::now();
        let built = ScriptBuilder::new(&self.registry, self.templater.as_ref(), input.analysis)
            .with_screenshots(input.directions)
            .build(&selection, &requirements)?;
        let mut expected = built.expected;
        let script = built.text;
        timing.build_s = stage.elapsed().as_secs_f64();
        emit_progress(
            progress_cb,
            RunStage::BuildScript,
            started,
            Some(format!("{} artifacts expected", expected.len())),
            Some(ScriptProgress {
                expected_artifacts: expected.len(),
                script_bytes: script.len(),
                shapes: shapes_run(&requirements),
            }),
        );

        emit_progress(progress_cb, RunStage::WriteScript, started, None, None);
        let stage = Instant::now();
        backend.write_script(&script)?;
        timing.write_s = stage.elapsed().as_secs_f64();

        emit_progress(progress_cb, RunStage::SignalStart, started, None, None);
        backend.signal_start()?;

        emit_progress(progress_cb, RunStage::AwaitCompletion, started, Some("Engine running".to_string()), None);
        let stage = Instant::now();
        backend.await_completion()?;
        timing.solve_s = stage.elapsed().as_secs_f64();

        emit_progress(progress_cb, RunStage::Ingest, started, None, None);
        let stage = Instant::now();
        let work_dir: PathBuf = backend.work_dir().to_path_buf();
        let mut store = ResultStore::new();
        let pipeline = ResultIngestionPipeline::new(&self.registry, &*self.clock)
            .with_poll_policy(self.poll);
        let consumed = pipeline
            .ingest::<EngineError, _>(&work_dir, &mut expected, &mut store, || {
                backend.check_health()
            })
            .map_err(|err| match err {
                EngineError::Ingest(err) => AppError::from(err),
                other => AppError::Engine(other),
            })?;
        timing.ingest_s = stage.elapsed().as_secs_f64();

        let messages = backend.take_warnings();
        timing.total_s = started.elapsed().as_secs_f64();
        tracing::info!(
            items = store.len(),
            screenshots = store.screenshots().len(),
            warnings = messages.len(),
            "iteration complete"
        );

        Ok(IterationOutcome {
            script,
            selection,
            requirements,
            store,
            consumed,
            messages,
            timing,
        })
    }
}

/// Shapes whose analyses the script contains.
fn shapes_run(requirements: &AnalysisRequirements) -> Vec<AnalysisShape> {
    AnalysisShape::ALL
        .into_iter()
        .filter(|&shape| requirements.static_required(shape))
        .collect()
}
