//! Run execution and archive service.

use std::path::Path;
use std::time::Instant;

use fe_engine::{EngineBackend, EngineProcessManager};
use fe_project::Project;
use fe_results::{
    EngineMessage, ResultStore, RunManifest, RunStore, SolverBackend, compute_run_id,
};

use crate::error::{AppError, AppResult};
use crate::progress::RunStage;
use crate::protocol::{
    IterationInput, IterationProtocol, ProgressSink, RunTimingSummary, emit_progress,
};
use crate::selection::Selection;

/// Options for running an iteration.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Persist the result store next to the project.
    pub save: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { save: true }
    }
}

/// Request to execute one iteration.
pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    pub project: &'a Project,
    pub selection: &'a Selection,
    pub options: RunOptions,
}

/// Response from a completed iteration.
#[derive(Debug)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub store: ResultStore,
    pub messages: Vec<EngineMessage>,
    pub timing: RunTimingSummary,
    pub saved: bool,
}

/// Engine adapter for the project's backend.
pub fn open_backend(project: &Project) -> AppResult<Box<dyn EngineBackend>> {
    match project.engine.backend {
        SolverBackend::Ansys => Ok(Box::new(EngineProcessManager::new(project.engine.clone())?)),
        SolverBackend::Sap2000 => Err(AppError::Unsupported {
            message: "the Sap2000 backend is driven through UI automation, which is not available here"
                .to_string(),
        }),
    }
}

/// Execute one iteration.
pub fn run_iteration(
    protocol: &IterationProtocol,
    backend: &mut dyn EngineBackend,
    request: &RunRequest,
) -> AppResult<RunResponse> {
    run_iteration_with_progress(protocol, backend, request, None)
}

/// Execute one iteration and stream protocol progress events.
pub fn run_iteration_with_progress(
    protocol: &IterationProtocol,
    backend: &mut dyn EngineBackend,
    request: &RunRequest,
    mut progress_cb: ProgressSink<'_>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let input = IterationInput {
        selection: request.selection,
        analysis: &request.project.analysis,
        directions: &request.project.screenshots.directions,
    };

    let outcome = protocol.run_reporting(backend, &input, &mut progress_cb)?;
    let mut timing = outcome.timing;

    let run_id = compute_run_id(&outcome.script, &outcome.selection, backend.backend());
    let manifest = RunManifest {
        run_id: run_id.clone(),
        project_name: request.project.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        backend: backend.backend(),
        selection: outcome.selection,
        requirements: outcome.requirements,
        messages: outcome.messages.clone(),
        item_count: outcome.store.len(),
        screenshot_count: outcome.store.screenshots().len(),
    };

    if request.options.save {
        emit_progress(
            &mut progress_cb,
            RunStage::Saving,
            started,
            Some("Saving results".to_string()),
            None,
        );
        let save_started = Instant::now();
        let store = RunStore::for_project(request.project_path)?;
        store.save_run(&manifest, &outcome.store)?;
        timing.save_s = save_started.elapsed().as_secs_f64();
        tracing::info!(run_id = %run_id, dir = %store.root_dir().display(), "run saved");
    }
    timing.total_s += timing.save_s;

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some("Run completed".to_string()),
        None,
    );

    Ok(RunResponse {
        run_id,
        manifest,
        store: outcome.store,
        messages: outcome.messages,
        timing,
        saved: request.options.save,
    })
}

/// List runs of a project, most recent first.
pub fn list_runs(project_path: &Path, project_name: &str) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_project(project_path)?;

    let mut runs = store.list_runs(project_name)?;
    runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(runs)
}

/// Load a specific run.
pub fn load_run(project_path: &Path, run_id: &str) -> AppResult<(RunManifest, ResultStore)> {
    let store = RunStore::for_project(project_path)?;

    let manifest = store.load_manifest(run_id)?;
    let results = store.load_store(run_id)?;

    Ok((manifest, results))
}
