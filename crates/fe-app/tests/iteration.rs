use fe_app::*;
use fe_core::{ManualClock, PollPolicy};
use fe_engine::{EngineBackend, EngineError, EngineResult, EngineState, LogEntry, ProcessInfo};
use fe_ingest::{MESH_ELEMENTS_ARTIFACT, MESH_NODES_ARTIFACT};
use fe_project::{AnalysisOptions, EngineConfig, LATEST_VERSION, Project, ScreenshotOptions};
use fe_results::{
    AnalysisShape, EngineMessage, ResultClassification, ResultType, SolverBackend,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

const NODES: &str = "\
    NODE        X             Y             Z           THXY     THYZ     THZX
        1   0.0000        0.0000        0.0000          0.00     0.00     0.00
        2   3.0000        0.0000        0.0000          0.00     0.00     0.00
";

const ELEMENTS: &str = "LINE,ELEM,INODE,JNODE,KNODE\n1,1,1,2,0\n";

const DISPLACEMENTS: &str = "NODE,UX,UY,UZ,RX,RY,RZ\n1,0,0,0,0,0,0\n2,0.3,0.4,0.0,0,0,0\n";

const DISPLACEMENT_ARTIFACT: &str = "ems_output_PerfectShape_Nodal_Displacement.txt";

/// Engine stand-in that drops canned artifacts when an iteration starts.
struct FakeEngine {
    work_dir: PathBuf,
    backend: SolverBackend,
    artifacts: Vec<(&'static str, String)>,
    calls: Vec<&'static str>,
    state: EngineState,
    script: Option<String>,
    fault: Option<String>,
    warnings: Vec<EngineMessage>,
}

impl FakeEngine {
    fn new(work_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            backend: SolverBackend::Ansys,
            artifacts: vec![
                (MESH_NODES_ARTIFACT, NODES.to_string()),
                (MESH_ELEMENTS_ARTIFACT, ELEMENTS.to_string()),
                (DISPLACEMENT_ARTIFACT, DISPLACEMENTS.to_string()),
            ],
            calls: Vec::new(),
            state: EngineState::NotRunning,
            script: None,
            fault: None,
            warnings: Vec::new(),
        }
    }
}

impl EngineBackend for FakeEngine {
    fn backend(&self) -> SolverBackend {
        self.backend
    }

    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn ensure_started(&mut self) -> EngineResult<()> {
        self.calls.push("ensure_started");
        fs::create_dir_all(&self.work_dir).unwrap();
        self.state = EngineState::Ready;
        Ok(())
    }

    fn reset(&mut self) -> EngineResult<()> {
        self.calls.push("reset");
        Ok(())
    }

    fn write_script(&mut self, script: &str) -> EngineResult<()> {
        self.calls.push("write_script");
        self.script = Some(script.to_string());
        Ok(())
    }

    fn signal_start(&mut self) -> EngineResult<()> {
        self.calls.push("signal_start");
        for (name, content) in &self.artifacts {
            fs::write(self.work_dir.join(name), content).unwrap();
        }
        Ok(())
    }

    fn await_completion(&mut self) -> EngineResult<()> {
        self.calls.push("await_completion");
        Ok(())
    }

    fn check_health(&mut self) -> EngineResult<()> {
        match self.fault.take() {
            Some(message) => Err(EngineError::EngineFault {
                not_converged: message.contains("Solution not converged"),
                message,
            }),
            None => Ok(()),
        }
    }

    fn take_warnings(&mut self) -> Vec<EngineMessage> {
        std::mem::take(&mut self.warnings)
    }

    fn read_error_log(&mut self) -> Vec<LogEntry> {
        Vec::new()
    }

    fn shutdown(&mut self) -> EngineResult<()> {
        self.state = EngineState::NotRunning;
        Ok(())
    }

    fn list_running_instances(&mut self) -> EngineResult<Vec<ProcessInfo>> {
        Ok(Vec::new())
    }

    fn kill_all(&mut self) -> EngineResult<usize> {
        Ok(0)
    }
}

struct Fixture {
    root: tempfile::TempDir,
    project: Project,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let project = Project {
            version: LATEST_VERSION,
            name: "portal-frame".to_string(),
            engine: EngineConfig::new("/opt/ansys/bin/ANSYS201", root.path().join("work")),
            analysis: AnalysisOptions::default(),
            results: Vec::new(),
            screenshots: ScreenshotOptions::default(),
        };
        Self { root, project }
    }

    fn project_path(&self) -> PathBuf {
        self.root.path().join("project.yaml")
    }

    fn engine(&self) -> FakeEngine {
        FakeEngine::new(&self.project.engine.work_dir)
    }
}

fn protocol() -> IterationProtocol {
    IterationProtocol::default()
        .with_clock(Rc::new(ManualClock::new()))
        .with_poll_policy(PollPolicy::attempts(20, Duration::from_millis(50)))
}

#[test]
fn default_selection_runs_and_is_archived() {
    let fixture = Fixture::new();
    let selection = Selection::from_project(&fixture.project).unwrap();
    let mut engine = fixture.engine();
    engine.warnings = vec![EngineMessage::warning("Coefficient ratio exceeds 1.0e8")];

    let path = fixture.project_path();
    let request = RunRequest {
        project_path: &path,
        project: &fixture.project,
        selection: &selection,
        options: RunOptions::default(),
    };
    let response = run_iteration(&protocol(), &mut engine, &request).unwrap();

    assert_eq!(
        engine.calls,
        ["ensure_started", "reset", "write_script", "signal_start", "await_completion"]
    );
    let script = engine.script.as_deref().unwrap();
    assert!(script.contains(DISPLACEMENT_ARTIFACT.trim_end_matches(".txt")));

    assert_eq!(response.store.mesh.node_count(), 2);
    assert_eq!(response.store.len(), 2);
    assert_eq!(response.manifest.item_count, 2);
    assert_eq!(response.messages.len(), 1);
    assert_eq!(response.manifest.messages, response.messages);
    assert!(!response.manifest.requirements.perfect_eigenvalue_buckling);

    for (name, _) in &engine.artifacts {
        assert!(!fixture.project.engine.work_dir.join(name).exists(), "{name} left behind");
    }

    let runs = list_runs(&path, "portal-frame").unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, response.run_id);

    let (manifest, store) = load_run(&path, &response.run_id).unwrap();
    assert_eq!(manifest.selection, response.manifest.selection);
    assert_eq!(store.len(), 2);
    let summary = get_run_summary(&manifest, &store);
    assert_eq!(summary.warning_count, 1);
    assert_eq!(summary.node_count, 2);

    let (_, umax) = extreme_value(
        &store,
        ResultType::NodalDisplacementUTotal,
        AnalysisShape::Perfect,
    )
    .unwrap();
    assert!((umax - 0.5).abs() < 1e-12);
}

#[test]
fn progress_follows_the_protocol() {
    let fixture = Fixture::new();
    let selection = Selection::from_project(&fixture.project).unwrap();
    let mut engine = fixture.engine();
    let path = fixture.project_path();
    let request = RunRequest {
        project_path: &path,
        project: &fixture.project,
        selection: &selection,
        options: RunOptions { save: false },
    };

    let mut stages = Vec::new();
    let mut expected_artifacts = None;
    let mut on_progress = |event: RunProgressEvent| {
        if let Some(script) = &event.script {
            expected_artifacts = Some(script.expected_artifacts);
        }
        if stages.last() != Some(&event.stage) {
            stages.push(event.stage);
        }
    };
    let response =
        run_iteration_with_progress(&protocol(), &mut engine, &request, Some(&mut on_progress))
            .unwrap();

    assert_eq!(
        stages,
        [
            RunStage::EnsureEngine,
            RunStage::Reset,
            RunStage::BuildScript,
            RunStage::WriteScript,
            RunStage::SignalStart,
            RunStage::AwaitCompletion,
            RunStage::Ingest,
            RunStage::Completed,
        ]
    );
    assert_eq!(expected_artifacts, Some(3));
    assert!(!response.saved);
    assert!(list_runs(&path, "portal-frame").unwrap().is_empty());
}

#[test]
fn engine_fault_aborts_without_results() {
    let fixture = Fixture::new();
    let selection = Selection::from_project(&fixture.project).unwrap();
    let mut engine = fixture.engine();
    engine.artifacts.truncate(1);
    engine.fault = Some("Solution not converged at time 1.".to_string());
    engine.warnings = vec![EngineMessage::warning("Large rotation")];

    let path = fixture.project_path();
    let request = RunRequest {
        project_path: &path,
        project: &fixture.project,
        selection: &selection,
        options: RunOptions::default(),
    };
    let err = run_iteration(&protocol(), &mut engine, &request).unwrap_err();

    assert!(err.is_not_converged(), "{err:?}");
    assert!(engine.warnings.is_empty());
    assert!(list_runs(&path, "portal-frame").unwrap().is_empty());
}

#[test]
fn malformed_artifact_is_an_ingestion_error() {
    let fixture = Fixture::new();
    let selection = Selection::from_project(&fixture.project).unwrap();
    let mut engine = fixture.engine();
    engine.artifacts[2].1 = "NODE,UX,UY,UZ,RX,RY,RZ\n2,zero,0,0,0,0,0\n".to_string();

    let path = fixture.project_path();
    let request = RunRequest {
        project_path: &path,
        project: &fixture.project,
        selection: &selection,
        options: RunOptions::default(),
    };
    match run_iteration(&protocol(), &mut engine, &request) {
        Err(AppError::Ingest(message)) => assert!(message.contains(DISPLACEMENT_ARTIFACT)),
        other => panic!("expected an ingestion error, got {other:?}"),
    }
}

#[test]
fn missing_artifact_times_out_under_a_bounded_policy() {
    let fixture = Fixture::new();
    let selection = Selection::from_project(&fixture.project).unwrap();
    let mut engine = fixture.engine();
    engine.artifacts.pop();

    let path = fixture.project_path();
    let request = RunRequest {
        project_path: &path,
        project: &fixture.project,
        selection: &selection,
        options: RunOptions::default(),
    };
    let err = run_iteration(&protocol(), &mut engine, &request).unwrap_err();
    assert!(
        matches!(err, AppError::Engine(EngineError::Core(_))),
        "{err:?}"
    );
}

#[test]
fn backend_must_support_the_selection() {
    let fixture = Fixture::new();
    let mut selection = Selection::new(SolverBackend::Ansys);
    selection
        .select(ResultClassification::new(
            ResultType::StrainEnergy,
            AnalysisShape::Perfect,
        ))
        .unwrap();
    let mut engine = fixture.engine();
    engine.backend = SolverBackend::Sap2000;

    let path = fixture.project_path();
    let request = RunRequest {
        project_path: &path,
        project: &fixture.project,
        selection: &selection,
        options: RunOptions::default(),
    };
    let err = run_iteration(&protocol(), &mut engine, &request).unwrap_err();
    assert!(matches!(err, AppError::Unsupported { .. }));
    assert!(engine.calls.is_empty());
}
