use fe_core::{FeError, ManualClock, PollPolicy};
use fe_ingest::*;
use fe_results::{
    AnalysisShape, ResultClassification, ResultLocation, ResultStore, ResultType, ViewDirection,
};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;

const NODES: &str = "\
    NODE        X             Y             Z           THXY     THYZ     THZX
        1   0.0000        0.0000        0.0000          0.00     0.00     0.00
        2   3.0000        0.0000        0.0000          0.00     0.00     0.00
";

const ELEMENTS: &str = "LINE,ELEM,INODE,JNODE,KNODE\n1,1,1,2,0\n";

fn class(t: ResultType) -> ResultClassification {
    ResultClassification::new(t, AnalysisShape::Perfect)
}

fn eigen_kind() -> ArtifactKind {
    ArtifactKind::Result(ResultArtifact {
        classification: class(ResultType::EigenvalueBucklingMode1Factor),
        end: None,
    })
}

fn expect_result(expected: &mut ExpectedOutputSet, registry: &StrategyRegistry, t: ResultType) {
    for (name, artifact) in registry.artifacts(class(t)).unwrap() {
        expected.insert(name, ArtifactKind::Result(artifact));
    }
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn locked_artifact_stays_expected_until_released() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::ansys();
    let clock = ManualClock::new();
    let pipeline = ResultIngestionPipeline::new(&registry, &clock);

    let mut expected = ExpectedOutputSet::new();
    expected.insert("a.txt", eigen_kind());
    expected.insert("b.txt", eigen_kind());
    write(dir.path(), "a.txt", "  1  2.5\n");
    write(dir.path(), "b.txt", "  1  4.0\n");

    let holder = File::open(dir.path().join("a.txt")).unwrap();
    holder.lock_exclusive().unwrap();

    let mut store = ResultStore::new();
    let pass = pipeline.ingest_pass(dir.path(), &mut expected, &mut store).unwrap();
    assert_eq!(pass.consumed, ["b.txt"]);
    assert_eq!(pass.locked, ["a.txt"]);
    assert_eq!(expected.names().collect::<Vec<_>>(), ["a.txt"]);
    assert!(!dir.path().join("b.txt").exists());

    FileExt::unlock(&holder).unwrap();
    drop(holder);

    let pass = pipeline.ingest_pass(dir.path(), &mut expected, &mut store).unwrap();
    assert_eq!(pass.consumed, ["a.txt"]);
    assert!(expected.is_empty());
    assert!(!dir.path().join("a.txt").exists());
    assert_eq!(store.len(), 2);
}

#[test]
fn mesh_dependent_listings_wait_for_the_mesh() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::ansys();
    let clock = ManualClock::new();
    let pipeline = ResultIngestionPipeline::new(&registry, &clock);

    let mut expected = ExpectedOutputSet::new();
    expected.insert(MESH_NODES_ARTIFACT, ArtifactKind::MeshNodes);
    expected.insert(MESH_ELEMENTS_ARTIFACT, ArtifactKind::MeshElements);
    expect_result(&mut expected, &registry, ResultType::StrainEnergy);
    assert_eq!(expected.len(), 3);

    write(dir.path(), MESH_ELEMENTS_ARTIFACT, ELEMENTS);
    write(
        dir.path(),
        "ems_output_PerfectShape_Others_Element_StrainEnergy.txt",
        "ELEMENT,e_StrEn\n1,0.75\n",
    );

    let mut store = ResultStore::new();
    let pass = pipeline.ingest_pass(dir.path(), &mut expected, &mut store).unwrap();
    assert!(pass.consumed.is_empty());
    assert_eq!(pass.deferred.len(), 2);
    assert_eq!(pass.pending, 1);
    assert_eq!(store.mesh.element_count(), 0);
    assert!(dir.path().join(MESH_ELEMENTS_ARTIFACT).exists());

    write(dir.path(), MESH_NODES_ARTIFACT, NODES);
    let pass = pipeline.ingest_pass(dir.path(), &mut expected, &mut store).unwrap();
    assert_eq!(pass.consumed.len(), 3);
    assert_eq!(pass.consumed[0], MESH_NODES_ARTIFACT);
    assert_eq!(pass.consumed[1], MESH_ELEMENTS_ARTIFACT);
    assert!(expected.is_empty());

    assert_eq!(store.mesh.node_count(), 2);
    assert_eq!(store.mesh.element_count(), 1);
    assert_eq!(
        store.values_of(ResultType::StrainEnergy, AnalysisShape::Perfect),
        vec![(
            ResultLocation::Element {
                element: fe_core::EngineId::new(1).unwrap()
            },
            0.75
        )]
    );
}

#[test]
fn ingest_blocks_until_every_artifact_arrives() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::ansys();
    let clock = ManualClock::new();
    let pipeline = ResultIngestionPipeline::new(&registry, &clock)
        .with_poll_policy(PollPolicy::unbounded(Duration::from_millis(50)));

    let mut expected = ExpectedOutputSet::new();
    expected.insert(MESH_NODES_ARTIFACT, ArtifactKind::MeshNodes);
    expect_result(&mut expected, &registry, ResultType::NodalDisplacementUx);

    let mut guard_calls = 0;
    let mut store = ResultStore::new();
    let consumed = pipeline
        .ingest::<IngestError, _>(dir.path(), &mut expected, &mut store, || {
            guard_calls += 1;
            if guard_calls == 2 {
                write(dir.path(), MESH_NODES_ARTIFACT, NODES);
            }
            if guard_calls == 3 {
                write(
                    dir.path(),
                    "ems_output_PerfectShape_Nodal_Displacement.txt",
                    "NODE,UX,UY,UZ,RX,RY,RZ\n2,0.3,0.4,0.0,0,0,0\n",
                );
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(consumed.len(), 2);
    assert_eq!(guard_calls, 3);
    assert_eq!(clock.sleeps(), 2);
    assert!(expected.is_empty());

    let totals = store.values_of(ResultType::NodalDisplacementUTotal, AnalysisShape::Perfect);
    assert_eq!(totals.len(), 1);
    assert!((totals[0].1 - 0.5).abs() < 1e-12);
}

#[derive(Debug)]
enum RunError {
    Ingest(IngestError),
    Core(FeError),
    EngineDied,
}

impl From<IngestError> for RunError {
    fn from(e: IngestError) -> Self {
        RunError::Ingest(e)
    }
}

impl From<FeError> for RunError {
    fn from(e: FeError) -> Self {
        RunError::Core(e)
    }
}

#[test]
fn guard_failure_aborts_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::ansys();
    let clock = ManualClock::new();
    let pipeline = ResultIngestionPipeline::new(&registry, &clock);

    let mut expected = ExpectedOutputSet::new();
    expected.insert("never.txt", eigen_kind());

    let mut store = ResultStore::new();
    let mut calls = 0;
    let result = pipeline.ingest(dir.path(), &mut expected, &mut store, || {
        calls += 1;
        if calls > 4 { Err(RunError::EngineDied) } else { Ok(()) }
    });

    assert!(matches!(result, Err(RunError::EngineDied)));
    assert_eq!(expected.len(), 1);
}

#[test]
fn bounded_policy_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::ansys();
    let clock = ManualClock::new();
    let pipeline = ResultIngestionPipeline::new(&registry, &clock)
        .with_poll_policy(PollPolicy::attempts(3, Duration::from_millis(50)));

    let mut expected = ExpectedOutputSet::new();
    expected.insert("never.txt", eigen_kind());

    let mut store = ResultStore::new();
    let result = pipeline.ingest(dir.path(), &mut expected, &mut store, || Ok::<(), RunError>(()));
    assert!(matches!(
        result,
        Err(RunError::Core(FeError::TimedOut { attempts: 3, .. }))
    ));
}

#[test]
fn malformed_row_is_fatal_and_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::ansys();
    let clock = ManualClock::new();
    let pipeline = ResultIngestionPipeline::new(&registry, &clock);

    let mut expected = ExpectedOutputSet::new();
    expected.insert(MESH_NODES_ARTIFACT, ArtifactKind::MeshNodes);
    expect_result(&mut expected, &registry, ResultType::NodalDisplacementUz);
    write(dir.path(), MESH_NODES_ARTIFACT, NODES);
    write(
        dir.path(),
        "ems_output_PerfectShape_Nodal_Displacement.txt",
        "NODE,UX,UY,UZ,RX,RY,RZ\n1,0,0,0,0,0,0\n2,0,x,0,0,0,0\n",
    );

    let mut store = ResultStore::new();
    let err = pipeline
        .ingest_pass(dir.path(), &mut expected, &mut store)
        .unwrap_err();
    match err {
        IngestError::Parse {
            file, path, line, ..
        } => {
            assert_eq!(file, "ems_output_PerfectShape_Nodal_Displacement.txt");
            assert_eq!(path, dir.path().join(&file));
            assert_eq!(line, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(expected.contains("ems_output_PerfectShape_Nodal_Displacement.txt"));
}

#[test]
fn screenshots_are_stored_as_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StrategyRegistry::ansys();
    let clock = ManualClock::new();
    let pipeline = ResultIngestionPipeline::new(&registry, &clock);

    let shot = class(ResultType::NodalDisplacementUTotal);
    let name = format!(
        "{}_{}.png",
        shot.screenshot_stem(),
        ViewDirection::FrontTowardsYPos.as_str()
    );
    let mut expected = ExpectedOutputSet::new();
    expected.insert(name.clone(), ArtifactKind::Screenshot(shot));
    fs::write(dir.path().join(&name), [0x89, b'P', b'N', b'G']).unwrap();

    let mut store = ResultStore::new();
    pipeline.ingest_pass(dir.path(), &mut expected, &mut store).unwrap();

    assert!(expected.is_empty());
    assert_eq!(store.screenshots().len(), 1);
    assert_eq!(store.screenshots()[0].direction, ViewDirection::FrontTowardsYPos);
    assert_eq!(store.screenshots()[0].png, [0x89, b'P', b'N', b'G']);
}
