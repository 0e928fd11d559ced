//! Drains an [`ExpectedOutputSet`] by ingesting the artifacts the engine
//! writes into its working directory.
//!
//! Files are produced asynchronously and in no particular order. Each pass
//! looks at every still-expected name once: missing files and files the
//! engine still holds are left for the next pass, mesh-dependent listings
//! wait until the node and connectivity listings are in, and everything
//! else is parsed, stored, deleted and struck from the set.

use crate::artifacts::{ArtifactKind, ExpectedOutputSet, MeshRequirement};
use crate::error::{IngestError, IngestResult};
use crate::lock;
use crate::parse::{self, Artifact};
use crate::registry::StrategyRegistry;
use fe_core::{Clock, FeError, PollPolicy, poll_until, retry};
use fe_results::{Mesh, ResultStore, ScreenShot, ViewDirection};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// What a single pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub consumed: Vec<String>,
    pub locked: Vec<String>,
    pub deferred: Vec<String>,
    pub pending: usize,
}

pub struct ResultIngestionPipeline<'a> {
    registry: &'a StrategyRegistry,
    clock: &'a dyn Clock,
    poll: PollPolicy,
    delete: PollPolicy,
}

impl<'a> ResultIngestionPipeline<'a> {
    pub fn new(registry: &'a StrategyRegistry, clock: &'a dyn Clock) -> Self {
        Self {
            registry,
            clock,
            poll: PollPolicy::default(),
            delete: PollPolicy::attempts(5, Duration::from_millis(50)),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_delete_policy(mut self, delete: PollPolicy) -> Self {
        self.delete = delete;
        self
    }

    /// Poll until `expected` is empty.
    ///
    /// `guard` runs before every pass; the engine's log monitor uses it to
    /// abort when the engine reports an error or dies. Returns the names
    /// consumed, in order.
    pub fn ingest<E, G>(
        &self,
        dir: &Path,
        expected: &mut ExpectedOutputSet,
        store: &mut ResultStore,
        mut guard: G,
    ) -> Result<Vec<String>, E>
    where
        E: From<IngestError> + From<FeError>,
        G: FnMut() -> Result<(), E>,
    {
        let mut consumed = Vec::new();
        poll_until(self.clock, &self.poll, "expected engine artifacts", || {
            guard()?;
            let pass = self.ingest_pass(dir, expected, store)?;
            consumed.extend(pass.consumed);
            Ok::<_, E>(expected.is_empty().then_some(()))
        })?;
        tracing::info!(artifacts = consumed.len(), "ingestion complete");
        Ok(consumed)
    }

    /// One scan over the expected artifacts.
    pub fn ingest_pass(
        &self,
        dir: &Path,
        expected: &mut ExpectedOutputSet,
        store: &mut ResultStore,
    ) -> IngestResult<PassSummary> {
        let mut summary = PassSummary::default();

        for (name, kind) in expected.ordered() {
            if !requirement_met(kind.requirement(), &store.mesh) {
                summary.deferred.push(name);
                continue;
            }

            let path = dir.join(&name);
            if !path.exists() {
                summary.pending += 1;
                continue;
            }
            if lock::is_locked(&path) {
                tracing::trace!(artifact = %name, "artifact still locked by the engine");
                summary.locked.push(name);
                continue;
            }

            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::debug!(artifact = %name, error = %err, "read failed; retrying next pass");
                    summary.pending += 1;
                    continue;
                }
            };

            self.consume(&name, &path, kind, bytes, store)?;
            self.delete(&path)?;
            expected.remove(&name);
            summary.consumed.push(name);
        }

        Ok(summary)
    }

    fn consume(
        &self,
        name: &str,
        path: &Path,
        kind: ArtifactKind,
        bytes: Vec<u8>,
        store: &mut ResultStore,
    ) -> IngestResult<()> {
        if let ArtifactKind::Screenshot(classification) = kind {
            let direction = screenshot_direction(name, &classification.screenshot_stem())
                .ok_or_else(|| IngestError::Parse {
                    file: name.to_string(),
                    path: path.to_path_buf(),
                    line: 0,
                    context: "file name does not end in a known view direction".to_string(),
                })?;
            store.push_screenshot(ScreenShot {
                classification,
                direction,
                png: bytes,
            });
            tracing::debug!(artifact = name, "screenshot loaded");
            return Ok(());
        }

        let text = String::from_utf8_lossy(&bytes);
        let artifact = Artifact::new(name, path, &text);

        match kind {
            ArtifactKind::MeshNodes => {
                let nodes = parse::mesh::mesh_nodes(&artifact)?;
                let count = nodes.len();
                for node in nodes {
                    store.mesh.insert_node(node);
                }
                store.mesh.mark_nodes_loaded();
                tracing::debug!(artifact = name, nodes = count, "mesh nodes ingested");
            }
            ArtifactKind::MeshElements => {
                let elements = parse::mesh::mesh_elements(&artifact)?;
                let count = elements.len();
                for element in elements {
                    store
                        .mesh
                        .insert_element(element)
                        .map_err(|e| artifact.mesh_error(e))?;
                }
                store.mesh.mark_elements_loaded();
                tracing::debug!(artifact = name, elements = count, "mesh connectivity ingested");
            }
            ArtifactKind::Result(target) => {
                let items = self.registry.parse(&artifact, &target, &mut store.mesh)?;
                tracing::debug!(
                    artifact = name,
                    items = items.len(),
                    result = %target.classification,
                    "result listing ingested"
                );
                store.extend(items);
            }
            ArtifactKind::Screenshot(_) => {}
        }
        Ok(())
    }

    fn delete(&self, path: &Path) -> IngestResult<()> {
        retry(self.clock, &self.delete, "artifact removal", || match fs::remove_file(path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        })
        .map_err(|exhausted| IngestError::Io {
            path: path.to_path_buf(),
            source: exhausted.last_error,
        })
    }
}

fn requirement_met(requirement: MeshRequirement, mesh: &Mesh) -> bool {
    match requirement {
        MeshRequirement::None => true,
        MeshRequirement::Nodes => mesh.nodes_loaded(),
        MeshRequirement::Elements => mesh.nodes_loaded() && mesh.elements_loaded(),
    }
}

/// `{stem}_{direction}.png` to the direction.
fn screenshot_direction(name: &str, stem: &str) -> Option<ViewDirection> {
    name.strip_suffix(".png")?
        .strip_prefix(stem)?
        .strip_prefix('_')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_comes_from_the_suffix() {
        let stem = "ems_image_PerfectShape_Nodal_Displacement_UTotal";
        assert_eq!(
            screenshot_direction(
                "ems_image_PerfectShape_Nodal_Displacement_UTotal_Perspective_TFR_Corner.png",
                stem
            ),
            Some(ViewDirection::PerspectiveTfrCorner)
        );
        assert_eq!(screenshot_direction("other.png", stem), None);
        assert_eq!(
            screenshot_direction(&format!("{stem}_Sideways.png"), stem),
            None
        );
    }
}
