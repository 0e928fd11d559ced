//! Run storage API.
//!
//! Layout per run: `manifest.json`, `mesh.json`, `items.jsonl` and one
//! `images/<stem>_<direction>.png` per screenshot.

use crate::mesh::Mesh;
use crate::store::{ResultItem, ResultStore, ScreenShot};
use crate::taxonomy::ViewDirection;
use crate::types::RunManifest;
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Runs of a project live next to it under `.femflow/runs`.
    pub fn for_project(project_path: &Path) -> ResultsResult<Self> {
        let project_dir = project_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "project path has no parent directory".to_string(),
            })?;
        let runs_dir = project_dir.join(".femflow").join("runs");
        Self::new(runs_dir)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(&self, manifest: &RunManifest, store: &ResultStore) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        if run_dir.exists() {
            fs::remove_dir_all(&run_dir)?;
        }
        fs::create_dir_all(&run_dir)?;

        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join("manifest.json"), manifest_json)?;

        let mesh_json = serde_json::to_string(&store.mesh)?;
        fs::write(run_dir.join("mesh.json"), mesh_json)?;

        let mut items_content = String::new();
        for item in store.items() {
            let line = serde_json::to_string(item)?;
            items_content.push_str(&line);
            items_content.push('\n');
        }
        fs::write(run_dir.join("items.jsonl"), items_content)?;

        if !store.screenshots().is_empty() {
            let images_dir = run_dir.join("images");
            fs::create_dir_all(&images_dir)?;
            for shot in store.screenshots() {
                let name = format!(
                    "{}_{}.png",
                    shot.classification.screenshot_stem(),
                    shot.direction.as_str()
                );
                fs::write(images_dir.join(name), &shot.png)?;
            }
        }

        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn load_store(&self, run_id: &str) -> ResultsResult<ResultStore> {
        let manifest = self.load_manifest(run_id)?;
        let run_dir = self.run_dir(run_id);

        let mesh: Mesh = serde_json::from_str(&fs::read_to_string(run_dir.join("mesh.json"))?)?;

        let content = fs::read_to_string(run_dir.join("items.jsonl"))?;
        let mut items = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                let item: ResultItem = serde_json::from_str(line)?;
                items.push(item);
            }
        }

        let mut screenshots = Vec::new();
        let images_dir = run_dir.join("images");
        if images_dir.exists() {
            for classification in &manifest.selection {
                let stem = classification.screenshot_stem();
                for direction in ViewDirection::ALL {
                    let path = images_dir.join(format!("{}_{}.png", stem, direction.as_str()));
                    if path.exists() {
                        screenshots.push(ScreenShot {
                            classification: *classification,
                            direction,
                            png: fs::read(path)?,
                        });
                    }
                }
            }
        }

        Ok(ResultStore::from_parts(mesh, items, screenshots))
    }

    pub fn list_runs(&self, project_name: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.project_name == project_name
                {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
