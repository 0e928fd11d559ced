//! Project schema definitions.

use fe_results::{AnalysisShape, ResultClassification, ResultType, SolverBackend, ViewDirection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    pub engine: EngineConfig,
    #[serde(default)]
    pub analysis: AnalysisOptions,
    #[serde(default)]
    pub results: Vec<ResultSelectionDef>,
    #[serde(default)]
    pub screenshots: ScreenshotOptions,
}

impl Project {
    /// Selected classifications in file order; the default selection if none are listed.
    pub fn selection(&self) -> Vec<ResultClassification> {
        if self.results.is_empty() {
            return fe_results::catalog()
                .into_iter()
                .filter(|c| c.is_default_selected())
                .collect();
        }
        self.results.iter().map(|r| r.classification()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: SolverBackend,
    pub executable: PathBuf,
    #[serde(default = "default_job_name")]
    pub job_name: String,
    pub work_dir: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_cleanup_attempts")]
    pub cleanup_attempts: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub cleanup_interval_ms: u64,
    #[serde(default = "default_reset_budget_ms")]
    pub reset_budget_ms: u64,
    #[serde(default = "default_reset_interval_ms")]
    pub reset_interval_ms: u64,
    #[serde(default = "default_finish_delete_attempts")]
    pub finish_delete_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timeout_ms: Option<u64>,
    #[serde(default = "default_launch_via_shell")]
    pub launch_via_shell: bool,
    #[serde(default = "default_engine_env")]
    pub env: BTreeMap<String, String>,
}

impl EngineConfig {
    pub fn new(executable: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: SolverBackend::default(),
            executable: executable.into(),
            job_name: default_job_name(),
            work_dir: work_dir.into(),
            poll_interval_ms: default_poll_interval_ms(),
            cleanup_attempts: default_cleanup_attempts(),
            cleanup_interval_ms: default_poll_interval_ms(),
            reset_budget_ms: default_reset_budget_ms(),
            reset_interval_ms: default_reset_interval_ms(),
            finish_delete_attempts: default_finish_delete_attempts(),
            readiness_timeout_ms: None,
            completion_timeout_ms: None,
            launch_via_shell: default_launch_via_shell(),
            env: default_engine_env(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn reset_budget(&self) -> Duration {
        Duration::from_millis(self.reset_budget_ms)
    }

    pub fn reset_interval(&self) -> Duration {
        Duration::from_millis(self.reset_interval_ms)
    }

    pub fn readiness_timeout(&self) -> Option<Duration> {
        self.readiness_timeout_ms.map(Duration::from_millis)
    }

    pub fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout_ms.map(Duration::from_millis)
    }
}

fn default_job_name() -> String {
    "fe_job".to_string()
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_cleanup_attempts() -> u32 {
    100
}

fn default_reset_budget_ms() -> u64 {
    2000
}

fn default_reset_interval_ms() -> u64 {
    250
}

fn default_finish_delete_attempts() -> u32 {
    5
}

fn default_launch_via_shell() -> bool {
    cfg!(windows)
}

fn default_engine_env() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("ANSYS201_PRODUCT".to_string(), "ANSYS".to_string()),
        ("ANS_CONSEC".to_string(), "YES".to_string()),
    ])
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisOptions {
    #[serde(default = "default_eigenvalue_buckling_modes")]
    pub eigenvalue_buckling_modes: u32,
    #[serde(default = "default_imperfect_mode")]
    pub imperfect_mode: u32,
    #[serde(default = "default_imperfect_multiplier")]
    pub imperfect_multiplier: f64,
    #[serde(default)]
    pub large_deflections: bool,
    #[serde(default = "default_elements_per_frame")]
    pub elements_per_frame: u32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            eigenvalue_buckling_modes: default_eigenvalue_buckling_modes(),
            imperfect_mode: default_imperfect_mode(),
            imperfect_multiplier: default_imperfect_multiplier(),
            large_deflections: false,
            elements_per_frame: default_elements_per_frame(),
        }
    }
}

fn default_eigenvalue_buckling_modes() -> u32 {
    3
}

fn default_imperfect_mode() -> u32 {
    1
}

fn default_imperfect_multiplier() -> f64 {
    1.0
}

fn default_elements_per_frame() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultSelectionDef {
    pub result: ResultType,
    pub shape: AnalysisShape,
}

impl ResultSelectionDef {
    pub fn classification(&self) -> ResultClassification {
        ResultClassification::new(self.result, self.shape)
    }
}

impl From<ResultClassification> for ResultSelectionDef {
    fn from(c: ResultClassification) -> Self {
        Self {
            result: c.result_type,
            shape: c.shape,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScreenshotOptions {
    #[serde(default)]
    pub directions: Vec<ViewDirection>,
}
