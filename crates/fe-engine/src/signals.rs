//! File names of the working-directory handshake.
//!
//! The controller and the engine never talk directly; every message is the
//! existence of one of these files.

use std::path::{Path, PathBuf};

/// Written by the engine once its acceptor loop is running.
pub const READY_SIGNAL: &str = "ems_signal_ansys_ready.control";
/// Written by the controller to request one iteration.
pub const START_SIGNAL: &str = "ems_signal_start.control";
/// Written by the engine after the iteration script has executed.
pub const FINISH_SIGNAL: &str = "ems_signal_iteration_finish.control";
/// Written by the controller to make the acceptor loop exit.
pub const TERMINATE_SIGNAL: &str = "ems_signal_terminate.control";

/// Script consumed on every start signal.
pub const INPUT_SCRIPT: &str = "model_input_file.dat";
/// Acceptor script the engine is launched with.
pub const BOOTSTRAP_SCRIPT: &str = "Job_Eater.dat";

pub const OUTPUT_PREFIX: &str = "ems_output_";
pub const IMAGE_PREFIX: &str = "ems_image_";

/// Append-only error log of `job_name`.
pub fn error_log_name(job_name: &str) -> String {
    format!("{job_name}0.err")
}

/// Leftovers of a previous iteration that [`crate::EngineBackend::reset`] removes.
pub fn is_iteration_leftover(name: &str) -> bool {
    name.starts_with(OUTPUT_PREFIX)
        || (name.starts_with(IMAGE_PREFIX) && name.ends_with(".png"))
        || name == INPUT_SCRIPT
}

/// Paths of the protocol files inside one working directory.
#[derive(Debug, Clone)]
pub struct SignalPaths {
    pub ready: PathBuf,
    pub start: PathBuf,
    pub finish: PathBuf,
    pub terminate: PathBuf,
    pub input: PathBuf,
    pub bootstrap: PathBuf,
    pub error_log: PathBuf,
}

impl SignalPaths {
    pub fn new(work_dir: &Path, job_name: &str) -> Self {
        Self {
            ready: work_dir.join(READY_SIGNAL),
            start: work_dir.join(START_SIGNAL),
            finish: work_dir.join(FINISH_SIGNAL),
            terminate: work_dir.join(TERMINATE_SIGNAL),
            input: work_dir.join(INPUT_SCRIPT),
            bootstrap: work_dir.join(BOOTSTRAP_SCRIPT),
            error_log: work_dir.join(error_log_name(job_name)),
        }
    }
}
