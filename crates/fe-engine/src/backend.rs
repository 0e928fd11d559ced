use crate::error::EngineResult;
use crate::log_monitor::LogEntry;
use crate::process::ProcessInfo;
use fe_results::{EngineMessage, SolverBackend};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotRunning,
    Initializing,
    Ready,
}

/// What the iteration protocol needs from an engine adapter.
///
/// One iteration is `reset`, `write_script`, `signal_start`,
/// `await_completion`, then ingestion of the work directory with
/// `check_health` guarding every poll.
pub trait EngineBackend {
    fn backend(&self) -> SolverBackend;

    /// Directory the engine reads scripts from and writes artifacts into.
    fn work_dir(&self) -> &Path;

    fn state(&self) -> EngineState;

    /// Reattach to or launch an engine and block until it accepts work.
    fn ensure_started(&mut self) -> EngineResult<()>;

    /// Remove what a previous iteration left behind.
    fn reset(&mut self) -> EngineResult<()>;

    fn write_script(&mut self, script: &str) -> EngineResult<()>;

    fn signal_start(&mut self) -> EngineResult<()>;

    /// Wait for the finish signal and acknowledge it.
    fn await_completion(&mut self) -> EngineResult<()>;

    /// Fails once the engine logged an error or is no longer running.
    fn check_health(&mut self) -> EngineResult<()>;

    /// Non-fatal engine messages collected since the last call.
    fn take_warnings(&mut self) -> Vec<EngineMessage>;

    /// Error log messages that appeared since the previous read.
    ///
    /// Messages returned here count as seen and are not raised again by
    /// `check_health`.
    fn read_error_log(&mut self) -> Vec<LogEntry>;

    /// Ask the engine to exit and wait for it. No-op when nothing runs.
    fn shutdown(&mut self) -> EngineResult<()>;

    fn list_running_instances(&mut self) -> EngineResult<Vec<ProcessInfo>>;

    /// Kill every engine instance. Returns how many were found.
    fn kill_all(&mut self) -> EngineResult<usize>;
}
