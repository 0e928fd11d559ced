//! Lifecycle of the Ansys engine process.
//!
//! The engine is launched once with the acceptor script and then serves any
//! number of iterations through the signal files in its work directory.

use crate::backend::{EngineBackend, EngineState};
use crate::bootstrap::{acceptor_script, launch_args, launch_command_line};
use crate::error::{EngineError, EngineResult};
use crate::log_monitor::{ErrorLogMonitor, LogEntry};
use crate::process::{
    Discovery, ProcessInfo, ProcessTable, SystemProcessTable, classify, find_engine_processes,
    image_stem,
};
use crate::signals::{SignalPaths, is_iteration_leftover};
use fe_core::{Clock, FeError, PollPolicy, SystemClock, poll_until, retry};
use fe_project::EngineConfig;
use fe_results::{EngineMessage, SolverBackend};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::rc::Rc;

/// A launched engine, or the shell it runs in.
pub trait EngineChild {
    fn id(&self) -> u32;
    fn is_alive(&mut self) -> bool;
    /// Close the input channel; shell launches exit once it is closed.
    fn close_input(&mut self);
    fn wait(&mut self) -> io::Result<()>;
}

pub trait EngineLauncher {
    /// Start the engine on the acceptor script already written to the work
    /// directory.
    fn launch(&self, config: &EngineConfig) -> EngineResult<Box<dyn EngineChild>>;
}

/// Launches the engine with `std::process`, directly or through a shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

struct SpawnedChild {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl EngineChild for SpawnedChild {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn close_input(&mut self) {
        self.stdin = None;
    }

    fn wait(&mut self) -> io::Result<()> {
        self.close_input();
        self.child.wait().map(|_| ())
    }
}

impl EngineLauncher for ProcessLauncher {
    fn launch(&self, config: &EngineConfig) -> EngineResult<Box<dyn EngineChild>> {
        let work_dir = &config.work_dir;

        if !config.launch_via_shell {
            let args = launch_args(work_dir, &config.job_name);
            let mut child = Command::new(&config.executable)
                .args(&args)
                .current_dir(work_dir)
                .envs(&config.env)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|source| EngineError::Launch {
                    command: config.executable.display().to_string(),
                    source,
                })?;
            let stdin = child.stdin.take();
            return Ok(Box::new(SpawnedChild { child, stdin }));
        }

        let shell = if cfg!(windows) { "cmd.exe" } else { "sh" };
        let line = launch_command_line(&config.executable, work_dir, &config.job_name);
        let mut child = Command::new(shell)
            .current_dir(work_dir)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Launch {
                command: shell.to_string(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| EngineError::Launch {
            command: line.clone(),
            source: io::Error::other("shell input is not piped"),
        })?;
        writeln!(stdin, "{line}")
            .and_then(|()| stdin.flush())
            .map_err(|source| EngineError::Launch {
                command: line.clone(),
                source,
            })?;
        tracing::debug!(shell, command = %line, "engine launch command issued");

        Ok(Box::new(SpawnedChild {
            child,
            stdin: Some(stdin),
        }))
    }
}

enum Handle {
    Spawned(Box<dyn EngineChild>),
    /// Found in the process table, left over from an earlier session.
    Attached(ProcessInfo),
}

impl Handle {
    fn pid(&self) -> u32 {
        match self {
            Handle::Spawned(child) => child.id(),
            Handle::Attached(info) => info.pid,
        }
    }
}

/// [`EngineBackend`] for Ansys driven through the signal-file handshake.
pub struct EngineProcessManager {
    config: EngineConfig,
    paths: SignalPaths,
    clock: Rc<dyn Clock>,
    launcher: Box<dyn EngineLauncher>,
    processes: Box<dyn ProcessTable>,
    monitor: ErrorLogMonitor,
    handle: Option<Handle>,
    state: EngineState,
}

impl EngineProcessManager {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let paths = SignalPaths::new(&config.work_dir, &config.job_name);
        let monitor = ErrorLogMonitor::new(paths.error_log.clone())?;
        Ok(Self {
            config,
            paths,
            clock: Rc::new(SystemClock),
            launcher: Box::new(ProcessLauncher),
            processes: Box::new(SystemProcessTable),
            monitor,
            handle: None,
            state: EngineState::NotRunning,
        })
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_launcher(mut self, launcher: Box<dyn EngineLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_process_table(mut self, processes: Box<dyn ProcessTable>) -> Self {
        self.processes = processes;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn paths(&self) -> &SignalPaths {
        &self.paths
    }

    /// Recursively delete the work directory and wait until it is really gone.
    pub fn clean_up_directory(&self) -> EngineResult<()> {
        let dir = &self.config.work_dir;
        let policy = PollPolicy::attempts(self.config.cleanup_attempts, self.config.cleanup_interval());
        retry(&*self.clock, &policy, "work directory cleanup", || {
            match fs::remove_dir_all(dir) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
                _ => {}
            }
            if dir.exists() {
                Err(io::Error::other("directory is still present"))
            } else {
                Ok(())
            }
        })
        .map_err(|exhausted| EngineError::CleanupExhausted {
            path: dir.clone(),
            attempts: exhausted.attempts,
            source: exhausted.last_error,
        })
    }

    fn engine_alive(&mut self) -> bool {
        match &mut self.handle {
            Some(Handle::Spawned(child)) => child.is_alive(),
            Some(Handle::Attached(info)) => match self.processes.snapshot() {
                Ok(list) => list.iter().any(|p| p.pid == info.pid),
                Err(err) => {
                    tracing::warn!(error = %err, "process table unavailable; assuming the engine is alive");
                    true
                }
            },
            None => false,
        }
    }

    /// Look for an engine left running by an earlier session.
    fn reattach(&mut self) -> EngineResult<bool> {
        let stem = image_stem(&self.config.executable);
        let snapshot = self.processes.snapshot()?;
        let candidates = find_engine_processes(&snapshot, &stem);

        match classify(candidates, self.config.launch_via_shell) {
            Discovery::NotFound => Ok(false),
            Discovery::Reattach(info) if self.paths.bootstrap.exists() => {
                tracing::info!(pid = info.pid, name = %info.name, "reattached to running engine");
                // Only messages logged from now on belong to this session.
                self.monitor.clear();
                let stale = self.monitor.read_new();
                tracing::debug!(skipped = stale.len(), "existing error log entries skipped");
                self.handle = Some(Handle::Attached(info));
                self.state = EngineState::Ready;
                Ok(true)
            }
            Discovery::Reattach(info) => {
                tracing::warn!(
                    pid = info.pid,
                    work_dir = %self.config.work_dir.display(),
                    "running engine does not serve this work directory; killing it"
                );
                self.processes.kill_tree(info.pid)?;
                Ok(false)
            }
            Discovery::Ambiguous(list) => {
                let pids: Vec<u32> = list.iter().map(|p| p.pid).collect();
                tracing::warn!(?pids, "ambiguous engine instances found; killing all of them");
                for info in &list {
                    self.processes.kill_tree(info.pid)?;
                }
                Ok(false)
            }
        }
    }

    fn start_fresh(&mut self) -> EngineResult<()> {
        self.state = EngineState::Initializing;
        let dir = self.config.work_dir.clone();
        tracing::info!(work_dir = %dir.display(), "starting engine");

        self.clean_up_directory()?;
        fs::create_dir_all(&dir).map_err(|e| EngineError::io(&dir, e))?;
        fs::write(&self.paths.bootstrap, acceptor_script(&dir))
            .map_err(|e| EngineError::io(&self.paths.bootstrap, e))?;
        self.monitor.clear();

        let child = self.launcher.launch(&self.config)?;
        tracing::debug!(pid = child.id(), "engine process spawned");
        self.handle = Some(Handle::Spawned(child));

        if let Err(err) = self.wait_until_ready() {
            if let Some(handle) = self.handle.take()
                && let Err(kill_err) = self.processes.kill_tree(handle.pid())
            {
                tracing::warn!(error = %kill_err, "could not kill the engine that failed to start");
            }
            return Err(err);
        }

        self.state = EngineState::Ready;
        tracing::info!("engine ready");
        Ok(())
    }

    fn wait_until_ready(&mut self) -> EngineResult<()> {
        let clock = Rc::clone(&self.clock);
        let policy = PollPolicy::with_optional_timeout(
            self.config.poll_interval(),
            self.config.readiness_timeout(),
        );
        let waited = poll_until(&*clock, &policy, "engine readiness", || {
            if self.paths.ready.exists() {
                return Ok(Some(()));
            }
            if !self.engine_alive() {
                return Err(EngineError::EngineFault {
                    message: "The engine process exited before signalling readiness.".to_string(),
                    not_converged: false,
                });
            }
            Ok(None)
        });
        match waited {
            Err(EngineError::Core(FeError::TimedOut { waited, .. })) => {
                return Err(EngineError::ReadinessTimeout {
                    path: self.paths.ready.clone(),
                    waited,
                });
            }
            other => other?,
        }

        let ready = self.paths.ready.clone();
        self.remove_signal(&ready)
    }

    /// Delete a signal file the engine may still hold open.
    fn remove_signal(&self, path: &Path) -> EngineResult<()> {
        let policy = PollPolicy::attempts(
            self.config.finish_delete_attempts,
            self.config.poll_interval(),
        );
        retry(&*self.clock, &policy, "signal removal", || match fs::remove_file(path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        })
        .map_err(|exhausted| EngineError::io(path, exhausted.last_error))
    }

    fn write_signal(&self, path: &Path) -> EngineResult<()> {
        self.remove_signal(path)?;
        fs::write(path, " ").map_err(|source| EngineError::Signal {
            path: path.to_path_buf(),
            source,
        })
    }

    fn require_ready(&self) -> EngineResult<()> {
        if self.state == EngineState::Ready {
            Ok(())
        } else {
            Err(EngineError::NotRunning)
        }
    }

    fn wait_for_exit(&mut self, handle: Handle) -> EngineResult<()> {
        match handle {
            Handle::Spawned(mut child) => {
                child.close_input();
                child
                    .wait()
                    .map_err(|e| EngineError::io(&self.config.work_dir, e))
            }
            Handle::Attached(info) => {
                let clock = Rc::clone(&self.clock);
                let policy = PollPolicy::with_optional_timeout(
                    self.config.poll_interval(),
                    self.config.completion_timeout(),
                );
                poll_until(&*clock, &policy, "engine exit", || {
                    let snapshot = self.processes.snapshot()?;
                    Ok::<_, EngineError>(snapshot.iter().all(|p| p.pid != info.pid).then_some(()))
                })
            }
        }
    }
}

fn remove_leftovers(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_iteration_leftover(name) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
    }
    Ok(removed)
}

impl EngineBackend for EngineProcessManager {
    fn backend(&self) -> SolverBackend {
        SolverBackend::Ansys
    }

    fn work_dir(&self) -> &Path {
        &self.config.work_dir
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn ensure_started(&mut self) -> EngineResult<()> {
        if self.state == EngineState::Ready && self.engine_alive() {
            return Ok(());
        }
        if self.handle.take().is_some() {
            tracing::warn!("engine handle is stale; looking for a replacement");
        }
        self.state = EngineState::NotRunning;

        if self.reattach()? {
            return Ok(());
        }
        let started = self.start_fresh();
        if started.is_err() {
            self.state = EngineState::NotRunning;
        }
        started
    }

    fn reset(&mut self) -> EngineResult<()> {
        let dir = self.config.work_dir.clone();
        if !dir.is_dir() {
            return Err(EngineError::WorkDirMissing { path: dir });
        }

        let policy = PollPolicy::budget(self.config.reset_budget(), self.config.reset_interval());
        let removed = retry(&*self.clock, &policy, "work directory reset", || {
            remove_leftovers(&dir)
        })
        .map_err(|exhausted| EngineError::ResetExhausted {
            path: dir.clone(),
            waited: exhausted.waited,
            source: exhausted.last_error,
        })?;

        // A finish signal from an abandoned iteration would end the next wait early.
        let finish = self.paths.finish.clone();
        self.remove_signal(&finish)?;

        tracing::debug!(removed, "work directory reset");
        Ok(())
    }

    fn write_script(&mut self, script: &str) -> EngineResult<()> {
        fs::write(&self.paths.input, script).map_err(|e| EngineError::io(&self.paths.input, e))?;
        tracing::debug!(bytes = script.len(), "input script written");
        Ok(())
    }

    fn signal_start(&mut self) -> EngineResult<()> {
        self.require_ready()?;
        self.write_signal(&self.paths.start)?;
        tracing::info!("iteration started");
        Ok(())
    }

    fn await_completion(&mut self) -> EngineResult<()> {
        self.require_ready()?;
        let clock = Rc::clone(&self.clock);
        let policy = PollPolicy::with_optional_timeout(
            self.config.poll_interval(),
            self.config.completion_timeout(),
        );
        poll_until(&*clock, &policy, "iteration finish signal", || {
            self.check_health()?;
            Ok::<_, EngineError>(self.paths.finish.exists().then_some(()))
        })?;

        let finish = self.paths.finish.clone();
        self.remove_signal(&finish)?;
        tracing::info!("iteration finished");
        Ok(())
    }

    fn check_health(&mut self) -> EngineResult<()> {
        let alive = self.engine_alive();
        if !alive {
            self.handle = None;
            self.state = EngineState::NotRunning;
        }
        self.monitor.check(alive)
    }

    fn take_warnings(&mut self) -> Vec<EngineMessage> {
        self.monitor.take_warnings()
    }

    fn read_error_log(&mut self) -> Vec<LogEntry> {
        self.monitor.read_new()
    }

    fn shutdown(&mut self) -> EngineResult<()> {
        if self.handle.is_none() && !self.reattach()? {
            self.state = EngineState::NotRunning;
            tracing::debug!("no engine to shut down");
            return Ok(());
        }
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        tracing::info!(pid = handle.pid(), "shutting down engine");
        if let Err(err) = self.write_signal(&self.paths.terminate) {
            self.handle = Some(handle);
            return Err(err);
        }
        let exited = self.wait_for_exit(handle);
        self.state = EngineState::NotRunning;
        exited?;
        tracing::info!("engine exited");
        Ok(())
    }

    fn list_running_instances(&mut self) -> EngineResult<Vec<ProcessInfo>> {
        let snapshot = self.processes.snapshot()?;
        Ok(find_engine_processes(
            &snapshot,
            &image_stem(&self.config.executable),
        ))
    }

    fn kill_all(&mut self) -> EngineResult<usize> {
        let instances = self.list_running_instances()?;
        for info in &instances {
            tracing::warn!(pid = info.pid, name = %info.name, "killing engine instance");
            self.processes.kill_tree(info.pid)?;
        }
        if let Some(Handle::Spawned(mut child)) = self.handle.take() {
            child.close_input();
        }
        self.state = EngineState::NotRunning;
        Ok(instances.len())
    }
}
