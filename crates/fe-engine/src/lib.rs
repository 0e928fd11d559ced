//! fe-engine: drives an external FE engine through its work directory.
//!
//! Contains:
//! - signals (file names of the handshake)
//! - bootstrap (acceptor loop the engine runs at start-up)
//! - manager (engine process lifecycle and one iteration's handshake)
//! - log_monitor (error log tailing)
//! - process (process table discovery for reattach and kill)
//! - script (iteration script assembly)

pub mod backend;
pub mod bootstrap;
pub mod error;
pub mod log_monitor;
pub mod manager;
pub mod process;
pub mod script;
pub mod signals;

pub use backend::{EngineBackend, EngineState};
pub use error::{EngineError, EngineResult};
pub use log_monitor::{ErrorLogMonitor, LogEntry};
pub use manager::{EngineChild, EngineLauncher, EngineProcessManager, ProcessLauncher};
pub use process::{Discovery, ProcessInfo, ProcessTable, SystemProcessTable};
pub use script::{BuiltScript, ScriptBuilder, ScriptTemplater, SkeletonTemplater};
pub use signals::SignalPaths;
