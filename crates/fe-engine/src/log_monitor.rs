//! Tails the engine's append-only error log.
//!
//! The engine writes `<job>0.err` while it runs. Every check reads the whole
//! file, skips it if the last write has not reached a line boundary yet, and
//! only looks at lines it has not seen before. Messages start with a header
//! such as `*** WARNING ***   CP = 0.594   TIME= 10:25:01` and run until the
//! next blank line or header.

use crate::error::{EngineError, EngineResult};
use fe_results::EngineMessage;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Substring of a fault that marks a diverged solution.
pub const NOT_CONVERGED_MARKER: &str = "Solution not converged";

/// Appended to the fault when the engine process is gone.
pub const ENGINE_EXITED_MESSAGE: &str =
    "The engine process has terminated during the analysis. Usually this means that it did not converge.";

const HEADER_PATTERN: &str = r"^\s*\*\*\*\s*(?P<kind>.*?)\s*\*\*\*\s*CP\s*=\s*(?P<cp>[\d.+\-eE]*)\s*TIME\s*=\s*(?P<time>[\d:]*)\s*(?P<rest>.*)$";

/// One message of the error log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: String,
    pub cp: String,
    pub time: String,
    /// Whitespace-normalized text.
    pub message: String,
}

#[derive(Debug)]
pub struct ErrorLogMonitor {
    path: PathBuf,
    header: Regex,
    seen: HashSet<(usize, String)>,
    warnings: Vec<EngineMessage>,
}

impl ErrorLogMonitor {
    pub fn new(path: impl Into<PathBuf>) -> EngineResult<Self> {
        Ok(Self {
            path: path.into(),
            header: Regex::new(HEADER_PATTERN)?,
            seen: HashSet::new(),
            warnings: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forget every seen line, e.g. after the work directory was recreated.
    pub fn clear(&mut self) {
        self.seen.clear();
        self.warnings.clear();
    }

    /// Warnings recorded since the last call.
    pub fn take_warnings(&mut self) -> Vec<EngineMessage> {
        std::mem::take(&mut self.warnings)
    }

    pub fn warnings(&self) -> &[EngineMessage] {
        &self.warnings
    }

    /// Messages that appeared since the previous read.
    ///
    /// A missing or unreadable log yields nothing; the engine creates it
    /// lazily and may hold it while writing.
    pub fn read_new(&mut self) -> Vec<LogEntry> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::trace!(path = %self.path.display(), error = %err, "error log not readable yet");
                }
                return Vec::new();
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        if !text.ends_with('\n') {
            return Vec::new();
        }

        let mut fresh = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                fresh.push("");
            } else if self.seen.insert((index, line.to_string())) {
                fresh.push(line);
            }
        }

        self.split_messages(&fresh)
    }

    fn split_messages(&self, lines: &[&str]) -> Vec<LogEntry> {
        let mut entries = Vec::new();
        let mut current: Option<(LogEntry, Vec<&str>)> = None;

        for line in lines {
            if let Some(caps) = self.header.captures(line) {
                if let Some(done) = current.take() {
                    entries.push(finish(done));
                }
                let entry = LogEntry {
                    kind: caps["kind"].trim().to_string(),
                    cp: caps["cp"].to_string(),
                    time: caps["time"].to_string(),
                    message: String::new(),
                };
                let rest = caps.name("rest").map_or("", |m| m.as_str());
                current = Some((entry, vec![rest]));
            } else if line.trim().is_empty() {
                if let Some(done) = current.take() {
                    entries.push(finish(done));
                }
            } else if let Some((_, text)) = current.as_mut() {
                text.push(line);
            }
        }
        if let Some(done) = current.take() {
            entries.push(finish(done));
        }
        entries
    }

    /// Raise every new fatal message as one [`EngineError::EngineFault`].
    ///
    /// Warnings are recorded and never fail. When `engine_alive` is false
    /// the log is read once more, since the engine may have written its
    /// last words between the two reads, and the fault always fires.
    pub fn check(&mut self, engine_alive: bool) -> EngineResult<()> {
        let mut errors = Vec::new();
        let entries = self.read_new();
        self.absorb(entries, &mut errors);

        if !engine_alive {
            let late = self.read_new();
            self.absorb(late, &mut errors);
            errors.push(ENGINE_EXITED_MESSAGE.to_string());
        }

        if errors.is_empty() {
            return Ok(());
        }

        let message = errors.join("\n");
        let not_converged = message.contains(NOT_CONVERGED_MARKER);
        tracing::error!(%message, not_converged, "engine reported a fatal fault");
        Err(EngineError::EngineFault {
            message,
            not_converged,
        })
    }

    fn absorb(&mut self, entries: Vec<LogEntry>, errors: &mut Vec<String>) {
        for entry in entries {
            match entry.kind.as_str() {
                "ERROR" => errors.push(entry.message),
                "WARNING" => {
                    tracing::warn!(time = %entry.time, message = %entry.message, "engine warning");
                    self.warnings.push(EngineMessage::warning(entry.message));
                }
                other => errors.push(format!(
                    "Could not find the type of engine message given by {other}."
                )),
            }
        }
    }
}

fn finish((mut entry, text): (LogEntry, Vec<&str>)) -> LogEntry {
    entry.message = normalize_whitespace(&text.join(" "));
    entry
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const WARNING: &str = " *** WARNING ***                         CP =       0.594   TIME= 10:25:01\n Coefficient ratio exceeds 1.0e8 - Check results.\n\n";
    const ERROR: &str = " *** ERROR ***                           CP =       1.203   TIME= 10:25:07\n Solution not converged at time 1 (load step 1\n substep 1).\n\n";

    fn append(path: &Path, text: &str) {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn missing_log_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = ErrorLogMonitor::new(dir.path().join("fe_job0.err")).unwrap();
        assert!(monitor.check(true).is_ok());
    }

    #[test]
    fn warnings_are_recorded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe_job0.err");
        append(&path, WARNING);

        let mut monitor = ErrorLogMonitor::new(&path).unwrap();
        monitor.check(true).unwrap();
        monitor.check(true).unwrap();

        let warnings = monitor.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].text,
            "Coefficient ratio exceeds 1.0e8 - Check results."
        );
        assert!(monitor.warnings().is_empty());
    }

    #[test]
    fn error_fails_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe_job0.err");
        append(&path, WARNING);
        append(&path, ERROR);

        let mut monitor = ErrorLogMonitor::new(&path).unwrap();
        match monitor.check(true) {
            Err(EngineError::EngineFault {
                message,
                not_converged,
            }) => {
                assert_eq!(
                    message,
                    "Solution not converged at time 1 (load step 1 substep 1)."
                );
                assert!(not_converged);
            }
            other => panic!("expected a fault, got {other:?}"),
        }
        assert!(monitor.check(true).is_ok());
        assert_eq!(monitor.warnings().len(), 1);
    }

    #[test]
    fn partial_write_waits_for_line_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe_job0.err");
        append(&path, " *** ERROR ***   CP = 1.0   TIME= 10:00:00\n Element 12 has");

        let mut monitor = ErrorLogMonitor::new(&path).unwrap();
        assert!(monitor.check(true).is_ok());

        append(&path, " a negative length.\n");
        let err = monitor.check(true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Engine fault: Element 12 has a negative length."
        );
    }

    #[test]
    fn unknown_kind_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe_job0.err");
        append(&path, " *** PANIC ***   CP = 1.0   TIME= 10:00:00\n whatever\n");

        let mut monitor = ErrorLogMonitor::new(&path).unwrap();
        let err = monitor.check(true).unwrap_err();
        assert!(err.to_string().contains("given by PANIC"));
        assert!(!err.is_not_converged());
    }

    #[test]
    fn dead_engine_always_faults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe_job0.err");
        append(&path, WARNING);

        let mut monitor = ErrorLogMonitor::new(&path).unwrap();
        monitor.check(true).unwrap();
        match monitor.check(false) {
            Err(EngineError::EngineFault { message, .. }) => {
                assert_eq!(message, ENGINE_EXITED_MESSAGE);
            }
            other => panic!("expected a fault, got {other:?}"),
        }
    }

    #[test]
    fn consecutive_messages_split_on_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe_job0.err");
        append(
            &path,
            " *** WARNING ***  CP = 0.1  TIME= 09:00:00\n first\n *** WARNING ***  CP = 0.2  TIME= 09:00:01\n second\n",
        );

        let mut monitor = ErrorLogMonitor::new(&path).unwrap();
        let entries = monitor.read_new();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].time, "09:00:01");
        assert_eq!(entries[1].cp, "0.2");
    }
}
