//! Finding and killing engine processes by image name.
//!
//! Only used to recover from a previous session: a live engine started by
//! this process is tracked through its handle instead.

use crate::error::{EngineError, EngineResult};
use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub name: String,
}

/// Access to the operating system's process list.
pub trait ProcessTable {
    fn snapshot(&self) -> EngineResult<Vec<ProcessInfo>>;

    /// Forcefully terminate `pid` together with its descendants.
    fn kill_tree(&self, pid: u32) -> EngineResult<()>;
}

/// Process table of the host, queried through `ps` or PowerShell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    #[cfg(windows)]
    fn snapshot(&self) -> EngineResult<Vec<ProcessInfo>> {
        let output = run(Command::new("powershell").args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            "Get-CimInstance Win32_Process | Select-Object ProcessId,ParentProcessId,Name | ConvertTo-Csv -NoTypeInformation",
        ]))?;
        Ok(parse_cim_csv(&output))
    }

    #[cfg(not(windows))]
    fn snapshot(&self) -> EngineResult<Vec<ProcessInfo>> {
        let output = run(Command::new("ps").args(["-A", "-o", "pid=,ppid=,comm="]))?;
        Ok(parse_ps_output(&output))
    }

    #[cfg(windows)]
    fn kill_tree(&self, pid: u32) -> EngineResult<()> {
        let status = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .status()
            .map_err(|e| process_error("taskkill", e))?;
        if !status.success() {
            tracing::warn!(pid, %status, "taskkill did not succeed; the process may already be gone");
        }
        Ok(())
    }

    #[cfg(not(windows))]
    fn kill_tree(&self, pid: u32) -> EngineResult<()> {
        let snapshot = self.snapshot()?;
        let mut pids = descendants(&snapshot, pid);
        pids.reverse();
        pids.push(pid);

        let status = Command::new("kill")
            .arg("-KILL")
            .args(pids.iter().map(u32::to_string))
            .status()
            .map_err(|e| process_error("kill", e))?;
        if !status.success() {
            tracing::warn!(pid, ?pids, %status, "kill did not succeed for every process");
        }
        Ok(())
    }
}

fn run(command: &mut Command) -> EngineResult<String> {
    let program = command.get_program().to_string_lossy().into_owned();
    let output = command.output().map_err(|e| process_error(&program, e))?;
    if !output.status.success() {
        return Err(EngineError::Process {
            message: format!("{program} exited with {}", output.status),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn process_error(program: &str, err: std::io::Error) -> EngineError {
    EngineError::Process {
        message: format!("could not run {program}: {err}"),
    }
}

/// Rows of `ps -A -o pid=,ppid=,comm=`.
pub fn parse_ps_output(output: &str) -> Vec<ProcessInfo> {
    output
        .lines()
        .filter_map(|line| {
            let (pid, rest) = line.trim().split_once(char::is_whitespace)?;
            let (ppid, command) = rest.trim_start().split_once(char::is_whitespace)?;
            let pid = pid.parse().ok()?;
            let parent_pid = ppid.parse().ok().filter(|&p: &u32| p != 0);
            let command = command.trim();
            let name = Path::new(command)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(command);
            Some(ProcessInfo {
                pid,
                parent_pid,
                name: name.to_string(),
            })
        })
        .collect()
}

/// `ConvertTo-Csv` output with a `"ProcessId","ParentProcessId","Name"` header.
pub fn parse_cim_csv(output: &str) -> Vec<ProcessInfo> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let trimmed = line.trim().trim_matches('"');
            let mut fields = trimmed.splitn(3, "\",\"");
            let pid = fields.next()?.parse().ok()?;
            let parent_pid = fields.next()?.parse().ok().filter(|&p: &u32| p != 0);
            let name = fields.next()?.to_string();
            Some(ProcessInfo {
                pid,
                parent_pid,
                name,
            })
        })
        .collect()
}

/// Every process below `pid`, breadth first.
pub fn descendants(snapshot: &[ProcessInfo], pid: u32) -> Vec<u32> {
    let mut found = Vec::new();
    let mut visited = BTreeSet::from([pid]);
    let mut queue = VecDeque::from([pid]);
    while let Some(parent) = queue.pop_front() {
        for child in snapshot.iter().filter(|p| p.parent_pid == Some(parent)) {
            if visited.insert(child.pid) {
                found.push(child.pid);
                queue.push_back(child.pid);
            }
        }
    }
    found
}

/// Process name without a trailing `.exe`.
pub fn base_name(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe") {
        &name[..len - 4]
    } else {
        name
    }
}

/// Shells the engine may have been launched through.
pub fn is_launcher_shell(name: &str) -> bool {
    matches!(
        base_name(name).to_ascii_lowercase().as_str(),
        "cmd" | "sh" | "bash"
    )
}

/// Name the engine executable shows up under in the process table.
pub fn image_stem(executable: &Path) -> String {
    executable
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Engine processes matching `image_stem`, each replaced by its launcher
/// shell when it has one.
pub fn find_engine_processes(snapshot: &[ProcessInfo], image_stem: &str) -> Vec<ProcessInfo> {
    if image_stem.is_empty() {
        return Vec::new();
    }
    let needle = image_stem.to_ascii_lowercase();
    let mut found: Vec<ProcessInfo> = Vec::new();

    for engine in snapshot
        .iter()
        .filter(|p| p.name.to_ascii_lowercase().contains(&needle))
    {
        let launcher = engine
            .parent_pid
            .and_then(|ppid| snapshot.iter().find(|p| p.pid == ppid))
            .filter(|parent| is_launcher_shell(&parent.name));
        let candidate = launcher.unwrap_or(engine);
        if found.iter().all(|p| p.pid != candidate.pid) {
            found.push(candidate.clone());
        }
    }
    found
}

/// What to do with the engine processes found at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    NotFound,
    Reattach(ProcessInfo),
    /// More than one candidate, or one that is not what this session would
    /// have launched. All of them are killed.
    Ambiguous(Vec<ProcessInfo>),
}

pub fn classify(candidates: Vec<ProcessInfo>, launched_via_shell: bool) -> Discovery {
    match candidates.len() {
        0 => Discovery::NotFound,
        1 if is_launcher_shell(&candidates[0].name) == launched_via_shell => {
            Discovery::Reattach(candidates[0].clone())
        }
        _ => Discovery::Ambiguous(candidates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc(pid: u32, parent: u32, name: &str) -> ProcessInfo {
        ProcessInfo {
            pid,
            parent_pid: (parent != 0).then_some(parent),
            name: name.to_string(),
        }
    }

    #[test]
    fn parses_ps_rows() {
        let rows = parse_ps_output("    1     0 init\n  420     1 /usr/bin/bash\n  421   420 ANSYS201\n garbage\n");
        assert_eq!(
            rows,
            [
                proc(1, 0, "init"),
                proc(420, 1, "bash"),
                proc(421, 420, "ANSYS201"),
            ]
        );
    }

    #[test]
    fn parses_cim_csv() {
        let csv = "\"ProcessId\",\"ParentProcessId\",\"Name\"\r\n\"4\",\"0\",\"System\"\r\n\"5120\",\"4800\",\"ANSYS201.exe\"\r\n";
        assert_eq!(parse_cim_csv(csv), [proc(4, 0, "System"), proc(5120, 4800, "ANSYS201.exe")]);
    }

    #[test]
    fn engines_resolve_to_their_shell() {
        let table = [
            proc(100, 1, "explorer.exe"),
            proc(200, 100, "cmd.exe"),
            proc(201, 200, "ANSYS201.exe"),
            proc(300, 100, "ANSYS201.exe"),
        ];
        let found = find_engine_processes(&table, "ANSYS201");
        assert_eq!(found, [proc(200, 100, "cmd.exe"), proc(300, 100, "ANSYS201.exe")]);
        assert!(matches!(classify(found, true), Discovery::Ambiguous(list) if list.len() == 2));
    }

    #[test]
    fn single_candidate_must_match_the_launch_mode() {
        let shell = vec![proc(200, 100, "cmd.exe")];
        assert_eq!(
            classify(shell.clone(), true),
            Discovery::Reattach(proc(200, 100, "cmd.exe"))
        );
        assert!(matches!(classify(shell, false), Discovery::Ambiguous(_)));

        let bare = vec![proc(300, 100, "ANSYS201")];
        assert!(matches!(classify(bare.clone(), false), Discovery::Reattach(_)));
        assert!(matches!(classify(bare, true), Discovery::Ambiguous(_)));
        assert_eq!(classify(Vec::new(), true), Discovery::NotFound);
    }

    #[test]
    fn descendants_are_breadth_first() {
        let table = [
            proc(10, 1, "cmd"),
            proc(11, 10, "ANSYS201"),
            proc(12, 11, "mpi"),
            proc(13, 10, "conhost"),
            proc(20, 1, "other"),
        ];
        assert_eq!(descendants(&table, 10), [11, 13, 12]);
        assert!(descendants(&table, 20).is_empty());
    }

    #[test]
    fn names() {
        assert_eq!(base_name("ANSYS201.EXE"), "ANSYS201");
        assert_eq!(base_name("bash"), "bash");
        assert!(is_launcher_shell("CMD.exe"));
        assert!(!is_launcher_shell("ANSYS201.exe"));
        assert_eq!(image_stem(Path::new("C:/ANSYS Inc/v201/ANSYS201.exe")), "ANSYS201");
    }
}
