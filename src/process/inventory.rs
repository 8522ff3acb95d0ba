//! Process inventory access.
//!
//! [`ProcFs`] reads a live /proc tree. [`InventorySnapshot`] serves the same
//! data from a JSON file and backs the `--test-data-file` mode and the tests.

use crate::process::sched::{SchedError, SchedQuery};
use crate::process::terminate::Signaller;
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// A process, or a thread under its owning process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    Process { pid: u32 },
    Thread { pid: u32, tid: u32 },
}

impl TaskId {
    /// Kernel id used for scheduler queries and signals.
    pub fn id(&self) -> u32 {
        match self {
            TaskId::Process { pid } => *pid,
            TaskId::Thread { tid, .. } => *tid,
        }
    }

    pub fn pid(&self) -> u32 {
        match self {
            TaskId::Process { pid } | TaskId::Thread { pid, .. } => *pid,
        }
    }

    pub fn is_thread(&self) -> bool {
        matches!(self, TaskId::Thread { .. })
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Process { pid } => write!(f, "PID {pid}"),
            TaskId::Thread { tid, .. } => write!(f, "Thread ID {tid}"),
        }
    }
}

/// Read access to the process table.
pub trait ProcessInventory {
    /// Numeric entries of the inventory root, ascending.
    fn pids(&self) -> io::Result<Vec<u32>>;

    /// Raw null-delimited command line.
    fn cmdline(&self, pid: u32) -> io::Result<Vec<u8>>;

    /// Short identity name (`comm`).
    fn comm(&self, task: TaskId) -> io::Result<String>;

    /// Full status record text.
    fn status(&self, task: TaskId) -> io::Result<String>;

    /// Thread ids owned by `pid`, ascending.
    fn threads(&self, pid: u32) -> io::Result<Vec<u32>>;

    /// Human readable location of the thread list, for diagnostics.
    fn threads_location(&self, pid: u32) -> String;
}

/// Live /proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn task_dir(&self, task: TaskId) -> PathBuf {
        match task {
            TaskId::Process { pid } => self.root.join(pid.to_string()),
            TaskId::Thread { pid, tid } => self
                .root
                .join(pid.to_string())
                .join("task")
                .join(tid.to_string()),
        }
    }
}

/// Lists directory entries whose names are entirely numeric.
fn numeric_entries(dir: &Path) -> io::Result<Vec<u32>> {
    let mut ids: Vec<u32> = fs::read_dir(dir)?
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            name.parse().ok()
        })
        .filter(|id| *id > 0)
        .collect();
    ids.sort_unstable();
    Ok(ids)
}

impl ProcessInventory for ProcFs {
    fn pids(&self) -> io::Result<Vec<u32>> {
        numeric_entries(&self.root)
    }

    fn cmdline(&self, pid: u32) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(pid.to_string()).join("cmdline"))
    }

    fn comm(&self, task: TaskId) -> io::Result<String> {
        let s = fs::read_to_string(self.task_dir(task).join("comm"))?;
        Ok(s.trim_end_matches('\n').to_string())
    }

    fn status(&self, task: TaskId) -> io::Result<String> {
        fs::read_to_string(self.task_dir(task).join("status"))
    }

    fn threads(&self, pid: u32) -> io::Result<Vec<u32>> {
        numeric_entries(&self.root.join(pid.to_string()).join("task"))
    }

    fn threads_location(&self, pid: u32) -> String {
        format!("{}/", self.root.join(pid.to_string()).join("task").display())
    }
}

/// One thread in a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotThread {
    pub tid: u32,
    #[serde(default)]
    pub comm: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub policy: Option<i32>,
    #[serde(default)]
    pub priority: Option<i32>,
}

/// One process in a snapshot. Absent fields read as missing files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotProcess {
    pub pid: u32,
    #[serde(default)]
    pub cmdline: Option<Vec<String>>,
    #[serde(default)]
    pub comm: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub policy: Option<i32>,
    #[serde(default)]
    pub priority: Option<i32>,
    /// `None` models an unreadable task directory.
    #[serde(default)]
    pub threads: Option<Vec<SnapshotThread>>,
    /// Signals to this process fail with EPERM.
    #[serde(default)]
    pub protected: bool,
}

/// In-memory process table loaded from JSON.
///
/// A pid that is not in the table reads as `NotFound`, like an exited
/// process. A listed process with a missing field reads as `PermissionDenied`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub processes: Vec<SnapshotProcess>,
    /// Where the snapshot came from, for diagnostics.
    #[serde(skip)]
    source: String,
    /// Pids that received a termination signal during this run.
    #[serde(skip)]
    terminated: RefCell<BTreeSet<u32>>,
}

const SNAPSHOT_SOURCE: &str = "snapshot";

fn not_found(what: impl fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{what} not found"))
}

fn unreadable(what: impl fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, format!("{what} unreadable"))
}

impl InventorySnapshot {
    pub fn new(processes: Vec<SnapshotProcess>) -> Self {
        Self {
            processes,
            source: SNAPSHOT_SOURCE.to_string(),
            terminated: RefCell::default(),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let mut snapshot: Self = serde_json::from_str(content)?;
        snapshot.source = SNAPSHOT_SOURCE.to_string();
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let mut snapshot = Self::from_json(&content)?;
        snapshot.source = path.display().to_string();
        Ok(snapshot)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.borrow().iter().copied().collect()
    }

    fn process(&self, pid: u32) -> Option<&SnapshotProcess> {
        if self.terminated.borrow().contains(&pid) {
            return None;
        }
        self.processes.iter().find(|p| p.pid == pid)
    }

    fn thread(&self, pid: u32, tid: u32) -> Option<&SnapshotThread> {
        self.process(pid)?
            .threads
            .as_ref()?
            .iter()
            .find(|t| t.tid == tid)
    }

    /// `(comm, status)` of a task that is still present.
    fn task_files(&self, task: TaskId) -> io::Result<(Option<String>, Option<String>)> {
        match task {
            TaskId::Process { pid } => self
                .process(pid)
                .map(|p| (p.comm.clone(), p.status.clone())),
            TaskId::Thread { pid, tid } => self
                .thread(pid, tid)
                .map(|t| (t.comm.clone(), t.status.clone())),
        }
        .ok_or_else(|| not_found(task))
    }

    /// Finds a task by kernel id, the way a scheduler query would.
    fn sched_fields(&self, id: u32) -> Option<(Option<i32>, Option<i32>)> {
        if let Some(p) = self.process(id) {
            return Some((p.policy, p.priority));
        }
        self.processes
            .iter()
            .filter(|p| !self.terminated.borrow().contains(&p.pid))
            .filter_map(|p| p.threads.as_ref())
            .flatten()
            .find(|t| t.tid == id)
            .map(|t| (t.policy, t.priority))
    }
}

impl ProcessInventory for InventorySnapshot {
    fn pids(&self) -> io::Result<Vec<u32>> {
        let terminated = self.terminated.borrow();
        let mut pids: Vec<u32> = self
            .processes
            .iter()
            .map(|p| p.pid)
            .filter(|pid| *pid > 0 && !terminated.contains(pid))
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }

    fn cmdline(&self, pid: u32) -> io::Result<Vec<u8>> {
        let args = self
            .process(pid)
            .ok_or_else(|| not_found(format!("PID {pid}")))?
            .cmdline
            .as_ref()
            .ok_or_else(|| unreadable(format!("cmdline for {pid}")))?;

        let mut blob = Vec::new();
        for arg in args {
            blob.extend_from_slice(arg.as_bytes());
            blob.push(0);
        }
        Ok(blob)
    }

    fn comm(&self, task: TaskId) -> io::Result<String> {
        let (comm, _) = self.task_files(task)?;
        comm.ok_or_else(|| unreadable(format!("comm for {task}")))
    }

    fn status(&self, task: TaskId) -> io::Result<String> {
        let (_, status) = self.task_files(task)?;
        status.ok_or_else(|| unreadable(format!("status for {task}")))
    }

    fn threads(&self, pid: u32) -> io::Result<Vec<u32>> {
        let threads = self
            .process(pid)
            .ok_or_else(|| not_found(format!("PID {pid}")))?
            .threads
            .as_ref()
            .ok_or_else(|| unreadable(format!("task list for {pid}")))?;
        let mut tids: Vec<u32> = threads.iter().map(|t| t.tid).filter(|t| *t > 0).collect();
        tids.sort_unstable();
        Ok(tids)
    }

    fn threads_location(&self, pid: u32) -> String {
        format!("task list of PID {pid} in {}", self.source)
    }
}

impl SchedQuery for InventorySnapshot {
    fn policy(&self, id: u32) -> Result<i32, SchedError> {
        self.sched_fields(id)
            .ok_or(SchedError::NoSuchTask(id))?
            .0
            .ok_or(SchedError::from_errno(id, Errno::EINVAL))
    }

    fn priority(&self, id: u32) -> Result<i32, SchedError> {
        self.sched_fields(id)
            .ok_or(SchedError::NoSuchTask(id))?
            .1
            .ok_or(SchedError::from_errno(id, Errno::EINVAL))
    }
}

impl Signaller for InventorySnapshot {
    fn terminate(&self, pid: u32) -> Result<(), Errno> {
        let process = self.process(pid).ok_or(Errno::ESRCH)?;
        if process.protected {
            return Err(Errno::EPERM);
        }
        self.terminated.borrow_mut().insert(pid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_task(dir: &Path, comm: &str, status: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("comm"), format!("{comm}\n")).unwrap();
        fs::write(dir.join("status"), status).unwrap();
    }

    #[test]
    fn test_procfs_lists_only_numeric_entries() {
        let root = tempdir().expect("Failed to create temp dir");
        for name in ["42", "7", "self", "sys", "12ab", "100"] {
            fs::create_dir(root.path().join(name)).unwrap();
        }
        fs::write(root.path().join("uptime"), "1.0 1.0").unwrap();

        let inv = ProcFs::new(root.path());
        assert_eq!(inv.pids().unwrap(), vec![7, 42, 100]);
    }

    #[test]
    fn test_procfs_missing_root_is_error() {
        let root = tempdir().expect("Failed to create temp dir");
        let inv = ProcFs::new(root.path().join("nope"));
        assert!(inv.pids().is_err());
    }

    #[test]
    fn test_procfs_reads_process_and_thread_files() {
        let root = tempdir().expect("Failed to create temp dir");
        let pdir = root.path().join("10");
        write_task(&pdir, "worker", "Name:\tworker\n");
        fs::write(pdir.join("cmdline"), b"/usr/bin/worker\0--fast\0").unwrap();
        write_task(&pdir.join("task").join("11"), "worker-io", "Name:\tworker-io\n");
        write_task(&pdir.join("task").join("10"), "worker", "Name:\tworker\n");

        let inv = ProcFs::new(root.path());
        assert_eq!(inv.cmdline(10).unwrap(), b"/usr/bin/worker\0--fast\0");
        assert_eq!(inv.comm(TaskId::Process { pid: 10 }).unwrap(), "worker");
        assert_eq!(inv.threads(10).unwrap(), vec![10, 11]);

        let thread = TaskId::Thread { pid: 10, tid: 11 };
        assert_eq!(inv.comm(thread).unwrap(), "worker-io");
        assert_eq!(inv.status(thread).unwrap(), "Name:\tworker-io\n");
    }

    #[test]
    fn test_task_id_accessors() {
        let p = TaskId::Process { pid: 5 };
        let t = TaskId::Thread { pid: 5, tid: 9 };
        assert_eq!(p.id(), 5);
        assert_eq!(t.id(), 9);
        assert_eq!(t.pid(), 5);
        assert!(t.is_thread());
        assert_eq!(p.to_string(), "PID 5");
        assert_eq!(t.to_string(), "Thread ID 9");
    }

    #[test]
    fn test_snapshot_from_json() {
        let snap = InventorySnapshot::from_json(
            r#"{"processes": [
                {"pid": 3, "cmdline": ["/bin/app", "-v"], "comm": "app",
                 "policy": 1, "priority": 50,
                 "threads": [{"tid": 4, "policy": 0, "priority": 0}]},
                {"pid": 2}
            ]}"#,
        )
        .expect("valid snapshot");

        assert_eq!(snap.pids().unwrap(), vec![2, 3]);
        assert_eq!(snap.source(), "snapshot");
        assert_eq!(snap.cmdline(3).unwrap(), b"/bin/app\0-v\0");
        assert_eq!(
            snap.cmdline(2).unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
        assert_eq!(snap.cmdline(9).unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(snap.policy(3), Ok(1));
        assert_eq!(snap.priority(4), Ok(0));
        assert_eq!(snap.policy(99), Err(SchedError::NoSuchTask(99)));
        assert!(snap.threads(2).is_err());
        assert_eq!(snap.threads_location(2), "task list of PID 2 in snapshot");
    }

    #[test]
    fn test_snapshot_distinguishes_vanished_from_unreadable() {
        let snap = InventorySnapshot::new(vec![SnapshotProcess {
            pid: 8,
            threads: Some(vec![SnapshotThread {
                tid: 9,
                ..Default::default()
            }]),
            ..Default::default()
        }]);

        let present = TaskId::Process { pid: 8 };
        let thread = TaskId::Thread { pid: 8, tid: 9 };
        let gone = TaskId::Thread { pid: 8, tid: 10 };
        assert_eq!(snap.status(present).unwrap_err().kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(snap.status(thread).unwrap_err().kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(snap.status(gone).unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(snap.threads(7).unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_snapshot_load_records_source() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("testdata.json");
        fs::write(&path, r#"{"processes": [{"pid": 4}]}"#).unwrap();

        let snap = InventorySnapshot::load(&path).unwrap();
        assert_eq!(snap.source(), path.display().to_string());
        assert_eq!(
            snap.threads_location(4),
            format!("task list of PID 4 in {}", path.display())
        );
    }

    #[test]
    fn test_snapshot_terminate() {
        let snap = InventorySnapshot::new(vec![
            SnapshotProcess {
                pid: 1,
                protected: true,
                ..Default::default()
            },
            SnapshotProcess {
                pid: 2,
                ..Default::default()
            },
        ]);

        assert_eq!(snap.terminate(1), Err(Errno::EPERM));
        assert_eq!(snap.terminate(2), Ok(()));
        assert_eq!(snap.terminate(2), Err(Errno::ESRCH));
        assert_eq!(snap.terminated(), vec![2]);
        assert_eq!(snap.pids().unwrap(), vec![1]);
    }
}
