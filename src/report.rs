//! Per-task detail reports.
//!
//! A report is built once per matched process, including one nested report
//! per thread, and then rendered as text or serialized. Read failures are
//! written to the diagnostic stream and leave the affected fields empty.
//! A task that exits while it is being inspected is dropped without output.

use crate::process::inventory::{ProcessInventory, TaskId};
use crate::process::sched::{SchedError, SchedPolicy, SchedQuery};
use crate::process::status::{parse_status, StatusFields};
use serde::Serialize;
use std::io::{self, Write};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Process,
    Thread,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub id: u32,
    pub kind: TaskKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    pub comm: Option<String>,
    pub status: Option<StatusFields>,
    pub policy: Option<SchedPolicy>,
    pub priority: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub threads: Vec<TaskReport>,
}

/// What goes into a report.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub show_threads: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { show_threads: true }
    }
}

/// The task was gone by the time one of its files or its scheduler
/// attributes were read.
struct Vanished;

fn read_or_vanish<T>(
    result: io::Result<T>,
    task: TaskId,
    what: &str,
) -> Result<io::Result<T>, Vanished> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            trace!("{} vanished before {} was read", task, what);
            Err(Vanished)
        }
        other => Ok(other),
    }
}

fn sched_or_vanish<T>(
    result: Result<T, SchedError>,
    task: TaskId,
) -> Result<Result<T, SchedError>, Vanished> {
    match result {
        Err(SchedError::NoSuchTask(_)) => {
            trace!("{} vanished before its scheduler attributes were read", task);
            Err(Vanished)
        }
        other => Ok(other),
    }
}

/// Builds the report for one process or thread. Threads are only walked for
/// processes, so recursion depth is at most one.
///
/// Returns `None` if the task exited mid-inspection; nothing is written for
/// it in that case.
pub fn inspect_task<I, Q, E>(
    inventory: &I,
    sched: &Q,
    task: TaskId,
    options: ReportOptions,
    err: &mut E,
) -> Option<TaskReport>
where
    I: ProcessInventory + ?Sized,
    Q: SchedQuery + ?Sized,
    E: Write,
{
    let mut diagnostics = Vec::new();
    let (comm, status, policy, priority) =
        read_task(inventory, sched, task, &mut diagnostics).ok()?;

    for line in diagnostics {
        let _ = writeln!(err, "{line}");
    }

    let threads = match task {
        TaskId::Process { pid } if options.show_threads => match inventory.threads(pid) {
            Ok(tids) => tids
                .into_iter()
                .filter_map(|tid| {
                    inspect_task(inventory, sched, TaskId::Thread { pid, tid }, options, err)
                })
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!("Task list for {} vanished", pid);
                Vec::new()
            }
            Err(e) => {
                debug!("Failed to list threads for {}: {}", pid, e);
                let _ = writeln!(err, "Error opening {}", inventory.threads_location(pid));
                Vec::new()
            }
        },
        _ => Vec::new(),
    };

    let kind = if task.is_thread() {
        TaskKind::Thread
    } else {
        TaskKind::Process
    };

    Some(TaskReport {
        id: task.id(),
        kind,
        parent: task.is_thread().then(|| task.pid()),
        comm,
        status,
        policy,
        priority,
        threads,
    })
}

type TaskFields = (
    Option<String>,
    Option<StatusFields>,
    Option<SchedPolicy>,
    Option<i32>,
);

/// Reads everything but the thread list. Diagnostics are collected so a
/// vanished task leaves none behind.
fn read_task<I, Q>(
    inventory: &I,
    sched: &Q,
    task: TaskId,
    diagnostics: &mut Vec<String>,
) -> Result<TaskFields, Vanished>
where
    I: ProcessInventory + ?Sized,
    Q: SchedQuery + ?Sized,
{
    let comm = match read_or_vanish(inventory.comm(task), task, "comm")? {
        Ok(c) => Some(c),
        Err(e) => {
            trace!("No comm for {}: {}", task, e);
            None
        }
    };

    let status = match read_or_vanish(inventory.status(task), task, "status")? {
        Ok(content) => {
            let parsed = parse_status(&content);
            if let Some((raw, e)) = parsed.mask_error {
                diagnostics.push(format!("Invalid Cpus_allowed mask '{raw}' for {task}: {e}"));
            }
            Some(parsed.fields)
        }
        Err(e) => {
            debug!("Failed to read status for {}: {}", task, e);
            diagnostics.push(format!("Error opening status file for {task}"));
            None
        }
    };

    let policy = match sched_or_vanish(sched.policy(task.id()), task)? {
        Ok(raw) => Some(SchedPolicy::from_raw(raw)),
        Err(e) => {
            diagnostics.push(format!("Error getting scheduler policy for {task}: {e}"));
            None
        }
    };

    let priority = match sched_or_vanish(sched.priority(task.id()), task)? {
        Ok(p) => Some(p),
        Err(e) => {
            diagnostics.push(format!("Error getting scheduler priority for {task}: {e}"));
            None
        }
    };

    Ok((comm, status, policy, priority))
}

/// Writes the text block for a process report and its threads.
pub fn render_text<W: Write>(report: &TaskReport, out: &mut W) -> io::Result<()> {
    render_at_depth(report, 0, out)
}

fn render_at_depth<W: Write>(report: &TaskReport, depth: usize, out: &mut W) -> io::Result<()> {
    let heading_indent = "\t".repeat(depth);
    let indent = "\t".repeat(depth + 1);

    match report.kind {
        TaskKind::Process => writeln!(out, "{heading_indent}PID: {}", report.id)?,
        TaskKind::Thread => writeln!(out, "{heading_indent}Thread ID: {}", report.id)?,
    }

    if let Some(comm) = &report.comm {
        writeln!(out, "{indent}Comm: {comm}")?;
    }

    if let Some(status) = &report.status {
        if let Some(name) = &status.name {
            writeln!(out, "{indent}Name:\t{name}")?;
        }
        if let Some(state) = &status.state {
            writeln!(out, "{indent}State:\t{state}")?;
        }
        if let Some(list) = &status.cpus_allowed_list {
            writeln!(out, "{indent}Cpus_allowed_list:\t{list}")?;
        }
        if let Some(mask) = &status.cpus_allowed {
            writeln!(out, "{indent}Cpus_allowed: {mask}")?;
        }
    }

    if let Some(policy) = report.policy {
        writeln!(out, "{indent}Scheduler: {policy}")?;
    }
    if let Some(priority) = report.priority {
        writeln!(out, "{indent}Scheduler Priority: {priority}")?;
    }

    for thread in &report.threads {
        render_at_depth(thread, depth + 1, out)?;
    }
    Ok(())
}
