//! The single scan pass: enumerate, match, report, optionally terminate.

use crate::process::inventory::{ProcessInventory, TaskId};
use crate::process::scanner::{candidates, matches_app_name};
use crate::process::sched::SchedQuery;
use crate::process::terminate::{terminate_process, Signaller};
use crate::report::{inspect_task, render_text, ReportOptions, TaskReport};
use std::io::{self, Write};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("Error opening {location} directory: {source}")]
    InventoryRoot {
        location: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    pub app_name: String,
    pub kill: bool,
    pub report: ReportOptions,
    /// Render each report as text while scanning.
    pub stream_text: bool,
}

#[derive(Debug, Default)]
pub struct InspectSummary {
    pub reports: Vec<TaskReport>,
    pub killed: Vec<u32>,
    pub kill_failures: Vec<u32>,
}

/// Runs one pass over the inventory.
///
/// Only an unreadable inventory root or a failed write to `out` is fatal.
/// Everything else is written to `err` (best-effort) and the pass continues.
/// Processes that exit mid-pass are skipped silently.
pub fn run_inspection<I, Q, S, W, E>(
    inventory: &I,
    sched: &Q,
    signaller: &S,
    location: &str,
    options: &InspectOptions,
    out: &mut W,
    err: &mut E,
) -> Result<InspectSummary, InspectError>
where
    I: ProcessInventory + ?Sized,
    Q: SchedQuery + ?Sized,
    S: Signaller + ?Sized,
    W: Write,
    E: Write,
{
    let procs = candidates(inventory).map_err(|source| InspectError::InventoryRoot {
        location: location.to_string(),
        source,
    })?;

    let mut summary = InspectSummary::default();

    for (pid, cmdline) in procs {
        if !matches_app_name(&cmdline, &options.app_name) {
            continue;
        }
        debug!(
            "Matched pid {} ({})",
            pid,
            cmdline.program().unwrap_or_default()
        );

        let Some(report) =
            inspect_task(inventory, sched, TaskId::Process { pid }, options.report, err)
        else {
            debug!("Pid {} exited before it could be inspected", pid);
            continue;
        };
        if options.stream_text {
            render_text(&report, out)?;
        }

        if options.kill {
            if terminate_process(signaller, pid, out, err)? {
                summary.killed.push(pid);
            } else {
                summary.kill_failures.push(pid);
            }
        }

        summary.reports.push(report);
    }

    info!(
        "Scan finished: {} matches, {} terminated, {} termination failures",
        summary.reports.len(),
        summary.killed.len(),
        summary.kill_failures.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::inventory::{InventorySnapshot, ProcFs, SnapshotProcess};
    use tempfile::tempdir;

    fn snapshot_proc(pid: u32, program: &str) -> SnapshotProcess {
        SnapshotProcess {
            pid,
            cmdline: Some(vec![program.to_string()]),
            comm: Some(program.rsplit('/').next().unwrap_or(program).to_string()),
            status: Some(format!("Name:\t{program}\nState:\tS (sleeping)\n")),
            policy: Some(0),
            priority: Some(0),
            threads: Some(vec![]),
            protected: false,
        }
    }

    fn options(app_name: &str, kill: bool) -> InspectOptions {
        InspectOptions {
            app_name: app_name.into(),
            kill,
            report: ReportOptions::default(),
            stream_text: true,
        }
    }

    #[test]
    fn test_zero_matches_is_silent() {
        let inv = InventorySnapshot::new(vec![snapshot_proc(1, "/sbin/init")]);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let opts = options("nomatch", false);
        let summary = run_inspection(&inv, &inv, &inv, "/proc", &opts, &mut out, &mut err).unwrap();
        assert!(summary.reports.is_empty());
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[test]
    fn test_unreadable_root_is_fatal() {
        let root = tempdir().expect("Failed to create temp dir");
        let missing = root.path().join("absent");
        let inv = ProcFs::new(&missing);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let result = run_inspection(
            &inv,
            &crate::process::sched::LinuxSched,
            &crate::process::terminate::LinuxSignaller,
            "/absent",
            &options("x", false),
            &mut out,
            &mut err,
        );
        match result {
            Err(InspectError::InventoryRoot { location, .. }) => assert_eq!(location, "/absent"),
            other => panic!("expected InventoryRoot error, got {other:?}"),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn test_kill_continues_after_failure() {
        let mut guarded = snapshot_proc(20, "/usr/bin/app");
        guarded.protected = true;
        let inv = InventorySnapshot::new(vec![
            snapshot_proc(10, "/usr/bin/app"),
            guarded,
            snapshot_proc(30, "/usr/bin/app"),
        ]);
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let summary =
            run_inspection(&inv, &inv, &inv, "/proc", &options("app", true), &mut out, &mut err)
                .unwrap();

        assert_eq!(summary.killed, vec![10, 30]);
        assert_eq!(summary.kill_failures, vec![20]);
        let out = String::from_utf8(out).unwrap();
        let err = String::from_utf8(err).unwrap();
        assert!(out.contains("Successfully killed process 10\n"));
        assert!(out.contains("Successfully killed process 30\n"));
        assert!(err.contains("Error killing process 20"));
    }

    #[test]
    fn test_structured_mode_does_not_stream() {
        let inv = InventorySnapshot::new(vec![snapshot_proc(5, "/usr/bin/app")]);
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let mut opts = options("app", false);
        opts.stream_text = false;

        let summary = run_inspection(&inv, &inv, &inv, "/proc", &opts, &mut out, &mut err).unwrap();
        assert_eq!(summary.reports.len(), 1);
        assert!(out.is_empty());
    }
}
