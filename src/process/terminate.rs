//! Graceful termination of matched processes.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::{self, Write};
use tracing::debug;

/// Delivers a graceful termination request to a process.
pub trait Signaller {
    fn terminate(&self, pid: u32) -> Result<(), Errno>;
}

/// Sends SIGTERM through kill(2).
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxSignaller;

impl Signaller for LinuxSignaller {
    fn terminate(&self, pid: u32) -> Result<(), Errno> {
        let pid = i32::try_from(pid).map_err(|_| Errno::EINVAL)?;
        // pid 0 and negative values would address process groups
        if pid <= 0 {
            return Err(Errno::EINVAL);
        }
        kill(Pid::from_raw(pid), Signal::SIGTERM)
    }
}

/// Signals `pid` once and reports the outcome. Does not wait for exit.
///
/// Returns whether the signal was delivered. A failed write of the success
/// notice is returned as an error, like any other report output; the failure
/// notice on `err` is best-effort.
pub fn terminate_process<S, W, E>(
    signaller: &S,
    pid: u32,
    out: &mut W,
    err: &mut E,
) -> io::Result<bool>
where
    S: Signaller + ?Sized,
    W: Write,
    E: Write,
{
    match signaller.terminate(pid) {
        Ok(()) => {
            debug!("SIGTERM delivered to {}", pid);
            writeln!(out, "Successfully killed process {pid}")?;
            Ok(true)
        }
        Err(e) => {
            debug!("SIGTERM to {} failed: {}", pid, e);
            let _ = writeln!(err, "Error killing process {pid}: {e}");
            Ok(false)
        }
    }
}
