//! Scheduling policy and priority queries.
//!
//! `sched_getscheduler(2)` and `sched_getparam(2)` take any task id, so the
//! same query serves processes and their threads.

use nix::errno::Errno;
use serde::Serialize;
use std::fmt;

/// Flag the kernel ORs into the policy value for reset-on-fork tasks.
const SCHED_RESET_ON_FORK: i32 = 0x4000_0000;

// Linux policy numbers (include/uapi/linux/sched.h).
const SCHED_OTHER: i32 = 0;
const SCHED_FIFO: i32 = 1;
const SCHED_RR: i32 = 2;
const SCHED_BATCH: i32 = 3;
const SCHED_IDLE: i32 = 5;
const SCHED_DEADLINE: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedPolicy {
    Other,
    Fifo,
    RoundRobin,
    Batch,
    Idle,
    Deadline,
    Unknown,
}

impl SchedPolicy {
    /// Decodes a raw policy value. Never fails: unmapped values are `Unknown`.
    pub fn from_raw(raw: i32) -> Self {
        match raw & !SCHED_RESET_ON_FORK {
            SCHED_OTHER => SchedPolicy::Other,
            SCHED_FIFO => SchedPolicy::Fifo,
            SCHED_RR => SchedPolicy::RoundRobin,
            SCHED_BATCH => SchedPolicy::Batch,
            SCHED_IDLE => SchedPolicy::Idle,
            SCHED_DEADLINE => SchedPolicy::Deadline,
            _ => SchedPolicy::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedPolicy::Other => "SCHED_OTHER",
            SchedPolicy::Fifo => "SCHED_FIFO",
            SchedPolicy::RoundRobin => "SCHED_RR",
            SchedPolicy::Batch => "SCHED_BATCH",
            SchedPolicy::Idle => "SCHED_IDLE",
            SchedPolicy::Deadline => "SCHED_DEADLINE",
            SchedPolicy::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedError {
    #[error("no such task {0}")]
    NoSuchTask(u32),

    #[error("permission denied for task {0}")]
    PermissionDenied(u32),

    #[error("scheduler query for task {id} failed: {errno}")]
    Os { id: u32, errno: Errno },
}

impl SchedError {
    pub fn from_errno(id: u32, errno: Errno) -> Self {
        match errno {
            Errno::ESRCH => SchedError::NoSuchTask(id),
            Errno::EPERM => SchedError::PermissionDenied(id),
            other => SchedError::Os { id, errno: other },
        }
    }
}

/// Scheduling context lookup for a process or thread id.
pub trait SchedQuery {
    /// Raw policy value as returned by the kernel.
    fn policy(&self, id: u32) -> Result<i32, SchedError>;

    fn priority(&self, id: u32) -> Result<i32, SchedError>;
}

/// Queries the running kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxSched;

impl SchedQuery for LinuxSched {
    fn policy(&self, id: u32) -> Result<i32, SchedError> {
        // SAFETY: sched_getscheduler only reads the pid argument and
        // returns -1 with errno set on failure.
        let raw = unsafe { libc::sched_getscheduler(id as libc::pid_t) };
        if raw == -1 {
            return Err(SchedError::from_errno(id, Errno::last()));
        }
        Ok(raw)
    }

    fn priority(&self, id: u32) -> Result<i32, SchedError> {
        // SAFETY: sched_param is plain old data; all-zero is a valid value.
        let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
        // SAFETY: param is a valid sched_param owned by this frame.
        let rc = unsafe { libc::sched_getparam(id as libc::pid_t, &mut param) };
        if rc == -1 {
            return Err(SchedError::from_errno(id, Errno::last()));
        }
        Ok(param.sched_priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_policies() {
        assert_eq!(SchedPolicy::from_raw(0), SchedPolicy::Other);
        assert_eq!(SchedPolicy::from_raw(1), SchedPolicy::Fifo);
        assert_eq!(SchedPolicy::from_raw(2), SchedPolicy::RoundRobin);
        assert_eq!(SchedPolicy::from_raw(3), SchedPolicy::Batch);
        assert_eq!(SchedPolicy::from_raw(5), SchedPolicy::Idle);
        assert_eq!(SchedPolicy::from_raw(6), SchedPolicy::Deadline);
    }

    #[test]
    fn test_unmapped_values_are_unknown() {
        // 4 was SCHED_ISO and never merged
        for raw in [4, 7, 42, -1, i32::MIN, i32::MAX] {
            assert_eq!(SchedPolicy::from_raw(raw), SchedPolicy::Unknown, "raw={raw}");
        }
    }

    #[test]
    fn test_reset_on_fork_flag_is_ignored() {
        assert_eq!(
            SchedPolicy::from_raw(SCHED_FIFO | SCHED_RESET_ON_FORK),
            SchedPolicy::Fifo
        );
        assert_eq!(
            SchedPolicy::from_raw(SCHED_BATCH | SCHED_RESET_ON_FORK),
            SchedPolicy::Batch
        );
    }

    #[test]
    fn test_display_names() {
        assert_eq!(SchedPolicy::Other.to_string(), "SCHED_OTHER");
        assert_eq!(SchedPolicy::RoundRobin.to_string(), "SCHED_RR");
        assert_eq!(SchedPolicy::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_errno_mapping() {
        assert_eq!(SchedError::from_errno(7, Errno::ESRCH), SchedError::NoSuchTask(7));
        assert_eq!(
            SchedError::from_errno(7, Errno::EPERM),
            SchedError::PermissionDenied(7)
        );
        assert_eq!(
            SchedError::from_errno(7, Errno::EINVAL),
            SchedError::Os {
                id: 7,
                errno: Errno::EINVAL
            }
        );
    }

    #[test]
    fn test_linux_sched_own_process() {
        let pid = std::process::id();
        let policy = LinuxSched.policy(pid).expect("query own policy");
        assert_ne!(SchedPolicy::from_raw(policy), SchedPolicy::Unknown);
        assert!(LinuxSched.priority(pid).is_ok());
    }
}
