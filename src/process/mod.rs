//! Process-related modules for reading the process table.
//!
//! This module provides:
//! - `inventory`: /proc access and the in-memory snapshot used for test data
//! - `scanner`: Process discovery and name matching
//! - `status`: Parsing of status records
//! - `affinity`: CPU affinity mask decoding
//! - `sched`: Scheduling policy and priority queries
//! - `terminate`: Graceful termination of matched processes

pub mod affinity;
pub mod inventory;
pub mod scanner;
pub mod sched;
pub mod status;
pub mod terminate;

// Re-export commonly used types
pub use affinity::{AffinityError, CpuMask};
pub use inventory::{
    InventorySnapshot, ProcFs, ProcessInventory, SnapshotProcess, SnapshotThread, TaskId,
    DEFAULT_PROC_ROOT,
};
pub use scanner::{candidates, matches_app_name, CommandLine};
pub use sched::{LinuxSched, SchedError, SchedPolicy, SchedQuery};
pub use status::{parse_status, StatusFields};
pub use terminate::{terminate_process, LinuxSignaller, Signaller};
