//! Herakles Scheduler Inspector Library
//!
//! Finds running processes by command-line name and reports, for each match
//! and each of its threads, the state, CPU affinity, scheduling policy and
//! scheduling priority. Matches can optionally be sent SIGTERM.
//!
//! The readers are behind traits ([`process::ProcessInventory`],
//! [`process::SchedQuery`], [`process::Signaller`]) so a pass can run against
//! a live `/proc` or against an [`process::InventorySnapshot`].
//!
//! # Usage
//!
//! ```rust
//! use herakles_sched_inspector::inspect::{run_inspection, InspectOptions};
//! use herakles_sched_inspector::process::{InventorySnapshot, SnapshotProcess};
//!
//! let inventory = InventorySnapshot::new(vec![SnapshotProcess {
//!     pid: 42,
//!     cmdline: Some(vec!["/usr/bin/nginx".into()]),
//!     policy: Some(0),
//!     priority: Some(0),
//!     threads: Some(vec![]),
//!     ..Default::default()
//! }]);
//!
//! let options = InspectOptions {
//!     app_name: "nginx".into(),
//!     stream_text: true,
//!     ..Default::default()
//! };
//!
//! let (mut out, mut err) = (Vec::new(), Vec::new());
//! let summary = run_inspection(
//!     &inventory, &inventory, &inventory, "/proc", &options, &mut out, &mut err,
//! )
//! .unwrap();
//! assert_eq!(summary.reports.len(), 1);
//! ```

pub mod inspect;
pub mod process;
pub mod report;

// Re-export main types for convenience
pub use inspect::{run_inspection, InspectError, InspectOptions, InspectSummary};
pub use report::{inspect_task, render_text, ReportOptions, TaskKind, TaskReport};
