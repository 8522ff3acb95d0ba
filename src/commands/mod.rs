//! CLI command implementations for herakles-sched-inspector.
//!
//! - `inspect`: the scan pass against /proc or a test data snapshot

pub mod inspect;

// Re-export command functions
pub use inspect::command_inspect;
