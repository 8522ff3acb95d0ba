//! CLI arguments for herakles-sched-inspector.
//!
//! This module defines the command-line interface structure using the clap library.
//! The classic invocation `herakles-sched-inspector <name> [kill]` is kept as two
//! positional arguments.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Report output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-sched-inspector",
    about = "Show scheduling policy, priority and CPU affinity of matching processes",
    long_about = "Show scheduling policy, priority and CPU affinity of matching processes.\n\n\
                  Scans /proc for processes whose program path contains APP_NAME and prints \
                  state, CPU affinity, scheduling policy and priority for each match and each \
                  of its threads. Pass `kill` as second argument to send SIGTERM to every match.",
    version,
    after_help = "Example: herakles-sched-inspector nginx kill"
)]
pub struct Args {
    /// Substring to look for in each process's program path (case-sensitive)
    pub app_name: Option<String>,

    /// Optional action; `kill` sends SIGTERM to every match
    pub action: Option<String>,

    /// Send SIGTERM to every match (same as the `kill` action)
    #[arg(long)]
    pub kill: bool,

    /// Log level (diagnostic logging goes to stderr)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Root of the process inventory
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Report output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Do not report per-thread details
    #[arg(long)]
    pub no_threads: bool,

    /// Path to JSON test data file (uses a process snapshot instead of /proc)
    #[arg(short = 't', long)]
    pub test_data_file: Option<PathBuf>,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

impl Args {
    /// True if termination was requested by the positional action or `--kill`.
    pub fn kill_requested(&self) -> bool {
        self.kill || self.action.as_deref() == Some("kill")
    }
}
