//! Inspect command implementation.
//!
//! Runs the scan pass and writes the report to stdout, diagnostics to stderr.

use std::io::{self, Write};

use herakles_sched_inspector::process::{InventorySnapshot, LinuxSched, LinuxSignaller, ProcFs};
use herakles_sched_inspector::{
    run_inspection, InspectError, InspectOptions, InspectSummary, ReportOptions, TaskReport,
};
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::config::Config;

/// Scans for `app_name` and reports every match.
///
/// Exits with code 1 if the inventory root cannot be read.
pub fn command_inspect(
    app_name: &str,
    kill: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = config.output_format();
    let options = InspectOptions {
        app_name: app_name.to_string(),
        kill,
        report: ReportOptions {
            show_threads: config.show_threads.unwrap_or(true),
        },
        stream_text: format == OutputFormat::Text,
    };

    info!(
        "Inspecting processes matching '{}' (kill={}, format={:?})",
        app_name, kill, format
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut err = io::stderr().lock();
    // Structured output must stay parseable, so kill notices go to stderr.
    let mut notices = io::stderr();

    let result = if let Some(path) = &config.test_data_file {
        debug!("Using test data from {}", path.display());
        let snapshot = InventorySnapshot::load(path)?;
        let location = path.display().to_string();
        match format {
            OutputFormat::Text => run_inspection(
                &snapshot, &snapshot, &snapshot, &location, &options, &mut out, &mut err,
            ),
            _ => run_inspection(
                &snapshot, &snapshot, &snapshot, &location, &options, &mut notices, &mut err,
            ),
        }
    } else {
        let procfs = ProcFs::new(config.proc_root());
        let location = procfs.root().display().to_string();
        match format {
            OutputFormat::Text => run_inspection(
                &procfs, &LinuxSched, &LinuxSignaller, &location, &options, &mut out, &mut err,
            ),
            _ => run_inspection(
                &procfs, &LinuxSched, &LinuxSignaller, &location, &options, &mut notices,
                &mut err,
            ),
        }
    };

    let summary = match result {
        Ok(summary) => summary,
        Err(e @ InspectError::InventoryRoot { .. }) => {
            let _ = writeln!(err, "{e}");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    write_structured(&summary, format, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Serializes all reports at once for the json/yaml formats.
fn write_structured<W: Write>(
    summary: &InspectSummary,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    let reports: &[TaskReport] = &summary.reports;
    match format {
        OutputFormat::Text => {}
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, reports)?;
            writeln!(out)?;
        }
        OutputFormat::Yaml => {
            out.write_all(serde_yaml::to_string(reports)?.as_bytes())?;
        }
    }
    Ok(())
}
