//! Process discovery and name matching.
//!
//! Walks the inventory root, reads each process's command line and keeps the
//! ones whose program token contains the requested name.

use crate::process::inventory::ProcessInventory;
use std::borrow::Cow;
use std::io;
use tracing::trace;

/// Raw null-delimited command line as read from /proc/<pid>/cmdline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandLine(Vec<u8>);

impl CommandLine {
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Self(raw.into())
    }

    /// First token: the program path or name as invoked.
    pub fn program(&self) -> Option<Cow<'_, str>> {
        if self.0.is_empty() {
            return None;
        }
        let first = self.0.split(|&b| b == 0u8).next()?;
        Some(String::from_utf8_lossy(first))
    }
}

/// True if the program token contains `app_name`. Case-sensitive, unanchored.
/// An empty command line never matches; an empty name matches everything else.
pub fn matches_app_name(cmdline: &CommandLine, app_name: &str) -> bool {
    match cmdline.program() {
        Some(program) => program.contains(app_name),
        None => false,
    }
}

/// Lazily yields `(pid, cmdline)` for every process still readable.
///
/// The root listing is taken once; processes that vanish before their
/// command line is read are skipped.
pub fn candidates<I>(inventory: &I) -> io::Result<impl Iterator<Item = (u32, CommandLine)> + '_>
where
    I: ProcessInventory + ?Sized,
{
    let pids = inventory.pids()?;
    Ok(pids
        .into_iter()
        .filter_map(move |pid| match inventory.cmdline(pid) {
            Ok(raw) => Some((pid, CommandLine::new(raw))),
            Err(e) => {
                trace!("Skipping pid {}: {}", pid, e);
                None
            }
        }))
}
