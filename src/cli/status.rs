//! Status command.

use crate::storage::{StorageSnapshot, TodoAdapter};
use crate::{Error, Result};
use std::io::Write;

/// Backend and record counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Backend name.
    pub backend: &'static str,
    /// Lifecycle state name.
    pub state: String,
    /// Total records.
    pub total: usize,
    /// Completed records.
    pub completed: usize,
}

/// Prints the storage state and record counts.
///
/// # Errors
///
/// Returns an error if the adapter or the writer fails.
pub async fn status(
    adapter: &dyn TodoAdapter,
    snapshot: &StorageSnapshot,
    out: &mut impl Write,
) -> Result<StatusReport> {
    let todos = adapter.get_todos().await?;
    let report = StatusReport {
        backend: adapter.backend_name(),
        state: snapshot.state.to_string(),
        total: todos.len(),
        completed: todos.iter().filter(|t| t.completed).count(),
    };

    writeln!(
        out,
        "backend: {}\nstate:   {}\ntodos:   {} ({} completed)",
        report.backend, report.state, report.total, report.completed
    )
    .map_err(|e| Error::operation("write_output", e))?;

    Ok(report)
}
