//! Connection setup for the `SQLite` backend.

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;

/// Busy timeout applied to every connection, in milliseconds.
pub const BUSY_TIMEOUT_MS: &str = "5000";

/// Opens a database file, creating its parent directory if needed.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the directory cannot be created or
/// the file cannot be opened.
pub fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_data_dir".to_string(),
            cause: format!("{}: {e}", parent.display()),
        })?;
    }

    Connection::open(path).map_err(|e| Error::OperationFailed {
        operation: "open_database".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}

/// Applies WAL journaling, `NORMAL` synchronous and a busy timeout.
///
/// Pragma failures are ignored: in-memory databases reject WAL, and a
/// connection without these settings is still correct, only slower.
pub fn configure_connection(conn: &Connection) {
    // journal_mode returns a row, so execute_batch would fail here.
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS);
}
