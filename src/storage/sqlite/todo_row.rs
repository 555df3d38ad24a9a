//! Row conversion for the `todos` table.

use crate::models::{Priority, SyncStatus, Timestamp, Todo, TodoId};
use rusqlite::Row;

/// Column list in the order [`todo_from_row`] reads it.
pub const TODO_COLUMNS: &str =
    "id, title, description, completed, priority, created_at, updated_at, sync_status, last_synced_at";

/// Builds a [`Todo`] from a row selected with [`TODO_COLUMNS`].
///
/// Rows written by other tools may carry `NULL` or unknown values in the
/// defaulted columns. Those fall back to the model defaults instead of
/// failing the whole query.
///
/// # Errors
///
/// Returns a `rusqlite` error if a column has an incompatible type.
pub fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<Todo> {
    let priority: Option<String> = row.get(4)?;
    let sync_status: Option<String> = row.get(7)?;

    Ok(Todo {
        id: TodoId::new(row.get::<_, String>(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        completed: row.get::<_, Option<bool>>(3)?.unwrap_or(false),
        priority: priority
            .as_deref()
            .and_then(Priority::parse)
            .unwrap_or_default(),
        created_at: row
            .get::<_, Option<String>>(5)?
            .map(Timestamp::new)
            .unwrap_or_default(),
        updated_at: row
            .get::<_, Option<String>>(6)?
            .map(Timestamp::new)
            .unwrap_or_default(),
        sync_status: sync_status
            .as_deref()
            .and_then(SyncStatus::parse)
            .unwrap_or_default(),
        last_synced_at: row.get::<_, Option<String>>(8)?.map(Timestamp::new),
    })
}
