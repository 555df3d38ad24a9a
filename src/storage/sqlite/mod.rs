//! Shared `SQLite` plumbing for the native backend.
//!
//! - [`connection`]: opening and tuning connections
//! - [`todo_row`]: column list and row-to-[`Todo`](crate::models::Todo) mapping

mod connection;
mod todo_row;

pub use connection::{configure_connection, open_connection};
pub use todo_row::{TODO_COLUMNS, todo_from_row};
