//! # Todokit
//!
//! Local-first todo storage with pluggable backends.
//!
//! Application code talks to a single [`TodoAdapter`] handle. Which backend
//! sits behind it is decided once at startup from the host platform:
//!
//! - **Native**: an embedded `SQLite` database with versioned, journaled
//!   schema migrations
//! - **Web**: a flat key-value store holding the whole record set as one
//!   JSON blob
//!
//! The [`StorageManager`] picks the backend, drives its asynchronous
//! initialization and publishes `{adapter, is_ready, error}` snapshots to
//! consumers.
//!
//! ## Example
//!
//! ```rust,ignore
//! use todokit::{NewTodo, StorageManager, TodokitConfig};
//!
//! let manager = StorageManager::new(&TodokitConfig::load_default());
//! manager.start().await?;
//! let adapter = manager.wait_ready().await?;
//! let todo = adapter.create_todo(NewTodo::new("Write the release notes")).await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod storage;

pub use config::TodokitConfig;
pub use models::{NewTodo, Priority, SyncStatus, Timestamp, Todo, TodoEvent, TodoId, TodoPatch};
pub use storage::{
    KeyValueStore, KeyValueTodoAdapter, LifecycleState, Platform, SqliteTodoAdapter,
    StorageManager, StorageSnapshot, TodoAdapter,
};

/// Error type for todokit operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Blank titles, unknown priority or platform names |
/// | `OperationFailed` | I/O or database failures on an individual call |
/// | `NotFound` | `update_todo` on an id the store does not hold |
/// | `NotReady` | CRUD issued before `initialize()` succeeded |
/// | `Initialization` | A backend cannot open or migrate its store |
/// | `Migration` | A migration step or the journal manifest is broken |
/// | `Serialization` | A record set cannot be encoded or decoded |
/// | `InvalidState` | Lifecycle misuse, such as starting a manager twice |
#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A todo is created or updated with an empty title
    /// - A priority, sync status or platform string cannot be parsed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` queries or transactions fail
    /// - Key-value storage reads or writes fail
    /// - Configuration or log files cannot be read or opened
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The targeted todo does not exist.
    #[error("todo not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The adapter has not completed initialization.
    #[error("{backend} adapter is not ready")]
    NotReady {
        /// Backend name.
        backend: &'static str,
    },

    /// A backend could not open or migrate its store.
    ///
    /// Terminal for the manager that observed it; there is no retry.
    #[error("{backend} adapter initialization failed: {cause}")]
    Initialization {
        /// Backend name.
        backend: &'static str,
        /// The underlying cause.
        cause: String,
    },

    /// A schema migration step failed or the journal is inconsistent.
    #[error("migration {idx} ({tag}) failed: {cause}")]
    Migration {
        /// Journal index of the step.
        idx: u32,
        /// Migration tag.
        tag: String,
        /// The underlying cause.
        cause: String,
    },

    /// Encoding or decoding a stored record set failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// An operation was attempted in the wrong lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Shorthand for [`Error::OperationFailed`].
    pub fn operation(operation: impl Into<String>, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Returns true if this is a [`Error::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for todokit operations.
pub type Result<T> = std::result::Result<T, Error>;
