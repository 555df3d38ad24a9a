//! Storage layer.
//!
//! Application code depends only on [`TodoAdapter`]. Two backends
//! implement it:
//!
//! - [`SqliteTodoAdapter`]: native hosts, embedded `SQLite` with
//!   journaled [`migrations`]
//! - [`KeyValueTodoAdapter`]: web hosts, the whole record set as one JSON
//!   blob in a [`KeyValueStore`]
//!
//! [`StorageManager`] picks one from the [`Platform`] and owns its
//! lifecycle.

// Guards are dropped at the end of short critical sections.
#![allow(clippy::significant_drop_tightening)]

pub mod adapters;
pub mod kv;
pub mod lifecycle;
pub mod migrations;
pub mod platform;
pub mod sqlite;
pub mod traits;

mod lock;

pub use adapters::{KeyValueTodoAdapter, SqliteTodoAdapter};
pub use kv::{FileKeyValueStore, MemoryKeyValueStore};
pub use lifecycle::{LifecycleState, StorageManager, StorageSnapshot, select_adapter};
pub use platform::Platform;
pub use traits::{KeyValueStore, TodoAdapter};
