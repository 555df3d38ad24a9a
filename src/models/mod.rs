//! Data models for todokit.
//!
//! The todo record and its field contract are shared by every backend.

mod domain;
mod events;
mod timestamp;
mod todo;

pub use domain::{Priority, SyncStatus};
pub use events::{EventMeta, TodoEvent};
pub use timestamp::Timestamp;
pub use todo::{NewTodo, Todo, TodoId, TodoPatch};
