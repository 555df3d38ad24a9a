//! Concrete [`TodoAdapter`](crate::storage::TodoAdapter) backends.
//!
//! | Backend | Platform | Store |
//! |---------|----------|-------|
//! | [`SqliteTodoAdapter`] | native | embedded `SQLite` with migrations |
//! | [`KeyValueTodoAdapter`] | web | one JSON blob in a [`KeyValueStore`](crate::storage::KeyValueStore) |

mod key_value;
mod sqlite;

pub use key_value::KeyValueTodoAdapter;
pub use sqlite::SqliteTodoAdapter;
