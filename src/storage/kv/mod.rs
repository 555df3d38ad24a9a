//! [`KeyValueStore`](crate::storage::KeyValueStore) implementations.

mod file;
mod memory;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
