//! Storage traits.

mod adapter;
mod key_value;

pub use adapter::TodoAdapter;
pub use key_value::KeyValueStore;
