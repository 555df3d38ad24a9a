//! Flat key-value store trait.

use crate::Result;

/// A flat, origin-scoped string store in the shape of browser
/// `localStorage`.
///
/// Calls are synchronous; each `set_item` replaces the whole value.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value. A missing key is `Ok(None)`.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a key. Removing a missing key is a no-op.
    fn remove_item(&self, key: &str) -> Result<()>;
}
