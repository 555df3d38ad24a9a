//! Key-value store persisted as a JSON object on disk.

use crate::storage::lock::acquire_lock;
use crate::storage::traits::KeyValueStore;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A [`KeyValueStore`] backed by a single JSON file.
///
/// The file holds one object mapping keys to string values. It is read on
/// every access and rewritten through a temporary file and a rename, so a
/// crash mid-write leaves the previous contents intact. A missing file
/// reads as an empty store.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Creates a store at `path`. The file is created on the first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(Error::OperationFailed {
                    operation: "read_kv_file".to_string(),
                    cause: format!("{}: {e}", self.path.display()),
                });
            },
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_kv_file".to_string(),
            cause: format!("{}: {e}", self.path.display()),
        })
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_kv_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }

        let json = serde_json::to_string_pretty(items)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| Error::OperationFailed {
            operation: "write_kv_file".to_string(),
            cause: format!("{}: {e}", tmp.display()),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| Error::OperationFailed {
            operation: "replace_kv_file".to_string(),
            cause: format!("{}: {e}", self.path.display()),
        })
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = acquire_lock(&self.write_lock);
        let mut items = self.read_all()?;
        f(&mut items);
        self.write_all(&items)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.modify(|items| {
            items.remove(key);
        })
    }
}
