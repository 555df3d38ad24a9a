//! Configuration management.
//!
//! Settings come from a TOML file, then environment variables override
//! individual values:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `TODOKIT_DATA_DIR` | `data_dir` |
//! | `TODOKIT_PLATFORM` | `platform` (`web` or `native`) |
//! | `TODOKIT_LOG`, `TODOKIT_LOG_FORMAT`, `TODOKIT_LOG_FILE` | `[logging]` |

use crate::storage::Platform;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default `SQLite` database file name.
pub const DEFAULT_SQLITE_FILE: &str = "todos.db";
/// Default file backing the key-value store.
pub const DEFAULT_KV_FILE: &str = "local_storage.json";
/// Default key holding the serialized record set.
pub const DEFAULT_STORAGE_KEY: &str = "todos_db";

/// Main configuration for todokit.
#[derive(Debug, Clone)]
pub struct TodokitConfig {
    /// Directory holding the database and key-value files.
    pub data_dir: PathBuf,
    /// Forced platform; detected from the build target when `None`.
    pub platform: Option<Platform>,
    /// `SQLite` file name inside `data_dir`.
    pub sqlite_file: String,
    /// Key-value file name inside `data_dir`.
    pub kv_file: String,
    /// Key under which the web backend stores its blob.
    pub storage_key: String,
    /// Logging settings.
    pub logging: Option<LoggingSettings>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Platform override.
    pub platform: Option<String>,
    /// Storage section.
    pub storage: Option<ConfigFileStorage>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Storage section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStorage {
    /// `SQLite` file name.
    pub sqlite_file: Option<String>,
    /// Key-value file name.
    pub kv_file: Option<String>,
    /// Blob key.
    pub storage_key: Option<String>,
}

/// Logging section in config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directives.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<PathBuf>,
}

impl Default for TodokitConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            platform: None,
            sqlite_file: DEFAULT_SQLITE_FILE.to_string(),
            kv_file: DEFAULT_KV_FILE.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            logging: None,
        }
    }
}

impl TodokitConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or names an unknown
    /// platform.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/todokit/`. Returns
    /// defaults if no readable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("todokit").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("todokit")
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|path| path.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file"),
            }
        }

        Self::default()
    }

    /// Applies `TODOKIT_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if `TODOKIT_PLATFORM` names an unknown platform.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(dir) = non_empty_env("TODOKIT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(platform) = non_empty_env("TODOKIT_PLATFORM") {
            self.platform = Some(platform.parse()?);
        }
        Ok(self)
    }

    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(platform) = file.platform {
            config.platform = Some(platform.parse()?);
        }
        if let Some(storage) = file.storage {
            if let Some(v) = storage.sqlite_file {
                config.sqlite_file = v;
            }
            if let Some(v) = storage.kv_file {
                config.kv_file = v;
            }
            if let Some(v) = storage.storage_key {
                config.storage_key = v;
            }
        }
        config.logging = file.logging;

        Ok(config)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Forces a platform.
    #[must_use]
    pub const fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// The platform to select a backend for.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::detect)
    }

    /// Full path of the `SQLite` database.
    #[must_use]
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join(&self.sqlite_file)
    }

    /// Full path of the key-value file.
    #[must_use]
    pub fn kv_path(&self) -> PathBuf {
        self.data_dir.join(&self.kv_file)
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "todokit")
        .map_or_else(|| PathBuf::from(".todokit"), |dirs| dirs.data_dir().to_path_buf())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TodokitConfig::default();
        assert_eq!(config.sqlite_file, "todos.db");
        assert_eq!(config.kv_file, "local_storage.json");
        assert_eq!(config.storage_key, "todos_db");
        assert!(config.platform.is_none());
        assert!(config.sqlite_path().ends_with("todos.db"));
    }

    #[test]
    fn test_from_toml() {
        let config = TodokitConfig::from_toml(
            r#"
            data_dir = "/var/lib/todokit"
            platform = "web"

            [storage]
            kv_file = "browser.json"
            storage_key = "my_todos"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/todokit"));
        assert_eq!(config.platform, Some(Platform::Web));
        assert_eq!(config.platform(), Platform::Web);
        assert_eq!(config.kv_path(), PathBuf::from("/var/lib/todokit/browser.json"));
        assert_eq!(config.storage_key, "my_todos");
        assert_eq!(config.sqlite_file, DEFAULT_SQLITE_FILE);
        let logging = config.logging.unwrap();
        assert_eq!(logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_unknown_platform_is_rejected() {
        let err = TodokitConfig::from_toml(r#"platform = "toaster""#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let err = TodokitConfig::from_toml("data_dir = ").unwrap_err();
        assert!(err.to_string().contains("parse_config_file"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = TodokitConfig::load_from_file(Path::new("/nonexistent/todokit.toml")).unwrap_err();
        assert!(err.to_string().contains("read_config_file"));
    }
}
