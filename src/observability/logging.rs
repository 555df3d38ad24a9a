//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Filter used when neither config nor environment sets one.
const DEFAULT_FILTER: &str = "warn";
/// Filter used with `--verbose`.
const VERBOSE_FILTER: &str = "info,todokit=debug";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to `Pretty`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive string.
    pub filter: String,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_FILTER.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// Precedence for the filter: `TODOKIT_LOG`, `RUST_LOG`, `--verbose`,
    /// the config file, then the default.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let mut config = Self::default();

        if let Some(settings) = settings {
            if let Some(format) = &settings.format {
                config.format = LogFormat::parse(format);
            }
            if let Some(filter) = &settings.filter {
                config.filter.clone_from(filter);
            }
            config.file.clone_from(&settings.file);
        }

        if verbose {
            config.filter = VERBOSE_FILTER.to_string();
        }

        apply_env_overrides(&mut config);
        config
    }
}

fn apply_env_overrides(config: &mut LoggingConfig) {
    if let Some(filter) = non_empty_env("TODOKIT_LOG").or_else(|| non_empty_env("RUST_LOG")) {
        config.filter = filter;
    }
    if let Some(format) = non_empty_env("TODOKIT_LOG_FORMAT") {
        config.format = LogFormat::parse(&format);
    }
    if let Some(file) = non_empty_env("TODOKIT_LOG_FILE") {
        config.file = Some(PathBuf::from(file));
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
