//! Priority and sync status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Todo priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// The default.
    #[default]
    Medium,
    /// Needs attention first.
    High,
}

impl Priority {
    /// Returns all priority variants, lowest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High]
    }

    /// Returns the stored string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses a priority string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("unknown priority: {s}")))
    }
}

/// Cloud sync state of a record.
///
/// Reserved for a future sync feature; records are created as `Local` and
/// nothing in this crate transitions them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Only stored on this device.
    #[default]
    Local,
    /// Matches the remote copy.
    Synced,
    /// Local changes not yet pushed.
    Pending,
    /// The last sync attempt failed.
    Error,
}

impl SyncStatus {
    /// Returns the stored string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Synced => "synced",
            Self::Pending => "pending",
            Self::Error => "error",
        }
    }

    /// Parses a sync status string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "synced" => Some(Self::Synced),
            "pending" => Some(Self::Pending),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("low", Some(Priority::Low))]
    #[test_case("MEDIUM", Some(Priority::Medium))]
    #[test_case(" High ", Some(Priority::High))]
    #[test_case("urgent", None)]
    fn test_priority_parse(input: &str, expected: Option<Priority>) {
        assert_eq!(Priority::parse(input), expected);
    }

    #[test]
    fn test_priority_from_str_error() {
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert!(err.to_string().contains("unknown priority"));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(SyncStatus::default(), SyncStatus::Local);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let status: SyncStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, SyncStatus::Pending);
    }

    #[test]
    fn test_sync_status_roundtrip_strings() {
        for status in [
            SyncStatus::Local,
            SyncStatus::Synced,
            SyncStatus::Pending,
            SyncStatus::Error,
        ] {
            assert_eq!(SyncStatus::parse(status.as_str()), Some(status));
        }
    }
}
