//! Host platform detection.

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// The environment the storage layer runs in.
///
/// Decides which backend [`StorageManager`](super::StorageManager) builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Browser-like hosts with only a flat key-value store.
    Web,
    /// Hosts with a filesystem and an embedded SQL engine.
    Native,
}

impl Platform {
    /// Detects the platform from the build target.
    ///
    /// `wasm` targets are [`Platform::Web`]; everything else is native.
    #[must_use]
    pub const fn detect() -> Self {
        if cfg!(target_family = "wasm") {
            Self::Web
        } else {
            Self::Native
        }
    }

    /// Returns the platform name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Native => "native",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "native" | "ios" | "android" | "desktop" => Ok(Self::Native),
            other => Err(Error::InvalidInput(format!("unknown platform: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("web", Platform::Web)]
    #[test_case("WEB", Platform::Web)]
    #[test_case("native", Platform::Native)]
    #[test_case("ios", Platform::Native)]
    #[test_case(" android ", Platform::Native)]
    fn test_parse(input: &str, expected: Platform) {
        assert_eq!(input.parse::<Platform>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "toaster".parse::<Platform>().unwrap_err();
        assert!(err.to_string().contains("unknown platform"));
    }

    #[test]
    fn test_detect_on_host() {
        assert_eq!(Platform::detect(), Platform::Native);
        assert_eq!(Platform::detect().to_string(), "native");
    }
}
