//! Host platform detection.
//!
//! Detection happens at runtime so the backend choice can be injected and
//! exercised in tests on any host.

use std::fmt;
use std::path::PathBuf;

use crate::core::constants;
use crate::error::ConfigError;

/// Platforms with a distinct storage strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Ios,
    Linux,
    Android,
    Windows,
    /// wasm32 in a browser or worker
    Browser,
    /// Any other Unix-like host (BSDs, illumos, ...)
    Other,
}

impl Platform {
    /// Detect the platform this process runs on.
    pub fn current() -> Self {
        if cfg!(target_arch = "wasm32") {
            return Self::Browser;
        }
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to a platform.
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => Self::MacOs,
            "ios" => Self::Ios,
            "linux" => Self::Linux,
            "android" => Self::Android,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }

    /// Display name for log and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::MacOs => "macos",
            Self::Ios => "ios",
            Self::Linux => "linux",
            Self::Android => "android",
            Self::Windows => "windows",
            Self::Browser => "browser",
            Self::Other => "other",
        }
    }

    /// Default directory for the file backend on this platform.
    ///
    /// - iOS: `~/Library/Application Support/vault-secrets`
    /// - Android: `$ANDROID_DATA/vault-secrets`, else `./.vault-secrets`
    /// - elsewhere: the user data directory (`$XDG_DATA_HOME` on Linux)
    ///   joined with `vault-secrets`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoStorageDir` if no base directory is known.
    pub fn default_storage_dir(&self) -> Result<PathBuf, ConfigError> {
        match self {
            Self::Ios => dirs::home_dir()
                .map(|home| {
                    home.join("Library")
                        .join("Application Support")
                        .join(constants::STORAGE_DIR_NAME)
                })
                .ok_or_else(|| ConfigError::NoStorageDir("home directory unknown".to_string())),
            Self::Android => match std::env::var_os(constants::ENV_ANDROID_DATA) {
                Some(base) if !base.is_empty() => {
                    Ok(PathBuf::from(base).join(constants::STORAGE_DIR_NAME))
                }
                _ => std::env::current_dir()
                    .map(|cwd| cwd.join(constants::ANDROID_FALLBACK_DIR))
                    .map_err(|e| ConfigError::NoStorageDir(e.to_string())),
            },
            Self::Browser => Err(ConfigError::NoStorageDir(
                "browsers have no filesystem".to_string(),
            )),
            _ => dirs::data_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
                .map(|base| base.join(constants::STORAGE_DIR_NAME))
                .ok_or_else(|| ConfigError::NoStorageDir("data directory unknown".to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
