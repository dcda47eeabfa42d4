//! Vault configuration.
//!
//! Settings come from an optional TOML file named by `VAULT_CONFIG`, then
//! individual environment variables override single fields:
//!
//! ```toml
//! backend = "secret-service"   # auto | keychain | secret-service | credential-manager | file | memory
//! storage_dir = "/var/lib/myapp/secrets"
//! timeout_ms = 5000
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::constants;
use crate::error::ConfigError;

/// Concrete storage mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// macOS Keychain via `security`
    Keychain,
    /// Secret Service daemon via `secret-tool`
    SecretService,
    /// Windows Credential Manager via PowerShell
    CredentialManager,
    /// base64 files in an owner-only directory
    File,
    /// Process-local map, lost on exit
    Memory,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keychain => "keychain",
            Self::SecretService => "secret-service",
            Self::CredentialManager => "credential-manager",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }

    /// Executable this backend drives, if any.
    pub fn tool(&self) -> Option<&'static str> {
        match self {
            Self::Keychain => Some(constants::SECURITY_TOOL),
            Self::SecretService => Some(constants::SECRET_TOOL),
            Self::CredentialManager => Some(constants::POWERSHELL_TOOL),
            Self::File | Self::Memory => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackendPreference {
    /// Platform default, falling back to files when its tool is missing
    #[default]
    Auto,
    Explicit(BackendKind),
}

impl TryFrom<String> for BackendPreference {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackendPreference> for String {
    fn from(value: BackendPreference) -> Self {
        match value {
            BackendPreference::Auto => "auto".to_string(),
            BackendPreference::Explicit(kind) => kind.name().to_string(),
        }
    }
}

impl FromStr for BackendPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => return Ok(Self::Auto),
            "keychain" => BackendKind::Keychain,
            "secret-service" | "keyring" => BackendKind::SecretService,
            "credential-manager" => BackendKind::CredentialManager,
            "file" => BackendKind::File,
            "memory" => BackendKind::Memory,
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };
        Ok(Self::Explicit(kind))
    }
}

/// Vault settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: BackendPreference,
    /// Directory for the file backend; platform default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
    /// Bound on each external tool call
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            storage_dir: None,
            timeout_ms: constants::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` or `ConfigError::Parse`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading vault config");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file or any variable is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Settings from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file or any variable is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(constants::ENV_CONFIG) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path))?,
            _ => Self::default(),
        };

        if let Some(backend) = lookup(constants::ENV_BACKEND) {
            config.backend = backend.parse()?;
        }
        if let Some(dir) = lookup(constants::ENV_DIR) {
            if !dir.is_empty() {
                config.storage_dir = Some(PathBuf::from(dir));
            }
        }
        if let Some(raw) = lookup(constants::ENV_TIMEOUT_MS) {
            config.timeout_ms = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
        }

        config.validate()?;
        debug!(
            backend = ?config.backend,
            storage_dir = ?config.storage_dir,
            timeout_ms = config.timeout_ms,
            "vault config resolved"
        );
        Ok(config)
    }

    /// Use `backend` regardless of platform.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = BackendPreference::Explicit(backend);
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(self.timeout_ms.to_string()));
        }
        Ok(())
    }
}
