//! Error types for vault operations.
//!
//! `Error` is the closed set of outcomes every backend and the facade
//! report: absence, bad caller input, or a backend failure with context.
//! `ConfigError` only occurs while constructing a [`Vault`](crate::Vault).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Longest diagnostic kept from a tool's standard error.
const MAX_DIAGNOSTIC_LEN: usize = 512;

/// Outcome of a failed `set`, `get` or `delete`.
#[derive(Error, Debug)]
pub enum Error {
    /// The identity has no stored value.
    #[error("vault: key not found")]
    NotFound,

    #[error("vault: {0}")]
    InvalidInput(#[from] InvalidInput),

    #[error("vault: {0}")]
    Backend(#[from] BackendError),
}

impl Error {
    /// True when the backend positively reported absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// True when the caller's arguments were rejected before dispatch.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Caller-supplied input rejected by the facade.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("invalid key: service is empty")]
    EmptyService,

    #[error("invalid key: key is empty")]
    EmptyKey,

    #[error("invalid value: value is empty")]
    EmptyValue,
}

/// Failures raised by a storage backend.
///
/// Messages carry the tool, path or diagnostic output needed to act on the
/// failure. They never contain the secret value.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{tool} is not installed or not on PATH")]
    ToolMissing { tool: String },

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} did not finish within {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    #[error("failed to {action} key with {tool} ({status}): {stderr}")]
    Command {
        tool: String,
        action: &'static str,
        status: String,
        stderr: String,
    },

    #[error("failed to {action} secret at {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode stored value: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("storage directory unavailable: {0}")]
    StorageDir(String),

    #[error("browser storage: {0}")]
    Browser(String),
}

impl BackendError {
    /// Build a `Command` failure from captured stderr.
    ///
    /// Whitespace is trimmed and the text is cut at `MAX_DIAGNOSTIC_LEN`
    /// characters so a runaway tool cannot flood logs.
    pub fn command(
        tool: &str,
        action: &'static str,
        status: Option<i32>,
        stderr: &[u8],
    ) -> Self {
        let status = match status {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        };
        Self::Command {
            tool: tool.to_string(),
            action,
            status,
            stderr: diagnostic(stderr),
        }
    }
}

fn diagnostic(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "no diagnostic output".to_string();
    }
    if trimmed.chars().count() <= MAX_DIAGNOSTIC_LEN {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_DIAGNOSTIC_LEN).collect();
    cut.push_str("...");
    cut
}

/// Failures while building a vault from configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown backend '{0}' (expected auto, keychain, secret-service, credential-manager, file or memory)")]
    UnknownBackend(String),

    #[error("invalid timeout '{0}': expected a positive number of milliseconds")]
    InvalidTimeout(String),

    #[error("backend {backend} requires {tool}, which was not found")]
    ToolUnavailable { backend: &'static str, tool: &'static str },

    #[error("no synchronous backend for platform {0}")]
    Unsupported(&'static str),

    #[error("unable to determine a storage directory: {0}")]
    NoStorageDir(String),
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, Error>;
