//! The primary interface for secret storage.
//!
//! A [`Vault`] binds one backend for its whole life. Every call validates
//! its arguments before the backend sees them, so backends never receive
//! an empty service, key or value.

use std::sync::Arc;

use tracing::debug;

use crate::core::config::Config;
use crate::core::domain::Identity;
use crate::core::platform::Platform;
use crate::core::process::{CommandRunner, SystemProbe, SystemRunner, ToolProbe};
use crate::core::store::{self, Backend, Selection};
use crate::core::validation::{validate_identity, validate_value};
use crate::error::{ConfigError, Result};

/// Handle to the platform's secret store.
///
/// Cheap to clone; clones share the same backend. Safe to use from many
/// threads at once. Concurrent writes to the same `(service, key)` resolve
/// last-writer-wins.
#[derive(Clone)]
pub struct Vault {
    backend: Arc<dyn Backend>,
    selection: Option<Selection>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("backend", &self.backend.name())
            .field("selection", &self.selection)
            .finish()
    }
}

impl Vault {
    /// Open the vault for this host.
    ///
    /// Detects the platform, probes `PATH` for the vault tool and builds the
    /// backend once. External tools are bounded by `config.timeout()`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicitly requested backend is
    /// unavailable, the platform needs [`BrowserVault`](crate::BrowserVault),
    /// or no storage directory can be found.
    pub fn open(config: &Config) -> std::result::Result<Self, ConfigError> {
        let runner = Arc::new(SystemRunner::new(config.timeout()));
        Self::with_parts(Platform::current(), config, &SystemProbe, runner)
    }

    /// Open the vault using settings from the environment.
    ///
    /// See [`Config::from_env`] for the variables consulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the settings are invalid or the vault cannot
    /// be opened.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let config = Config::from_env()?;
        Self::open(&config)
    }

    /// Open the vault with every host dependency supplied by the caller.
    ///
    /// # Errors
    ///
    /// Same as [`Vault::open`].
    pub fn with_parts(
        platform: Platform,
        config: &Config,
        probe: &dyn ToolProbe,
        runner: Arc<dyn CommandRunner>,
    ) -> std::result::Result<Self, ConfigError> {
        let selection = store::select(platform, config.backend, probe)?;
        let backend = store::build(&selection, config, runner)?;
        Ok(Self {
            backend,
            selection: Some(selection),
        })
    }

    /// Wrap an existing backend, skipping selection.
    pub fn with_backend(backend: impl Backend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            selection: None,
        }
    }

    /// Name of the backend serving this vault.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// How the backend was chosen, or `None` for [`Vault::with_backend`].
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Store `value` under `(service, key)`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if any argument is empty, or
    /// `Error::Backend` if the store rejects the write.
    pub fn set(&self, service: &str, key: &str, value: &[u8]) -> Result<()> {
        validate_identity(service, key)?;
        validate_value(value)?;
        self.backend.store(&Identity::new(service, key), value)?;
        debug!(
            backend = self.backend.name(),
            service,
            key,
            len = value.len(),
            "secret stored"
        );
        Ok(())
    }

    /// Fetch the value stored under `(service, key)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if an argument is empty,
    /// `Error::NotFound` if nothing is stored, or `Error::Backend`.
    pub fn get(&self, service: &str, key: &str) -> Result<Vec<u8>> {
        validate_identity(service, key)?;
        debug!(backend = self.backend.name(), service, key, "fetching secret");
        self.backend.retrieve(&Identity::new(service, key))
    }

    /// Delete the value stored under `(service, key)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if an argument is empty,
    /// `Error::NotFound` if nothing is stored, or `Error::Backend`.
    pub fn delete(&self, service: &str, key: &str) -> Result<()> {
        validate_identity(service, key)?;
        self.backend.remove(&Identity::new(service, key))?;
        debug!(backend = self.backend.name(), service, key, "secret deleted");
        Ok(())
    }
}
