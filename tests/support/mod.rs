//! Test support utilities for vault integration tests.
//!
//! Provides isolated storage directories, fake vault tools and log capture.

#![allow(dead_code)]

pub mod assertions;
pub mod fakes;
pub mod fixtures;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fakes::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::PathBuf;
use std::sync::{Arc, Once};

use platform_vault::{BackendKind, Config, Platform, Vault};
use tempfile::TempDir;

static TRACING: Once = Once::new();

/// Install a test subscriber filtered by `VAULT_LOG` (e.g. `VAULT_LOG=debug`).
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_env("VAULT_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Test environment with an isolated storage directory.
///
/// No process-global state is mutated, so tests can run in parallel.
pub struct Test {
    pub dir: TempDir,
}

impl Test {
    pub fn new() -> Self {
        init_tracing();
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    /// Directory the file backend writes into (created lazily).
    pub fn storage_dir(&self) -> PathBuf {
        self.dir.path().join("vault-secrets")
    }

    /// Config pointing the file backend at this test's directory.
    pub fn config(&self) -> Config {
        Config::default().with_storage_dir(self.storage_dir())
    }

    /// Vault using the file backend.
    pub fn file_vault(&self) -> Vault {
        Vault::with_parts(
            Platform::Linux,
            &self.config().with_backend(BackendKind::File),
            &FakeProbe::none(),
            Arc::new(FakeTools::new()),
        )
        .expect("failed to open file vault")
    }

    /// Vault for `platform` with every vault tool present and emulated.
    pub fn platform_vault(&self, platform: Platform, tools: Arc<FakeTools>) -> Vault {
        Vault::with_parts(platform, &self.config(), &FakeProbe::all(), tools)
            .expect("failed to open platform vault")
    }
}

impl Default for Test {
    fn default() -> Self {
        Self::new()
    }
}
