//! Platform Vault - one API over every platform's secret store.
//!
//! Stores byte values under a `(service, key)` pair using the operating
//! system's native vault where one exists: the macOS Keychain, the Secret
//! Service on Linux desktops, the Windows Credential Manager and IndexedDB in
//! browsers. Mobile platforms and hosts without a vault tool get
//! owner-only files.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── error               # Error taxonomy
//! └── core/
//!     ├── config          # TOML file and VAULT_* overrides
//!     ├── constants       # Tool names, env vars, storage names
//!     ├── domain/         # Identity (service, key)
//!     ├── encoding        # base64 transport and file naming
//!     ├── platform        # Host detection and storage directories
//!     ├── process         # Tool runner with timeouts, PATH probe
//!     ├── validation      # Argument checks
//!     ├── vault           # Vault facade
//!     └── store/          # Storage backends
//!         ├── mod         # Backend trait
//!         ├── backend     # Selection and fallback
//!         ├── keychain    # macOS `security`
//!         ├── secret_service      # `secret-tool`
//!         ├── credential_manager  # PowerShell + CredWrite/CredRead
//!         ├── fs          # File-per-secret storage
//!         ├── memory      # Process-local map
//!         └── indexeddb   # Browser storage (wasm32)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use platform_vault::{Config, Vault};
//!
//! let vault = Vault::open(&Config::default())?;
//! vault.set("myapp", "api-key", b"super-secret")?;
//! assert_eq!(vault.get("myapp", "api-key")?, b"super-secret");
//! vault.delete("myapp", "api-key")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod error;

pub use crate::core::config::{BackendKind, BackendPreference, Config};
pub use crate::core::domain::Identity;
pub use crate::core::platform::Platform;
pub use crate::core::process::{
    CommandOutput, CommandRunner, SystemProbe, SystemRunner, ToolCommand, ToolProbe,
};
pub use crate::core::store::{Backend, Selection};
pub use crate::core::vault::Vault;
pub use crate::error::{BackendError, ConfigError, Error, InvalidInput, Result};

#[cfg(target_arch = "wasm32")]
pub use crate::core::store::indexeddb::{BrowserVault, IndexedDbStore};
