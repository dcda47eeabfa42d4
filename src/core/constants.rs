//! Constants used throughout the vault.
//!
//! Centralizes tool names, environment variables and storage locations.

/// Directory name used by the file backend and the browser database name.
pub const STORAGE_DIR_NAME: &str = "vault-secrets";

/// Hidden directory used on Android when `ANDROID_DATA` is unset.
pub const ANDROID_FALLBACK_DIR: &str = ".vault-secrets";

/// IndexedDB object store holding secret records.
pub const BROWSER_STORE_NAME: &str = "secrets";

/// Default bound on a single external tool invocation, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// macOS Keychain command-line tool.
pub const SECURITY_TOOL: &str = "security";

/// libsecret command-line tool for the Secret Service API.
pub const SECRET_TOOL: &str = "secret-tool";

/// Windows shell used to reach the Credential Manager.
pub const POWERSHELL_TOOL: &str = "powershell";

/// Path to a TOML config file.
pub const ENV_CONFIG: &str = "VAULT_CONFIG";

/// Backend override (`auto`, `keychain`, `secret-service`, ...).
pub const ENV_BACKEND: &str = "VAULT_BACKEND";

/// Storage directory override for the file backend.
pub const ENV_DIR: &str = "VAULT_DIR";

/// Timeout override for external tools, in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "VAULT_TIMEOUT_MS";

/// Base directory provided to Android apps.
pub const ENV_ANDROID_DATA: &str = "ANDROID_DATA";
