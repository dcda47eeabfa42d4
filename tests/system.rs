//! Tests against the host's real secret store.
//!
//! These touch the user's Keychain, Secret Service or Credential Manager,
//! so they only run when `VAULT_TEST_SYSTEM` is set. Each test uses a
//! unique service name and cleans up after itself.

#![cfg(not(target_arch = "wasm32"))]

mod support;

use platform_vault::{Config, Vault};
use support::*;

fn unique_service() -> String {
    format!("platform-vault-test-{}", uuid::Uuid::new_v4())
}

#[test]
fn test_system_vault_round_trip() {
    skip_without_system_vault!();
    init_tracing();

    let vault = Vault::from_env().expect("failed to open system vault");
    eprintln!("using backend: {}", vault.backend_name());
    let service = unique_service();

    vault.set(&service, "api-key", b"super-secret").unwrap();
    assert_eq!(vault.get(&service, "api-key").unwrap(), b"super-secret");

    vault.set(&service, "api-key", BINARY_SECRET).unwrap();
    assert_eq!(vault.get(&service, "api-key").unwrap(), BINARY_SECRET);

    vault.delete(&service, "api-key").unwrap();
    assert_not_found(vault.get(&service, "api-key"));
    assert_not_found(vault.delete(&service, "api-key"));
}

#[test]
fn test_system_vault_missing_key() {
    skip_without_system_vault!();
    init_tracing();

    let vault = Vault::open(&Config::default()).expect("failed to open system vault");
    assert_not_found(vault.get(&unique_service(), "never-set"));
}
