//! Secret storage backends.
//!
//! Every platform primitive is wrapped in a type implementing [`Backend`],
//! and [`select`] picks one for the host.
//!
//! ## Adding a New Storage Backend
//!
//! 1. Implement the `Backend` trait
//! 2. Add the implementation in a new file (e.g., `pass.rs`, `kwallet.rs`)
//! 3. Teach `backend::select` when to choose it
//!
//! ## Example
//!
//! ```ignore
//! struct Pass { /* ... */ }
//!
//! impl Backend for Pass {
//!     fn name(&self) -> &'static str { "pass" }
//!     fn store(&self, id: &Identity<'_>, value: &[u8]) -> Result<()> {
//!         // Insert or replace
//!     }
//!     fn retrieve(&self, id: &Identity<'_>) -> Result<Vec<u8>> {
//!         // Error::NotFound when absent
//!     }
//!     fn remove(&self, id: &Identity<'_>) -> Result<()> {
//!         // Error::NotFound when absent
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::core::domain::Identity;
use crate::error::Result;

mod backend;
mod credential_manager;
mod fs;
mod keychain;
mod memory;
mod secret_service;

#[cfg(target_arch = "wasm32")]
pub mod indexeddb;

pub use backend::{build, select, Selection};
pub use credential_manager::CredentialManager;
pub use fs::Filesystem;
pub use keychain::Keychain;
pub use memory::Memory;
pub use secret_service::SecretService;

/// Storage contract shared by every backend.
///
/// Callers pass identities and values that already passed validation, so
/// implementations never see an empty service, key or value.
pub trait Backend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Insert or replace the value for `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Backend` if the underlying store rejects the write.
    fn store(&self, id: &Identity<'_>, value: &[u8]) -> Result<()>;

    /// Read the value for `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` when the store reports absence, otherwise
    /// `Error::Backend`.
    fn retrieve(&self, id: &Identity<'_>) -> Result<Vec<u8>>;

    /// Delete the value for `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if nothing was stored, otherwise
    /// `Error::Backend`.
    fn remove(&self, id: &Identity<'_>) -> Result<()>;
}

impl<T: Backend + ?Sized> Backend for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn store(&self, id: &Identity<'_>, value: &[u8]) -> Result<()> {
        (**self).store(id, value)
    }

    fn retrieve(&self, id: &Identity<'_>) -> Result<Vec<u8>> {
        (**self).retrieve(id)
    }

    fn remove(&self, id: &Identity<'_>) -> Result<()> {
        (**self).remove(id)
    }
}

impl<T: Backend + ?Sized> Backend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn store(&self, id: &Identity<'_>, value: &[u8]) -> Result<()> {
        (**self).store(id, value)
    }

    fn retrieve(&self, id: &Identity<'_>) -> Result<Vec<u8>> {
        (**self).retrieve(id)
    }

    fn remove(&self, id: &Identity<'_>) -> Result<()> {
        (**self).remove(id)
    }
}
