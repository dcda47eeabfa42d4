//! In-memory backend.
//!
//! Holds secrets in a process-local map. Useful for tests and for hosts that
//! only need secrets for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;
use zeroize::Zeroizing;

use super::Backend;
use crate::core::domain::Identity;
use crate::error::{Error, Result};

type Entries = HashMap<(String, String), Zeroizing<Vec<u8>>>;

/// Process-local secret map.
#[derive(Default)]
pub struct Memory {
    entries: Mutex<Entries>,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory").field("entries", &self.len()).finish()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written entry.
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(id: &Identity<'_>) -> (String, String) {
        (id.service().to_string(), id.key().to_string())
    }
}

impl Backend for Memory {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn store(&self, id: &Identity<'_>, value: &[u8]) -> Result<()> {
        trace!(service = id.service(), key = id.key(), len = value.len(), "memory store");
        self.lock()
            .insert(Self::slot(id), Zeroizing::new(value.to_vec()));
        Ok(())
    }

    fn retrieve(&self, id: &Identity<'_>) -> Result<Vec<u8>> {
        self.lock()
            .get(&Self::slot(id))
            .map(|value| value.to_vec())
            .ok_or(Error::NotFound)
    }

    fn remove(&self, id: &Identity<'_>) -> Result<()> {
        self.lock()
            .remove(&Self::slot(id))
            .map(drop)
            .ok_or(Error::NotFound)
    }
}
