//! Secret identity.
//!
//! Names a secret by the application namespace it belongs to and the key
//! within that namespace.

use std::fmt;

use crate::core::encoding;

/// The `(service, key)` pair naming a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity<'a> {
    service: &'a str,
    key: &'a str,
}

impl<'a> Identity<'a> {
    /// Create an identity. Validation happens in the facade.
    pub fn new(service: &'a str, key: &'a str) -> Self {
        Self { service, key }
    }

    /// Namespace shared by one application's secrets
    pub fn service(&self) -> &'a str {
        self.service
    }

    /// Key within the service
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// Human-readable `service/key` label for vault entry descriptions.
    ///
    /// Not unique: `("a/b", "c")` and `("a", "b/c")` share a label.
    pub fn label(&self) -> String {
        format!("{}/{}", self.service, self.key)
    }

    /// Single-string name for stores keyed by one target string.
    ///
    /// Reads as `service/key`, with `%` and `/` escaped in the service so the
    /// first `/` always ends it.
    pub fn target(&self) -> String {
        let mut target = String::with_capacity(self.service.len() + self.key.len() + 1);
        for c in self.service.chars() {
            match c {
                '%' => target.push_str("%25"),
                '/' => target.push_str("%2F"),
                c => target.push(c),
            }
        }
        target.push('/');
        target.push_str(self.key);
        target
    }

    /// File name for this identity in the file backend.
    pub fn file_name(&self) -> String {
        encoding::file_name(self.service, self.key)
    }
}

impl fmt::Display for Identity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.key)
    }
}
