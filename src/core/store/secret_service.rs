//! Secret Service backend.
//!
//! Uses `secret-tool` (libsecret) to reach whichever Secret Service daemon
//! the desktop runs: GNOME Keyring, KWallet, KeePassXC and so on. Items are
//! tagged with `service` and `key` attributes.
//!
//! Values pass through stdin and stdout as base64 like every other text
//! channel in this crate, so binary secrets with NUL bytes or trailing
//! newlines survive the round trip.

use std::sync::Arc;

use tracing::debug;
use zeroize::Zeroizing;

use super::Backend;
use crate::core::constants::SECRET_TOOL;
use crate::core::domain::Identity;
use crate::core::encoding;
use crate::core::process::{CommandOutput, CommandRunner, ToolCommand};
use crate::error::{BackendError, Error, Result};

/// Diagnostics that mean "no matching item" rather than a daemon failure.
const NOT_FOUND_SIGNALS: &[&str] = &["no such", "not found", "no matching"];

/// Secret Service backend using `secret-tool`
pub struct SecretService {
    runner: Arc<dyn CommandRunner>,
}

impl SecretService {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn command(subcommand: &str) -> ToolCommand {
        ToolCommand::new(SECRET_TOOL).arg(subcommand)
    }

    fn attributes(command: ToolCommand, id: &Identity<'_>) -> ToolCommand {
        command
            .args(["service", id.service()])
            .args(["key", id.key()])
    }

    /// Raw encoded text for `id`, or `NotFound`.
    ///
    /// `secret-tool lookup` reports a missing item by exiting non-zero with
    /// no output at all, or by exiting zero with empty output.
    fn lookup(&self, id: &Identity<'_>) -> Result<Zeroizing<Vec<u8>>> {
        let output = self
            .runner
            .run(&Self::attributes(Self::command("lookup"), id))?;

        if output.success() {
            if output.stdout.iter().all(u8::is_ascii_whitespace) {
                return Err(Error::NotFound);
            }
            return Ok(output.stdout);
        }
        if Self::is_absent(&output) {
            return Err(Error::NotFound);
        }
        Err(BackendError::command(SECRET_TOOL, "get", output.status, &output.stderr).into())
    }

    fn is_absent(output: &CommandOutput) -> bool {
        output.stdout.is_empty()
            && (output.stderr.iter().all(u8::is_ascii_whitespace)
                || output.stderr_contains_any(NOT_FOUND_SIGNALS))
    }
}

impl Backend for SecretService {
    fn name(&self) -> &'static str {
        "secret-service"
    }

    fn store(&self, id: &Identity<'_>, value: &[u8]) -> Result<()> {
        debug!(service = id.service(), key = id.key(), "storing secret in Secret Service");
        let encoded = Zeroizing::new(encoding::encode(value));

        // `store` replaces an item with identical attributes
        let command = Self::command("store").arg("--label").arg(id.label());
        let output = self
            .runner
            .run(&Self::attributes(command, id).stdin(encoded.as_bytes().to_vec()))?;
        if !output.success() {
            return Err(
                BackendError::command(SECRET_TOOL, "set", output.status, &output.stderr).into(),
            );
        }
        Ok(())
    }

    fn retrieve(&self, id: &Identity<'_>) -> Result<Vec<u8>> {
        let raw = self.lookup(id)?;
        let text = Zeroizing::new(String::from_utf8_lossy(&raw).into_owned());
        Ok(encoding::decode(&text).map_err(BackendError::from)?)
    }

    fn remove(&self, id: &Identity<'_>) -> Result<()> {
        // `clear` succeeds whether or not anything matched, so check first.
        self.lookup(id)?;

        let output = self
            .runner
            .run(&Self::attributes(Self::command("clear"), id))?;
        if !output.success() {
            return Err(
                BackendError::command(SECRET_TOOL, "delete", output.status, &output.stderr).into(),
            );
        }
        debug!(service = id.service(), key = id.key(), "cleared secret from Secret Service");
        Ok(())
    }
}
