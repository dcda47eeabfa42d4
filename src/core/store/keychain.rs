//! macOS Keychain backend.
//!
//! Drives the `security` command-line tool, which talks to the login
//! Keychain without linking Security.framework. Values are stored as the
//! base64 transport encoding in a generic-password item whose account is
//! the key and whose service is the identity's service.
//!
//! `security` only accepts the password as the `-w` argument; without one
//! it prompts on the terminal rather than reading a pipe. While a write
//! runs, the encoded value is therefore visible to other local processes
//! through the process table. Only the base64 form is ever passed, and it
//! stays out of logs and `Debug` output.

use std::sync::Arc;

use tracing::{debug, error};
use zeroize::Zeroizing;

use super::Backend;
use crate::core::constants::SECURITY_TOOL;
use crate::core::domain::Identity;
use crate::core::encoding;
use crate::core::process::{CommandOutput, CommandRunner, ToolCommand};
use crate::error::{BackendError, Error, Result};

/// Diagnostics `security` prints when an item does not exist.
const NOT_FOUND_SIGNALS: &[&str] = &["could not be found", "SecKeychainSearchCopyNext"];

/// Keychain backend using `security`
pub struct Keychain {
    runner: Arc<dyn CommandRunner>,
}

impl Keychain {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn run(&self, command: ToolCommand) -> Result<CommandOutput> {
        Ok(self.runner.run(&command)?)
    }

    fn is_absent(output: &CommandOutput) -> bool {
        output.stderr_contains_any(NOT_FOUND_SIGNALS)
    }

    fn item_args(subcommand: &str, id: &Identity<'_>) -> ToolCommand {
        ToolCommand::new(SECURITY_TOOL)
            .arg(subcommand)
            .args(["-a", id.key()])
            .args(["-s", id.service()])
    }
}

impl Backend for Keychain {
    fn name(&self) -> &'static str {
        "keychain"
    }

    fn store(&self, id: &Identity<'_>, value: &[u8]) -> Result<()> {
        debug!(service = id.service(), key = id.key(), "storing secret in Keychain");
        let encoded = Zeroizing::new(encoding::encode(value));

        // -U updates an existing item in place
        let output = self.run(
            Self::item_args("add-generic-password", id)
                .arg("-l")
                .arg(id.label())
                .args(["-w", encoded.as_str()])
                .arg("-U"),
        )?;
        if !output.success() {
            error!(service = id.service(), key = id.key(), "Keychain rejected write");
            return Err(
                BackendError::command(SECURITY_TOOL, "set", output.status, &output.stderr).into(),
            );
        }
        Ok(())
    }

    fn retrieve(&self, id: &Identity<'_>) -> Result<Vec<u8>> {
        let output = self.run(Self::item_args("find-generic-password", id).arg("-w"))?;
        if !output.success() {
            if Self::is_absent(&output) {
                debug!(service = id.service(), key = id.key(), "secret not in Keychain");
                return Err(Error::NotFound);
            }
            return Err(
                BackendError::command(SECURITY_TOOL, "get", output.status, &output.stderr).into(),
            );
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let value = encoding::decode(&text).map_err(BackendError::from)?;
        Ok(value)
    }

    fn remove(&self, id: &Identity<'_>) -> Result<()> {
        let output = self.run(Self::item_args("delete-generic-password", id))?;
        if output.success() {
            debug!(service = id.service(), key = id.key(), "deleted secret from Keychain");
            return Ok(());
        }
        if Self::is_absent(&output) {
            return Err(Error::NotFound);
        }
        Err(BackendError::command(SECURITY_TOOL, "delete", output.status, &output.stderr).into())
    }
}
