//! Backend selection logic
//!
//! Decides which storage mechanism serves the process, based on the
//! platform, the configured preference and which vault tools are installed.
//! The decision is made once, when a [`Vault`](crate::Vault) is built, and
//! never revisited: values written through the fallback stay reachable for
//! the life of the handle even if the preferred tool appears later.

use std::sync::Arc;

use tracing::{info, warn};

use super::{Backend, CredentialManager, Filesystem, Keychain, Memory, SecretService};
use crate::core::config::{BackendKind, BackendPreference, Config};
use crate::core::platform::Platform;
use crate::core::process::{CommandRunner, ToolProbe};
use crate::error::ConfigError;

/// Outcome of backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub platform: Platform,
    pub kind: BackendKind,
    /// The platform's preferred tool was missing and files are used instead
    pub fell_back: bool,
}

/// Preferred backend for a platform when nothing is configured.
fn preferred(platform: Platform) -> Result<BackendKind, ConfigError> {
    match platform {
        Platform::MacOs => Ok(BackendKind::Keychain),
        Platform::Linux | Platform::Other => Ok(BackendKind::SecretService),
        Platform::Windows => Ok(BackendKind::CredentialManager),
        // The app sandbox is the protection boundary on mobile
        Platform::Ios | Platform::Android => Ok(BackendKind::File),
        Platform::Browser => Err(ConfigError::Unsupported(platform.name())),
    }
}

/// Choose a backend.
///
/// An explicit preference is honored as-is but its tool must exist. `Auto`
/// takes the platform default and falls back to files when the default's
/// tool is missing.
///
/// # Errors
///
/// Returns `ConfigError::ToolUnavailable` for an explicit CLI backend whose
/// tool is missing, or `ConfigError::Unsupported` on the browser, which is
/// served by the async `BrowserVault` instead.
pub fn select(
    platform: Platform,
    preference: BackendPreference,
    probe: &dyn ToolProbe,
) -> Result<Selection, ConfigError> {
    let (kind, explicit) = match preference {
        BackendPreference::Explicit(kind) => (kind, true),
        BackendPreference::Auto => (preferred(platform)?, false),
    };

    let tool = match kind.tool() {
        Some(tool) => tool,
        None => {
            info!(platform = %platform, backend = %kind, "selected storage backend");
            return Ok(Selection {
                platform,
                kind,
                fell_back: false,
            });
        }
    };

    if probe.is_available(tool) {
        info!(platform = %platform, backend = %kind, tool, "selected storage backend");
        return Ok(Selection {
            platform,
            kind,
            fell_back: false,
        });
    }

    if explicit {
        return Err(ConfigError::ToolUnavailable {
            backend: kind.name(),
            tool,
        });
    }

    warn!(
        platform = %platform,
        preferred = %kind,
        tool,
        "vault tool not found, falling back to file storage"
    );
    Ok(Selection {
        platform,
        kind: BackendKind::File,
        fell_back: true,
    })
}

/// Construct the backend named by `selection`.
///
/// # Errors
///
/// Returns `ConfigError::NoStorageDir` if the file backend is chosen and no
/// storage directory is configured or discoverable.
pub fn build(
    selection: &Selection,
    config: &Config,
    runner: Arc<dyn CommandRunner>,
) -> Result<Arc<dyn Backend>, ConfigError> {
    let backend: Arc<dyn Backend> = match selection.kind {
        BackendKind::Keychain => Arc::new(Keychain::new(runner)),
        BackendKind::SecretService => Arc::new(SecretService::new(runner)),
        BackendKind::CredentialManager => Arc::new(CredentialManager::new(runner)),
        BackendKind::Memory => Arc::new(Memory::new()),
        BackendKind::File => {
            let dir = match &config.storage_dir {
                Some(dir) => dir.clone(),
                None => selection.platform.default_storage_dir()?,
            };
            info!(dir = %dir.display(), "file storage directory");
            Arc::new(Filesystem::new(dir))
        }
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Installed(&'static [&'static str]);

    impl ToolProbe for Installed {
        fn is_available(&self, program: &str) -> bool {
            self.0.contains(&program)
        }
    }

    #[test]
    fn test_platform_defaults_with_tools() {
        let probe = Installed(&["security", "secret-tool", "powershell"]);
        let cases = [
            (Platform::MacOs, BackendKind::Keychain),
            (Platform::Linux, BackendKind::SecretService),
            (Platform::Other, BackendKind::SecretService),
            (Platform::Windows, BackendKind::CredentialManager),
            (Platform::Ios, BackendKind::File),
            (Platform::Android, BackendKind::File),
        ];
        for (platform, expected) in cases {
            let selection = select(platform, BackendPreference::Auto, &probe).unwrap();
            assert_eq!(selection.kind, expected, "{platform}");
            assert!(!selection.fell_back);
        }
    }

    #[test]
    fn test_fallback_when_tool_missing() {
        let probe = Installed(&[]);
        for platform in [Platform::MacOs, Platform::Linux, Platform::Windows] {
            let selection = select(platform, BackendPreference::Auto, &probe).unwrap();
            assert_eq!(selection.kind, BackendKind::File);
            assert!(selection.fell_back);
        }
    }

    #[test]
    fn test_explicit_backend_requires_tool() {
        let err = select(
            Platform::Linux,
            BackendPreference::Explicit(BackendKind::SecretService),
            &Installed(&[]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ToolUnavailable {
                tool: "secret-tool",
                ..
            }
        ));
    }

    #[test]
    fn test_explicit_backend_ignores_platform() {
        let selection = select(
            Platform::Windows,
            BackendPreference::Explicit(BackendKind::Memory),
            &Installed(&[]),
        )
        .unwrap();
        assert_eq!(selection.kind, BackendKind::Memory);
        assert!(!selection.fell_back);
    }

    #[test]
    fn test_browser_unsupported() {
        let err = select(Platform::Browser, BackendPreference::Auto, &Installed(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Unsupported("browser")));
    }

    #[test]
    fn test_build_file_uses_configured_dir() {
        struct NoRunner;
        impl CommandRunner for NoRunner {
            fn run(
                &self,
                _command: &crate::core::process::ToolCommand,
            ) -> Result<crate::core::process::CommandOutput, crate::error::BackendError> {
                unreachable!("file backend never runs tools")
            }
        }

        let selection = Selection {
            platform: Platform::Linux,
            kind: BackendKind::File,
            fell_back: true,
        };
        let config = Config::default().with_storage_dir("/tmp/vault-build-test");
        let backend = build(&selection, &config, Arc::new(NoRunner)).unwrap();
        assert_eq!(backend.name(), "file");
    }
}
