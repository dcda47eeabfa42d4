//! Logging tests.
//!
//! Runs vault operations under a trace-level subscriber and checks that the
//! events are useful and never contain secret values.

#![cfg(not(target_arch = "wasm32"))]

mod support;

use std::io;
use std::sync::{Arc, Mutex};

use platform_vault::Platform;
use support::*;
use tracing_subscriber::EnvFilter;

const SECRET: &[u8] = b"correct-horse-battery-staple";

/// Shared in-memory log sink.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

/// Run `f` with every event at trace level written into the returned text.
fn captured<F: FnOnce()>(f: F) -> String {
    let capture = Capture::default();
    let sink = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("trace"))
        .with_writer(move || sink.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    capture.text()
}

#[test]
fn test_logs_never_contain_secret() {
    let t = Test::new();
    let logs = captured(|| {
        let vaults = [
            t.file_vault(),
            t.platform_vault(Platform::MacOs, Arc::new(FakeTools::new())),
            t.platform_vault(Platform::Linux, Arc::new(FakeTools::new())),
            t.platform_vault(Platform::Windows, Arc::new(FakeTools::new())),
        ];
        for vault in &vaults {
            vault.set(SERVICE, "api-key", SECRET).unwrap();
            assert_eq!(vault.get(SERVICE, "api-key").unwrap(), SECRET);
            vault.delete(SERVICE, "api-key").unwrap();
        }
    });

    assert!(!logs.is_empty(), "expected trace output");
    assert_not_leaked(&logs, SECRET);
}

#[test]
fn test_fallback_is_logged_as_warning() {
    let t = Test::new();
    let logs = captured(|| {
        platform_vault::Vault::with_parts(
            Platform::Linux,
            &t.config(),
            &FakeProbe::none(),
            Arc::new(FakeTools::new()),
        )
        .unwrap();
    });

    assert!(logs.contains("WARN"), "missing warning in: {}", logs);
    assert!(logs.contains("falling back to file storage"));
    assert!(logs.contains("secret-tool"));
}

#[test]
fn test_operations_log_identity() {
    let t = Test::new();
    let logs = captured(|| {
        let vault = t.file_vault();
        vault.set(SERVICE, "api-key", SECRET).unwrap();
    });

    assert!(logs.contains("secret stored"));
    assert!(logs.contains("api-key"));
    assert!(logs.contains("backend=\"file\"") || logs.contains("backend=file"));
}
