//! Test fixtures and constants.

/// Service name used by most tests.
pub const SERVICE: &str = "myapp";

/// Standard secrets used across multiple tests.
pub const STANDARD_SECRETS: &[(&str, &[u8])] = &[
    ("database-url", b"postgres://localhost/mydb"),
    ("api-key", b"sk-test-12345"),
    ("jwt-secret", b"super-secret-jwt-token"),
];

/// Value that would break a naive text channel: NUL, high bytes, newlines.
pub const BINARY_SECRET: &[u8] = &[0x00, 0xFF, b'\n', 0x7F, b'\r', b'\n', 0x00];

/// Identities whose naive joins collide or escape a directory.
pub const AWKWARD_IDENTITIES: &[(&str, &str)] = &[
    ("a/b", "c"),
    ("a", "b/c"),
    ("../..", "../etc/passwd"),
    ("spaces in service", "key with spaces"),
    ("ünïcödé", "鍵"),
    ("quote'\"", "semi;colon|pipe"),
];

/// Large value spanning many pipe buffers once encoded.
pub fn large_secret() -> Vec<u8> {
    (0..256 * 1024).map(|i| (i % 251) as u8).collect()
}
