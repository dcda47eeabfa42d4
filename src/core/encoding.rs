//! Binary-to-text transport.
//!
//! Several backends move secrets through text channels (command arguments,
//! tool output, plain files). Values are carried as padded standard base64;
//! file names use unpadded URL-safe base64 so they never contain a path
//! separator.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::{DecodeError, Engine as _};

/// Separator between encoded identity parts in a file name.
///
/// `.` is outside the URL-safe alphabet, which keeps the mapping injective.
const FILE_NAME_SEPARATOR: char = '.';

/// Encode arbitrary bytes as text.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode text produced by [`encode`].
///
/// Surrounding whitespace added by the transport (trailing newlines from a
/// tool, an editor's final newline) is ignored.
///
/// # Errors
///
/// Returns `DecodeError` if the remaining text is not valid base64.
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(text.trim())
}

/// File name for the identity `(service, key)`.
///
/// Distinct identities always map to distinct names.
pub fn file_name(service: &str, key: &str) -> String {
    format!(
        "{}{}{}",
        URL_SAFE_NO_PAD.encode(service),
        FILE_NAME_SEPARATOR,
        URL_SAFE_NO_PAD.encode(key)
    )
}
