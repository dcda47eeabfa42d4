//! Input validation for vault operations.
//!
//! Runs in the facade before any backend is touched, so backends may assume
//! non-empty identities and values.

use crate::error::InvalidInput;

/// Validate a secret identity.
///
/// # Errors
///
/// Returns `InvalidInput::EmptyService` or `InvalidInput::EmptyKey`.
pub fn validate_identity(service: &str, key: &str) -> Result<(), InvalidInput> {
    if service.is_empty() {
        return Err(InvalidInput::EmptyService);
    }
    if key.is_empty() {
        return Err(InvalidInput::EmptyKey);
    }
    Ok(())
}

/// Validate a value about to be stored.
///
/// # Errors
///
/// Returns `InvalidInput::EmptyValue` if the value is empty.
pub fn validate_value(value: &[u8]) -> Result<(), InvalidInput> {
    if value.is_empty() {
        return Err(InvalidInput::EmptyValue);
    }
    Ok(())
}
