//! Test assertion helpers.

use platform_vault::{Error, InvalidInput};

/// Assert that a result is `Error::NotFound`.
#[track_caller]
pub fn assert_not_found<T: std::fmt::Debug>(result: Result<T, Error>) {
    match result {
        Err(Error::NotFound) => {}
        other => panic!("expected NotFound, got: {:?}", other),
    }
}

/// Assert that a result is the given `InvalidInput`.
#[track_caller]
pub fn assert_invalid<T: std::fmt::Debug>(result: Result<T, Error>, expected: InvalidInput) {
    match result {
        Err(Error::InvalidInput(found)) if found == expected => {}
        other => panic!("expected InvalidInput({:?}), got: {:?}", expected, other),
    }
}

/// Assert that a result is a backend failure.
#[track_caller]
pub fn assert_backend_failure<T: std::fmt::Debug>(result: Result<T, Error>) -> Error {
    match result {
        Err(err @ Error::Backend(_)) => err,
        other => panic!("expected backend failure, got: {:?}", other),
    }
}

/// Assert that neither the raw secret nor its transport encoding appears.
#[track_caller]
pub fn assert_not_leaked(text: &str, secret: &[u8]) {
    use base64::Engine as _;

    let raw = String::from_utf8_lossy(secret);
    let encoded = base64::engine::general_purpose::STANDARD.encode(secret);
    assert!(!text.contains(raw.as_ref()), "secret leaked: {}", text);
    assert!(!text.contains(&encoded), "encoded secret leaked: {}", text);
}
