//! Core library components.
//!
//! Validation, transport encoding, platform detection, backend selection
//! and the storage backends themselves.

pub mod config;
pub mod constants;
pub mod domain;
pub mod encoding;
pub mod platform;
pub mod process;
pub mod store;
pub mod validation;
pub mod vault;
