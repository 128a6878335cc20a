//! # console-relay-shared
//!
//! Shared result types, error handling, and redaction helpers for the console-relay workspace.
//!
//! ## Design Principles
//!
//! 1. **No workspace dependencies** - This crate only depends on external crates
//! 2. **Serde-compatible** - Error envelopes travel through CLI JSON output unchanged

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod errors;
pub mod redaction;
pub mod result;

pub use errors::{ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata};
pub use redaction::{REDACTED, is_secret_key, redact_if_secret};
pub use result::Result;

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_result_type_is_available() {
        let value: Result<i32> = Err(ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad"));
        assert!(value.is_err());
        assert!(!shared_crate_version().is_empty());
    }
}
