//! # console-relay-domain
//!
//! Value objects for the console relay.
//!
//! - **Primitives** - `TraceId`, `UserId`
//! - **Levels** - `LogLevel`, `SystemTag`
//! - **Records** - `LogRecord` (outbound), `StoredLogEntry` and `TraceSummary` (read back)
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Re-export shared types for convenience
pub use console_relay_shared::shared_crate_version;

pub mod levels;
pub mod primitives;
pub mod record;

pub use levels::{LogLevel, SystemTag};
pub use primitives::{ANONYMOUS_USER, PrimitiveError, TRACE_ID_PREFIX, TraceId, UserId};
pub use record::{LogContext, LogRecord, StoredLogEntry, TraceSummary};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
