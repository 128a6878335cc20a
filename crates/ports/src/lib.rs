//! # console-relay-ports
//!
//! Port traits for the console-relay hexagonal architecture.
//!
//! This crate defines the interfaces between the relay pipeline and the outside
//! world: the ingestion worker, its store, the native console, the clock, and
//! export destinations. It depends only on `domain` and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod console;
pub mod export;
pub mod ingest;
pub mod store;

pub use console::*;
pub use export::*;
pub use ingest::*;
pub use store::*;

// Re-export the domain types used in port signatures.
pub use console_relay_domain::{LogLevel, LogRecord, StoredLogEntry, TraceId, TraceSummary};
