//! # console-relay-adapters
//!
//! Concrete implementations of the ports: the worker HTTP client, the native
//! console, the system clock, the OSC 52 clipboard, and the export file writer.

pub mod access;
pub mod clipboard;
pub mod clock;
pub mod console;
pub mod files;
pub mod worker;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use access::StaticAccess;
pub use clipboard::Osc52Clipboard;
pub use clock::SystemClock;
pub use console::{StdConsole, StderrConsole};
pub use files::FsExportWriter;
pub use worker::WorkerClient;
