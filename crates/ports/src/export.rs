//! Export delivery boundaries.

use console_relay_shared::Result;
use std::path::PathBuf;

/// Clipboard access.
pub trait ClipboardPort: Send + Sync {
    /// Replace the clipboard contents with `text`.
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Downloadable-file delivery.
pub trait ExportFilePort: Send + Sync {
    /// Write `contents` under `file_name` and return where it landed.
    fn write_file(&self, file_name: &str, contents: &str) -> Result<PathBuf>;
}
