//! Export file writer.

use console_relay_config::RelayConfig;
use console_relay_ports::ExportFilePort;
use console_relay_shared::{ErrorCode, ErrorEnvelope, Result};
use std::path::{Path, PathBuf};

/// Writes export files into a fixed directory, creating it on demand.
#[derive(Debug, Clone)]
pub struct FsExportWriter {
    dir: PathBuf,
}

impl FsExportWriter {
    /// Write into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write into the configured export directory.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(&*config.export.output_dir)
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportFilePort for FsExportWriter {
    fn write_file(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        let plain = Path::new(file_name)
            .file_name()
            .is_some_and(|name| name == file_name);
        if !plain {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "export file name must not contain path separators",
            )
            .with_metadata("fileName", file_name));
        }

        std::fs::create_dir_all(&self.dir).map_err(ErrorEnvelope::from)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, contents).map_err(|error| {
            ErrorEnvelope::from(error).with_metadata("path", path.display().to_string())
        })?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote export file");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_created_dir() -> Result<()> {
        let root = std::env::temp_dir().join("console_relay_export_writer_test");
        let _ = std::fs::remove_dir_all(&root);

        let writer = FsExportWriter::new(root.join("nested"));
        let path = writer.write_file("debug-logs-all-1.txt", "hello")?;

        assert_eq!(path, root.join("nested").join("debug-logs-all-1.txt"));
        assert_eq!(std::fs::read_to_string(&path).map_err(ErrorEnvelope::from)?, "hello");
        let _ = std::fs::remove_dir_all(&root);
        Ok(())
    }

    #[test]
    fn rejects_traversal() {
        let writer = FsExportWriter::new(std::env::temp_dir());
        let error = writer.write_file("../escape.txt", "x").err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::invalid_input())
        );
    }
}
